//! Contract types for the external prediction service.
//!
//! A pretrained gradient-boosted model runs behind a separate microservice;
//! this crate never scores anything. It only builds the request batch from
//! sample rows and checks that a response is parallel to its request, with
//! each record's identifier echoed back.

use std::collections::BTreeMap;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::source::SampleTable;

/// One feature record sent to the scorer. The id is opaque to the service
/// and echoed back unchanged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureVector {
    pub id: u64,
    pub values: BTreeMap<String, f64>,
}

/// A batch scoring request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreRequest {
    pub records: Vec<FeatureVector>,
}

/// One scored record; `id` echoes the request record it belongs to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prediction {
    pub score: f64,
    pub id: u64,
}

/// Build a scoring request from the named feature columns of the sample.
///
/// Row indices become record ids. Rows with any unparseable feature value
/// are skipped (the service expects dense vectors); skips are logged, not
/// errors.
pub fn build_request(table: &SampleTable, feature_columns: &[String]) -> ScoreRequest {
    let columns: Vec<(&String, Vec<f64>)> = feature_columns
        .iter()
        .filter_map(|name| table.numeric_column(name).map(|values| (name, values)))
        .collect();

    let mut records = Vec::new();
    let mut skipped = 0u64;
    for row in 0..table.len() {
        let mut values = BTreeMap::new();
        let mut complete = true;
        for (name, column) in &columns {
            let v = column[row];
            if v.is_finite() {
                values.insert((*name).clone(), v);
            } else {
                complete = false;
                break;
            }
        }
        if complete && values.len() == feature_columns.len() {
            records.push(FeatureVector {
                id: row as u64,
                values,
            });
        } else {
            skipped += 1;
        }
    }
    if skipped > 0 {
        debug!("scorer request: skipped {skipped} rows with incomplete features");
    }
    ScoreRequest { records }
}

/// Check that a response is parallel to its request: same length, ids echoed
/// in order.
pub fn response_matches(request: &ScoreRequest, response: &[Prediction]) -> bool {
    request.records.len() == response.len()
        && request
            .records
            .iter()
            .zip(response)
            .all(|(record, prediction)| record.id == prediction.id)
}
