//! Population and sample inputs.
//!
//! The population is summarized through the [`DistributionSource`] trait,
//! which has two implementations: [`SummaryStore`] reads precomputed tabular
//! summaries from a directory, [`RecordStream`] falls back to a single
//! forward pass over a JSONL record stream. The store is preferred whenever
//! its summaries are usable; the choice is an availability check, not inline
//! branching, so each implementation stays independently testable.
//!
//! The sample side is small by construction and is read in one bulk pass via
//! [`SampleTable`].

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Datelike, NaiveDateTime};
use log::{debug, info};
use rand::rngs::StdRng;
use serde_json::Value;

use crate::distribution::{CategoricalHistogram, NumericSample, Reservoir, normalize_category};

// ---------------------------------------------------------------------------
// Field schema
// ---------------------------------------------------------------------------

/// How a named record field is summarized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Histogram over normalized labels.
    Categorical,
    /// Numeric sample (full enumeration or reservoir).
    Numeric,
    /// Timestamp; yields a month histogram and an epoch-seconds sample.
    Timestamp,
}

/// A named field to summarize.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: String,
    pub kind: FieldKind,
}

impl FieldSpec {
    pub fn categorical(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: FieldKind::Categorical,
        }
    }

    pub fn numeric(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: FieldKind::Numeric,
        }
    }

    pub fn timestamp(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: FieldKind::Timestamp,
        }
    }

    /// Name of the categorical distribution this field produces, if any.
    pub fn histogram_name(&self) -> Option<String> {
        match self.kind {
            FieldKind::Categorical => Some(self.name.clone()),
            FieldKind::Timestamp => Some(format!("{}_month", self.name)),
            FieldKind::Numeric => None,
        }
    }

    /// Name of the numeric distribution this field produces, if any.
    pub fn sample_name(&self) -> Option<String> {
        match self.kind {
            FieldKind::Numeric => Some(self.name.clone()),
            FieldKind::Timestamp => Some(format!("{}_epoch", self.name)),
            FieldKind::Categorical => None,
        }
    }
}

/// All distributions produced by one summarization pass, keyed by
/// distribution name (see [`FieldSpec::histogram_name`] /
/// [`FieldSpec::sample_name`]).
#[derive(Debug, Default)]
pub struct FieldDistributions {
    pub histograms: BTreeMap<String, CategoricalHistogram>,
    pub samples: BTreeMap<String, NumericSample>,
    /// Records consumed (stream side; 0 for the summary store).
    pub records_seen: u64,
    /// Records dropped as unparseable (stream side).
    pub records_skipped: u64,
}

// ---------------------------------------------------------------------------
// Timestamp handling
// ---------------------------------------------------------------------------

/// Parse a timestamp string into (epoch seconds, month key `YYYY-MM`).
///
/// Accepts RFC 3339 (with or without fractional seconds) and the bare
/// `YYYY-MM-DD HH:MM:SS` layout, which is read as UTC.
pub fn parse_timestamp(raw: &str) -> Option<(f64, String)> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        let month = format!("{:04}-{:02}", dt.year(), dt.month());
        return Some((dt.timestamp() as f64, month));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        let dt = naive.and_utc();
        let month = format!("{:04}-{:02}", dt.year(), dt.month());
        return Some((dt.timestamp() as f64, month));
    }
    None
}

// ---------------------------------------------------------------------------
// DistributionSource
// ---------------------------------------------------------------------------

/// A provider of population distributions for a set of fields.
pub trait DistributionSource {
    /// Short identifier for logs and run metadata.
    fn name(&self) -> &str;

    /// Whether this source can supply usable distributions for every
    /// requested field.
    fn is_available(&self, fields: &[FieldSpec]) -> bool;

    /// Build all field distributions. The RNG drives reservoir replacement
    /// and is caller-supplied for reproducibility.
    fn summarize(&self, fields: &[FieldSpec], rng: &mut StdRng)
    -> std::io::Result<FieldDistributions>;
}

/// Pick the population source: the summary store when it is usable, else the
/// record stream.
pub fn select_source<'a>(
    store: Option<&'a SummaryStore>,
    stream: Option<&'a RecordStream>,
    fields: &[FieldSpec],
) -> Option<&'a dyn DistributionSource> {
    if let Some(store) = store {
        if store.is_available(fields) {
            info!("using summary store at {}", store.dir().display());
            return Some(store);
        }
        info!(
            "summary store at {} is missing or empty, falling back to stream",
            store.dir().display()
        );
    }
    if let Some(stream) = stream {
        if stream.is_available(fields) {
            return Some(stream);
        }
    }
    None
}

// ---------------------------------------------------------------------------
// SummaryStore
// ---------------------------------------------------------------------------

/// Precomputed population summaries: a directory of tabular files keyed by
/// distribution name. Histograms are `<name>_histogram.csv` with `key,count`
/// rows; numeric reservoirs are `<name>_reservoir.csv` with `value` rows.
pub struct SummaryStore {
    dir: PathBuf,
}

impl SummaryStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn histogram_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}_histogram.csv", name))
    }

    fn reservoir_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}_reservoir.csv", name))
    }

    /// Persist a summarization result into the store layout.
    pub fn write(dists: &FieldDistributions, dir: &Path) -> std::io::Result<()> {
        std::fs::create_dir_all(dir)?;
        for (name, hist) in &dists.histograms {
            let mut w = BufWriter::new(File::create(dir.join(format!("{}_histogram.csv", name)))?);
            writeln!(w, "key,count")?;
            for (key, count) in hist.iter() {
                writeln!(w, "{},{}", key, count)?;
            }
            w.flush()?;
        }
        for (name, sample) in &dists.samples {
            sample.write_csv(&dir.join(format!("{}_reservoir.csv", name)))?;
        }
        Ok(())
    }
}

/// Read a `key,count` histogram file. Malformed rows are skipped.
fn read_histogram_csv(path: &Path) -> std::io::Result<CategoricalHistogram> {
    let mut hist = CategoricalHistogram::new();
    let reader = BufReader::new(File::open(path)?);
    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || (i == 0 && line.starts_with("key,")) {
            continue;
        }
        // The count is the final column, so labels may contain commas.
        let Some((key, count)) = line.rsplit_once(',') else {
            continue;
        };
        match count.trim().parse::<u64>() {
            Ok(n) => hist.insert(key.trim(), n),
            Err(_) => debug!("skipping malformed histogram row in {}: {line}", path.display()),
        }
    }
    Ok(hist)
}

/// Read a `value` series file. Malformed or non-finite rows are skipped.
fn read_series_csv(path: &Path) -> std::io::Result<NumericSample> {
    let mut sample = NumericSample::new();
    let reader = BufReader::new(File::open(path)?);
    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || (i == 0 && line == "value") {
            continue;
        }
        match line.parse::<f64>() {
            Ok(v) => sample.push(v),
            Err(_) => debug!("skipping malformed series row in {}: {line}", path.display()),
        }
    }
    Ok(sample)
}

impl DistributionSource for SummaryStore {
    fn name(&self) -> &str {
        "summary_store"
    }

    /// The store is valid only if every distribution it must supply exists
    /// with strictly positive total mass.
    fn is_available(&self, fields: &[FieldSpec]) -> bool {
        for field in fields {
            if let Some(name) = field.histogram_name() {
                match read_histogram_csv(&self.histogram_path(&name)) {
                    Ok(h) if h.total() > 0 => {}
                    _ => return false,
                }
            }
            if let Some(name) = field.sample_name() {
                match read_series_csv(&self.reservoir_path(&name)) {
                    Ok(s) if !s.is_empty() => {}
                    _ => return false,
                }
            }
        }
        !fields.is_empty()
    }

    fn summarize(
        &self,
        fields: &[FieldSpec],
        _rng: &mut StdRng,
    ) -> std::io::Result<FieldDistributions> {
        let mut out = FieldDistributions::default();
        for field in fields {
            if let Some(name) = field.histogram_name() {
                let hist = read_histogram_csv(&self.histogram_path(&name))?;
                out.histograms.insert(name, hist);
            }
            if let Some(name) = field.sample_name() {
                let sample = read_series_csv(&self.reservoir_path(&name))?;
                out.samples.insert(name, sample);
            }
        }
        Ok(out)
    }
}

// ---------------------------------------------------------------------------
// RecordStream
// ---------------------------------------------------------------------------

/// Streaming fallback: one JSON object per line. Unparseable lines and
/// malformed field values are skipped, never fatal. Numeric and epoch
/// distributions are reservoir-sampled so arbitrarily long streams fit in
/// O(capacity) memory.
pub struct RecordStream {
    path: PathBuf,
    reservoir_capacity: usize,
}

impl RecordStream {
    pub fn new(path: impl Into<PathBuf>, reservoir_capacity: usize) -> Self {
        Self {
            path: path.into(),
            reservoir_capacity,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Normalize a JSON field value into a categorical label.
fn value_to_label(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => "unknown".to_string(),
        Some(Value::String(s)) => normalize_category(Some(s)),
        Some(Value::Bool(b)) => b.to_string(),
        Some(other) => normalize_category(Some(&other.to_string())),
    }
}

/// Extract a numeric value from a JSON field, accepting numbers and numeric
/// strings.
fn value_to_f64(value: Option<&Value>) -> Option<f64> {
    match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

impl DistributionSource for RecordStream {
    fn name(&self) -> &str {
        "record_stream"
    }

    fn is_available(&self, _fields: &[FieldSpec]) -> bool {
        self.path.is_file()
    }

    fn summarize(
        &self,
        fields: &[FieldSpec],
        rng: &mut StdRng,
    ) -> std::io::Result<FieldDistributions> {
        // One accumulator slot per field; distribution names are resolved
        // once, not per record.
        struct Slot<'a> {
            field: &'a FieldSpec,
            histogram: Option<(String, CategoricalHistogram)>,
            reservoir: Option<(String, Reservoir)>,
        }
        let mut slots: Vec<Slot<'_>> = fields
            .iter()
            .map(|field| Slot {
                field,
                histogram: field
                    .histogram_name()
                    .map(|name| (name, CategoricalHistogram::new())),
                reservoir: field
                    .sample_name()
                    .map(|name| (name, Reservoir::new(self.reservoir_capacity))),
            })
            .collect();

        let mut records_seen = 0u64;
        let mut records_skipped = 0u64;
        let reader = BufReader::new(File::open(&self.path)?);
        for line in reader.lines() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let record: Value = match serde_json::from_str(line) {
                Ok(v) => v,
                Err(_) => {
                    records_skipped += 1;
                    continue;
                }
            };
            records_seen += 1;

            for slot in &mut slots {
                let value = record.get(&slot.field.name);
                match slot.field.kind {
                    FieldKind::Categorical => {
                        if let Some((_, hist)) = &mut slot.histogram {
                            hist.observe(&value_to_label(value));
                        }
                    }
                    FieldKind::Numeric => {
                        if let (Some(v), Some((_, res))) =
                            (value_to_f64(value), &mut slot.reservoir)
                        {
                            res.observe(v, rng);
                        }
                    }
                    FieldKind::Timestamp => {
                        let parsed = value.and_then(Value::as_str).and_then(parse_timestamp);
                        if let Some((epoch, month)) = parsed {
                            if let Some((_, hist)) = &mut slot.histogram {
                                hist.observe(&month);
                            }
                            if let Some((_, res)) = &mut slot.reservoir {
                                res.observe(epoch, rng);
                            }
                        }
                    }
                }
            }
        }

        if records_skipped > 0 {
            debug!(
                "{}: skipped {} unparseable of {} lines",
                self.path.display(),
                records_skipped,
                records_seen + records_skipped
            );
        }

        let mut histograms = BTreeMap::new();
        let mut samples = BTreeMap::new();
        for slot in slots {
            if let Some((name, hist)) = slot.histogram {
                histograms.insert(name, hist);
            }
            if let Some((name, res)) = slot.reservoir {
                samples.insert(name, res.into_sample());
            }
        }
        Ok(FieldDistributions {
            histograms,
            samples,
            records_seen,
            records_skipped,
        })
    }
}

// ---------------------------------------------------------------------------
// SampleTable
// ---------------------------------------------------------------------------

/// The sample dataset, read once as a whole: a header row of column names
/// followed by comma-separated value rows. Schema-agnostic beyond the named
/// columns a caller asks for; rows with the wrong column count are skipped.
pub struct SampleTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl SampleTable {
    pub fn from_csv_path(path: &Path) -> std::io::Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        let mut lines = reader.lines();
        let headers: Vec<String> = match lines.next() {
            Some(line) => line?.trim().split(',').map(|h| h.trim().to_string()).collect(),
            None => Vec::new(),
        };
        let mut rows = Vec::new();
        let mut skipped = 0u64;
        for line in lines {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let row: Vec<String> = line.split(',').map(|v| v.to_string()).collect();
            if row.len() != headers.len() {
                skipped += 1;
                continue;
            }
            rows.push(row);
        }
        if skipped > 0 {
            debug!("{}: skipped {} malformed sample rows", path.display(), skipped);
        }
        Ok(Self { headers, rows })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Row-aligned normalized labels for a column. A missing column yields
    /// `None`; missing cells normalize to `"unknown"`.
    pub fn categorical_column(&self, name: &str) -> Option<Vec<String>> {
        let idx = self.column_index(name)?;
        Some(
            self.rows
                .iter()
                .map(|row| normalize_category(row.get(idx).map(String::as_str)))
                .collect(),
        )
    }

    /// Row-aligned numeric values. Unparseable cells become NaN so row
    /// alignment with other columns is preserved; booleans map to 1.0/0.0.
    pub fn numeric_column(&self, name: &str) -> Option<Vec<f64>> {
        let idx = self.column_index(name)?;
        Some(
            self.rows
                .iter()
                .map(|row| parse_numeric_cell(row.get(idx).map(String::as_str).unwrap_or("")))
                .collect(),
        )
    }

    /// Row-aligned (epoch seconds, month label) pairs for a timestamp
    /// column. Unparseable cells become (NaN, "unknown").
    pub fn timestamp_column(&self, name: &str) -> Option<(Vec<f64>, Vec<String>)> {
        let idx = self.column_index(name)?;
        let mut epochs = Vec::with_capacity(self.rows.len());
        let mut months = Vec::with_capacity(self.rows.len());
        for row in &self.rows {
            match row.get(idx).map(String::as_str).and_then(parse_timestamp) {
                Some((epoch, month)) => {
                    epochs.push(epoch);
                    months.push(month);
                }
                None => {
                    epochs.push(f64::NAN);
                    months.push("unknown".to_string());
                }
            }
        }
        Some((epochs, months))
    }

    /// Summarize the sample side: full enumeration, no reservoir. Categorical
    /// histograms include `"unknown"` cells; numeric and epoch samples keep
    /// only parseable values.
    pub fn summarize(&self, fields: &[FieldSpec]) -> FieldDistributions {
        let mut out = FieldDistributions::default();
        out.records_seen = self.rows.len() as u64;
        for field in fields {
            match field.kind {
                FieldKind::Categorical => {
                    let mut hist = CategoricalHistogram::new();
                    if let Some(labels) = self.categorical_column(&field.name) {
                        for label in &labels {
                            hist.observe(label);
                        }
                    }
                    out.histograms.insert(field.histogram_name().unwrap(), hist);
                }
                FieldKind::Numeric => {
                    let values = self.numeric_column(&field.name).unwrap_or_default();
                    out.samples.insert(
                        field.sample_name().unwrap(),
                        NumericSample::from_values(values),
                    );
                }
                FieldKind::Timestamp => {
                    let (epochs, months) = self.timestamp_column(&field.name).unwrap_or_default();
                    let mut hist = CategoricalHistogram::new();
                    for (month, epoch) in months.iter().zip(&epochs) {
                        if epoch.is_finite() {
                            hist.observe(month);
                        }
                    }
                    out.histograms.insert(field.histogram_name().unwrap(), hist);
                    out.samples.insert(
                        field.sample_name().unwrap(),
                        NumericSample::from_values(epochs),
                    );
                }
            }
        }
        out
    }
}

/// Parse a sample cell as a number; boolean-ish labels map to 1.0/0.0 and
/// anything else to NaN.
pub fn parse_numeric_cell(raw: &str) -> f64 {
    let t = raw.trim();
    if t.is_empty() {
        return f64::NAN;
    }
    if let Ok(v) = t.parse::<f64>() {
        return v;
    }
    match t.to_ascii_lowercase().as_str() {
        "true" | "t" | "yes" => 1.0,
        "false" | "f" | "no" => 0.0,
        _ => f64::NAN,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use std::io::Write as _;

    fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        let mut f = File::create(&path).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        path
    }

    fn fields() -> Vec<FieldSpec> {
        vec![
            FieldSpec::categorical("status"),
            FieldSpec::numeric("pulls"),
            FieldSpec::timestamp("pushed_at"),
        ]
    }

    #[test]
    fn test_parse_timestamp_variants() {
        let (epoch, month) = parse_timestamp("2021-03-05T12:00:00Z").unwrap();
        assert_eq!(month, "2021-03");
        assert!(epoch > 1_614_000_000.0 && epoch < 1_615_000_000.0);

        let (_, month) = parse_timestamp("2021-03-05T12:00:00.123+02:00").unwrap();
        assert_eq!(month, "2021-03");

        let (_, month) = parse_timestamp("2019-12-01 08:30:00").unwrap();
        assert_eq!(month, "2019-12");

        assert!(parse_timestamp("").is_none());
        assert!(parse_timestamp("not a date").is_none());
    }

    #[test]
    fn test_record_stream_skips_malformed_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "records.jsonl",
            concat!(
                "{\"status\": \"active\", \"pulls\": 10, \"pushed_at\": \"2021-03-05T12:00:00Z\"}\n",
                "this is not json\n",
                "{\"status\": \"  \", \"pulls\": \"25\", \"pushed_at\": \"bad\"}\n",
                "{\"status\": null, \"pulls\": null}\n",
            ),
        );
        let stream = RecordStream::new(&path, 100);
        let mut rng = StdRng::seed_from_u64(42);
        let dists = stream.summarize(&fields(), &mut rng).unwrap();

        assert_eq!(dists.records_seen, 3);
        assert_eq!(dists.records_skipped, 1);

        let status = &dists.histograms["status"];
        assert_eq!(status.count("active"), 1);
        assert_eq!(status.count("unknown"), 2);

        let pulls = &dists.samples["pulls"];
        let mut vals = pulls.values().to_vec();
        vals.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(vals, vec![10.0, 25.0]);

        assert_eq!(dists.histograms["pushed_at_month"].count("2021-03"), 1);
        assert_eq!(dists.samples["pushed_at_epoch"].len(), 1);
    }

    #[test]
    fn test_summary_store_roundtrip_and_preference() {
        let dir = tempfile::tempdir().unwrap();
        let stream_path = write_file(
            dir.path(),
            "records.jsonl",
            "{\"status\": \"active\", \"pulls\": 5, \"pushed_at\": \"2021-03-05T12:00:00Z\"}\n",
        );
        let stream = RecordStream::new(&stream_path, 100);
        let mut rng = StdRng::seed_from_u64(1);
        let dists = stream.summarize(&fields(), &mut rng).unwrap();

        let store_dir = dir.path().join("store");
        SummaryStore::write(&dists, &store_dir).unwrap();
        let store = SummaryStore::new(&store_dir);
        assert!(store.is_available(&fields()));

        let selected = select_source(Some(&store), Some(&stream), &fields()).unwrap();
        assert_eq!(selected.name(), "summary_store");

        let loaded = selected.summarize(&fields(), &mut rng).unwrap();
        assert_eq!(loaded.histograms["status"].count("active"), 1);
        assert_eq!(loaded.samples["pulls"].values(), &[5.0]);
    }

    #[test]
    fn test_empty_store_falls_back_to_stream() {
        let dir = tempfile::tempdir().unwrap();
        let stream_path = write_file(
            dir.path(),
            "records.jsonl",
            "{\"status\": \"active\", \"pulls\": 5, \"pushed_at\": \"2021-03-05T12:00:00Z\"}\n",
        );
        let stream = RecordStream::new(&stream_path, 100);

        // Store with a zero-mass histogram is not valid.
        let store_dir = dir.path().join("store");
        std::fs::create_dir_all(&store_dir).unwrap();
        write_file(&store_dir, "status_histogram.csv", "key,count\n");

        let store = SummaryStore::new(&store_dir);
        assert!(!store.is_available(&fields()));

        let selected = select_source(Some(&store), Some(&stream), &fields()).unwrap();
        assert_eq!(selected.name(), "record_stream");
    }

    #[test]
    fn test_select_source_without_any_source() {
        assert!(select_source(None, None, &fields()).is_none());
    }

    #[test]
    fn test_sample_table_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "sample.csv",
            concat!(
                "status,pulls,pushed_at,flagged\n",
                "active, 10,2021-03-05T12:00:00Z,true\n",
                ",x,bad,false\n",
                "short,row\n",
                "deprecated,3,2020-01-01 00:00:00,1\n",
            ),
        );
        let table = SampleTable::from_csv_path(&path).unwrap();
        assert_eq!(table.len(), 3);

        let status = table.categorical_column("status").unwrap();
        assert_eq!(status, vec!["active", "unknown", "deprecated"]);

        let pulls = table.numeric_column("pulls").unwrap();
        assert_eq!(pulls[0], 10.0);
        assert!(pulls[1].is_nan());
        assert_eq!(pulls[2], 3.0);

        let flagged = table.numeric_column("flagged").unwrap();
        assert_eq!(flagged, vec![1.0, 0.0, 1.0]);

        let (epochs, months) = table.timestamp_column("pushed_at").unwrap();
        assert!(epochs[0].is_finite());
        assert!(epochs[1].is_nan());
        assert_eq!(months[2], "2020-01");

        assert!(table.numeric_column("absent").is_none());
    }

    #[test]
    fn test_sample_table_summarize() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "sample.csv",
            concat!(
                "status,pulls,pushed_at\n",
                "active,10,2021-03-05T12:00:00Z\n",
                "active,20,2021-04-01T00:00:00Z\n",
                "gone,,bad\n",
            ),
        );
        let table = SampleTable::from_csv_path(&path).unwrap();
        let dists = table.summarize(&fields());
        assert_eq!(dists.records_seen, 3);
        assert_eq!(dists.histograms["status"].count("active"), 2);
        assert_eq!(dists.samples["pulls"].len(), 2);
        // Timestamp distributions only keep parseable cells.
        assert_eq!(dists.histograms["pushed_at_month"].total(), 2);
        assert_eq!(dists.samples["pushed_at_epoch"].len(), 2);
    }
}
