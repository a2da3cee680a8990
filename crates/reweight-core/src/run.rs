//! Analysis-run recording.
//!
//! Every CLI run writes its tabular outputs into one directory plus a
//! `run.json` describing how they were produced: run id, timing, seed,
//! reservoir capacity, binning, weight cap, inputs, and record counters.
//! Distributions and bias tables may be re-loaded from the directory by a
//! later aggregation pass; record weights are never persisted.

use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Parameters that shaped a run, echoed into `run.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    pub command: String,
    pub seed: u64,
    pub reservoir_capacity: usize,
    pub nbins: usize,
    pub weight_cap: f64,
    pub inputs: Vec<String>,
}

/// Run metadata written at the end of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMeta {
    pub version: u32,
    pub id: String,
    pub command: String,
    pub started_at: String,
    pub ended_at: String,
    pub duration_ms: u64,
    pub seed: u64,
    pub reservoir_capacity: usize,
    pub nbins: usize,
    pub weight_cap: f64,
    pub inputs: Vec<String>,
    pub records_seen: u64,
    pub records_skipped: u64,
    pub outputs: Vec<String>,
    pub reweight_version: String,
}

/// Collects output names and counters while a run executes, then finalizes
/// `run.json`.
pub struct RunWriter {
    dir: PathBuf,
    id: String,
    config: RunConfig,
    started_at: String,
    started_instant: Instant,
    records_seen: u64,
    records_skipped: u64,
    outputs: Vec<String>,
}

impl RunWriter {
    /// Create the run directory (if needed) and start the clock.
    pub fn create(dir: impl Into<PathBuf>, config: RunConfig) -> std::io::Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            id: Uuid::new_v4().to_string(),
            config,
            started_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            started_instant: Instant::now(),
            records_seen: 0,
            records_skipped: 0,
            outputs: Vec::new(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Absolute path for a named output, which is also recorded in the
    /// metadata.
    pub fn output_path(&mut self, name: &str) -> PathBuf {
        self.outputs.push(name.to_string());
        self.dir.join(name)
    }

    pub fn add_record_counts(&mut self, seen: u64, skipped: u64) {
        self.records_seen += seen;
        self.records_skipped += skipped;
    }

    /// Write `run.json` and return the run directory.
    pub fn finish(self) -> std::io::Result<PathBuf> {
        let meta = RunMeta {
            version: 1,
            id: self.id,
            command: self.config.command,
            started_at: self.started_at,
            ended_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            duration_ms: self.started_instant.elapsed().as_millis() as u64,
            seed: self.config.seed,
            reservoir_capacity: self.config.reservoir_capacity,
            nbins: self.config.nbins,
            weight_cap: self.config.weight_cap,
            inputs: self.config.inputs,
            records_seen: self.records_seen,
            records_skipped: self.records_skipped,
            outputs: self.outputs,
            reweight_version: crate::VERSION.to_string(),
        };
        let json = serde_json::to_string_pretty(&meta).map_err(std::io::Error::other)?;
        std::fs::write(self.dir.join("run.json"), json)?;
        Ok(self.dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_writer_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let config = RunConfig {
            command: "validate".to_string(),
            seed: 42,
            reservoir_capacity: 1000,
            nbins: 20,
            weight_cap: 100.0,
            inputs: vec!["sample.csv".to_string()],
        };
        let mut writer = RunWriter::create(dir.path().join("out"), config).unwrap();
        let path = writer.output_path("bias_status.csv");
        std::fs::write(&path, "key,count\n").unwrap();
        writer.add_record_counts(10, 2);
        let run_dir = writer.finish().unwrap();

        let meta: RunMeta =
            serde_json::from_str(&std::fs::read_to_string(run_dir.join("run.json")).unwrap())
                .unwrap();
        assert_eq!(meta.command, "validate");
        assert_eq!(meta.seed, 42);
        assert_eq!(meta.records_seen, 10);
        assert_eq!(meta.records_skipped, 2);
        assert_eq!(meta.outputs, vec!["bias_status.csv"]);
        assert!(meta.started_at.ends_with('Z'));
    }
}
