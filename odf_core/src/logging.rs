//! JSON-lines ledger of finished sweeps.
//!
//! Each call to [`log_sweep`] appends one [`SweepLogEntry`] to the given file,
//! creating parent directories as needed.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::sweep::SweepSummary;

/// Default ledger location used by the bundled demo.
pub const DEFAULT_SWEEP_LOG: &str = "logs/sweeps.jsonl";

fn log_dir(path: &Path) -> io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent),
        _ => Ok(()),
    }
}

fn append_json_line<P: AsRef<Path>, T: Serialize>(path: P, value: &T) -> io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    serde_json::to_writer(&mut file, value)
        .map_err(|err| io::Error::new(io::ErrorKind::Other, err))?;
    file.write_all(b"\n")
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepLogEntry {
    pub timestamp_ms: u128,
    pub crate_version: String,
    #[serde(flatten)]
    pub summary: SweepSummary,
}

pub fn log_sweep<P: AsRef<Path>>(path: P, summary: &SweepSummary) -> io::Result<()> {
    let path = path.as_ref();
    log_dir(path)?;
    let entry = SweepLogEntry {
        timestamp_ms: SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis(),
        crate_version: env!("CARGO_PKG_VERSION").to_string(),
        summary: summary.clone(),
    };
    append_json_line(path, &entry)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(total: usize) -> SweepSummary {
        SweepSummary {
            total_voxels: total,
            gated_voxels: 1,
            voxels_with_peaks: total - 2,
            empty_voxels: 1,
            retained_peaks: 2 * (total - 2),
            global_max: 0.9,
            elapsed_ms: 12,
        }
    }

    #[test]
    fn appends_one_line_per_sweep() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("sweeps.jsonl");

        log_sweep(&path, &summary(10)).unwrap();
        log_sweep(&path, &summary(20)).unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        let entries: Vec<SweepLogEntry> = contents
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].summary, summary(10));
        assert_eq!(entries[1].summary.total_voxels, 20);
        assert_eq!(entries[1].crate_version, env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn entry_fields_are_flat() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flat.jsonl");
        log_sweep(&path, &summary(5)).unwrap();

        let line = fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(line.trim()).unwrap();
        assert_eq!(value["total_voxels"], 5);
        assert_eq!(value["global_max"], 0.9);
        assert!(value.get("summary").is_none());
    }
}
