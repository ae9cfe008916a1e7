//! Writes each run as a pretty-printed JSON document.

use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::error::PivotraderError;
use crate::ports::persistence_port::{PersistencePort, RunRecord};

/// Stores runs as `{dir}/{run_id}.json`.
pub struct JsonRecordAdapter {
    dir: PathBuf,
}

impl JsonRecordAdapter {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn record_path(&self, run_id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", run_id))
    }

    pub fn load(path: &Path) -> Result<RunRecord, PivotraderError> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

impl PersistencePort for JsonRecordAdapter {
    fn save_run(&self, record: &RunRecord) -> Result<(), PivotraderError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.record_path(&record.run_id);
        let json = serde_json::to_string_pretty(record)?;
        fs::write(&path, json)?;
        log::info!("wrote run record to {}", path.display());
        Ok(())
    }
}
