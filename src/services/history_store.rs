// Analysis History Store
// Persists analysis records as one JSON document per record

use chrono::Utc;
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::{AnalysisListItem, AnalysisRecord, AnalysisReport};

/// Canonical record schema written by this version.
pub const RECORD_SCHEMA_VERSION: u32 = 2;

const PREVIEW_CHARS: usize = 500;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("history I/O error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed history record: {0}")]
    Json(#[from] serde_json::Error),
    #[error("analysis {0} not found")]
    NotFound(Uuid),
    #[error("unsupported record schema version {found}")]
    UnsupportedSchema { found: u64 },
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> StoreError + '_ {
    move |source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    }
}

impl AnalysisRecord {
    pub fn new(text: &str, report: AnalysisReport) -> Self {
        Self {
            schema_version: RECORD_SCHEMA_VERSION,
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            text_preview: text.chars().take(PREVIEW_CHARS).collect(),
            text_length: text.chars().count(),
            full_text: Some(text.to_string()),
            report,
        }
    }
}

/// Storage for analysis records, addressed by id.
pub trait AnalysisStore: Send + Sync {
    fn save(&self, record: &AnalysisRecord) -> Result<(), StoreError>;

    fn get(&self, id: Uuid) -> Result<AnalysisRecord, StoreError>;

    /// Newest first.
    fn list(&self, skip: usize, limit: usize) -> Result<Vec<AnalysisListItem>, StoreError>;

    fn delete(&self, id: Uuid) -> Result<(), StoreError>;
}

pub struct JsonHistoryStore {
    dir: PathBuf,
}

impl JsonHistoryStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn default_dir() -> Option<PathBuf> {
        dirs::data_local_dir().map(|p| p.join("stylocheck").join("history"))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn record_path(&self, id: Uuid) -> PathBuf {
        self.dir.join(format!("{}.json", id))
    }
}

impl AnalysisStore for JsonHistoryStore {
    fn save(&self, record: &AnalysisRecord) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir).map_err(io_error(&self.dir))?;
        let path = self.record_path(record.id);
        let content = serde_json::to_string_pretty(record)?;
        fs::write(&path, content).map_err(io_error(&path))?;
        info!("[HISTORY] Saved analysis {}", record.id);
        Ok(())
    }

    fn get(&self, id: Uuid) -> Result<AnalysisRecord, StoreError> {
        let path = self.record_path(id);
        if !path.exists() {
            return Err(StoreError::NotFound(id));
        }
        let content = fs::read_to_string(&path).map_err(io_error(&path))?;
        parse_record(&content)
    }

    fn list(&self, skip: usize, limit: usize) -> Result<Vec<AnalysisListItem>, StoreError> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let mut records = Vec::new();
        for entry in fs::read_dir(&self.dir).map_err(io_error(&self.dir))? {
            let path = match entry {
                Ok(e) => e.path(),
                Err(_) => continue,
            };
            if path.extension().map_or(true, |ext| ext != "json") {
                continue;
            }
            let parsed = fs::read_to_string(&path)
                .map_err(io_error(&path))
                .and_then(|content| parse_record(&content));
            match parsed {
                Ok(record) => records.push(record),
                Err(e) => warn!("[HISTORY] Skipping {}: {}", path.display(), e),
            }
        }

        records.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));

        Ok(records
            .iter()
            .skip(skip)
            .take(limit)
            .map(AnalysisListItem::from)
            .collect())
    }

    fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        let path = self.record_path(id);
        if !path.exists() {
            return Err(StoreError::NotFound(id));
        }
        fs::remove_file(&path).map_err(io_error(&path))?;
        info!("[HISTORY] Deleted analysis {}", id);
        Ok(())
    }
}

/// Parse a stored record, migrating older schemas explicitly. Records without
/// a schema version predate versioning and are read as version 1.
pub fn parse_record(content: &str) -> Result<AnalysisRecord, StoreError> {
    let mut value: Value = serde_json::from_str(content)?;
    let found = match value.get("schema_version") {
        None => 1,
        Some(v) => v.as_u64().ok_or(StoreError::UnsupportedSchema { found: 0 })?,
    };

    match found {
        2 => Ok(serde_json::from_value(value)?),
        1 => {
            migrate_v1(&mut value);
            Ok(serde_json::from_value(value)?)
        }
        other => Err(StoreError::UnsupportedSchema { found: other }),
    }
}

fn rename_key(object: &mut Map<String, Value>, from: &str, to: &str) {
    if let Some(v) = object.remove(from) {
        object.entry(to.to_string()).or_insert(v);
    }
}

// v1 stored the readability block under flesch_* names and had no
// calibration version or confidence level
fn migrate_v1(value: &mut Value) {
    let Some(root) = value.as_object_mut() else {
        return;
    };
    root.insert("schema_version".to_string(), Value::from(RECORD_SCHEMA_VERSION));

    let Some(report) = root.get_mut("report").and_then(Value::as_object_mut) else {
        return;
    };
    report
        .entry("calibration_version")
        .or_insert_with(|| Value::from("legacy"));

    if let Some(quality) = report.get_mut("quality").and_then(Value::as_object_mut) {
        rename_key(quality, "flesch_score", "lix_score");
        rename_key(quality, "flesch_label", "lix_label");
    }

    if let Some(verdict) = report.get_mut("ai_detection").and_then(Value::as_object_mut) {
        verdict.entry("confidence").or_insert_with(|| Value::from("low"));
        verdict
            .entry("stylometric_subscore")
            .or_insert_with(|| Value::from(0.0));
    }
}
