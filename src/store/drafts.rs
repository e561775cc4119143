use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::persist::{SCHEMA_VERSION, StoreError, write_atomic};

pub const DRAFTS_FILE: &str = "validify-drafts.json";

/// In-progress form snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Draft {
    pub saved_at: DateTime<Utc>,
    pub data: Value,
}

#[derive(Serialize, Deserialize)]
struct DraftFile {
    version: u64,
    #[serde(default)]
    drafts: BTreeMap<String, Draft>,
}

/// Saved wizard forms keyed by `<form>:<account>` (see [`draft_key`]).
#[derive(Debug, Default)]
pub struct DraftStore {
    path: Option<PathBuf>,
    drafts: BTreeMap<String, Draft>,
}

pub fn draft_key(form: &str, account: &str) -> String {
    format!("{form}:{}", account.to_lowercase())
}

impl DraftStore {
    /// Not backed by a file.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Load drafts from `dir`; an unreadable file starts empty with a warning.
    pub fn open(dir: impl AsRef<Path>) -> Self {
        let path = dir.as_ref().join(DRAFTS_FILE);
        let drafts = match std::fs::read_to_string(&path) {
            Ok(text) => match serde_json::from_str::<DraftFile>(&text) {
                Ok(file) if file.version <= SCHEMA_VERSION => file.drafts,
                Ok(file) => {
                    log::warn!("Ignoring drafts file version {}", file.version);
                    BTreeMap::new()
                }
                Err(e) => {
                    log::warn!("Ignoring unreadable drafts file {}: {e}", path.display());
                    BTreeMap::new()
                }
            },
            Err(_) => BTreeMap::new(),
        };
        DraftStore { path: Some(path), drafts }
    }

    pub fn get(&self, key: &str) -> Option<&Draft> {
        self.drafts.get(key)
    }

    pub fn save(&mut self, key: &str, data: Value, at: DateTime<Utc>) -> Result<(), StoreError> {
        self.drafts.insert(key.to_string(), Draft { saved_at: at, data });
        self.flush()
    }

    pub fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        if self.drafts.remove(key).is_some() {
            self.flush()?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.drafts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.drafts.is_empty()
    }

    fn flush(&self) -> Result<(), StoreError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let file = DraftFile {
            version: SCHEMA_VERSION,
            drafts: self.drafts.clone(),
        };
        write_atomic(path, &serde_json::to_string_pretty(&file)?)
    }
}
