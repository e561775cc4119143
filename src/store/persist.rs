//! JSON file persistence for the local poll cache.
//!
//! Current layout (version 1):
//!
//! ```json
//! { "version": 1, "polls": [...], "feedbacks": [...] }
//! ```
//!
//! Two legacy layouts are migrated on load: the unversioned
//! `{ "polls": [...], "feedbacks": [...] }` and the browser-storage wrapper
//! `{ "state": { "polls": [...], "feedbacks": [...] }, "version": 0 }`.
//! Records that fail to decode or validate are rejected one by one and
//! listed in the [`LoadReport`]; the rest of the file still loads.

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::StoreSnapshot;
use crate::models::rules::is_valid_content_hash;
use crate::models::{LocalFeedback, LocalPoll};

pub const STORE_FILE: &str = "validify-local-polls.json";
pub const SCHEMA_VERSION: u64 = 1;

#[derive(Debug)]
pub enum StoreError {
    Io(std::io::Error),
    Json(serde_json::Error),
    Malformed(String),
    UnsupportedVersion(u64),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Io(e) => write!(f, "Store I/O error: {e}"),
            StoreError::Json(e) => write!(f, "Store JSON error: {e}"),
            StoreError::Malformed(e) => write!(f, "Malformed store file: {e}"),
            StoreError::UnsupportedVersion(v) => {
                write!(f, "Store file version {v} is newer than supported {SCHEMA_VERSION}")
            }
        }
    }
}

impl std::error::Error for StoreError {}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        StoreError::Io(e)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Json(e)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedRecord {
    pub kind: &'static str,
    pub index: usize,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Version of the layout that was migrated, if the file was not current.
    pub migrated_from: Option<u64>,
    pub rejected: Vec<RejectedRecord>,
}

#[derive(Serialize)]
struct Envelope<'a> {
    version: u64,
    polls: &'a [LocalPoll],
    feedbacks: &'a [LocalFeedback],
}

pub fn encode(snapshot: &StoreSnapshot) -> Result<String, StoreError> {
    let envelope = Envelope {
        version: SCHEMA_VERSION,
        polls: &snapshot.polls,
        feedbacks: &snapshot.feedbacks,
    };
    Ok(serde_json::to_string_pretty(&envelope)?)
}

pub fn decode(text: &str) -> Result<(StoreSnapshot, LoadReport), StoreError> {
    let root: Value = serde_json::from_str(text)?;
    let mut report = LoadReport::default();

    let body = match root.get("version").map(Value::as_u64) {
        Some(Some(v)) if v > SCHEMA_VERSION => return Err(StoreError::UnsupportedVersion(v)),
        Some(Some(SCHEMA_VERSION)) => &root,
        Some(Some(v)) => {
            report.migrated_from = Some(v);
            root.get("state").unwrap_or(&root)
        }
        Some(None) => return Err(StoreError::Malformed("version is not an integer".into())),
        None => {
            report.migrated_from = Some(0);
            root.get("state").unwrap_or(&root)
        }
    };
    if !body.is_object() {
        return Err(StoreError::Malformed("expected a JSON object".into()));
    }

    let polls: Vec<LocalPoll> = decode_list(body, "polls", "poll", &mut report, validate_poll)?;
    let feedbacks: Vec<LocalFeedback> =
        decode_list(body, "feedbacks", "feedback", &mut report, validate_feedback)?;

    Ok((StoreSnapshot { polls, feedbacks }, report))
}

fn decode_list<T: DeserializeOwned>(
    body: &Value,
    field: &str,
    kind: &'static str,
    report: &mut LoadReport,
    validate: fn(&T, &mut HashSet<String>) -> Result<(), String>,
) -> Result<Vec<T>, StoreError> {
    let items = match body.get(field) {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(items)) => items,
        Some(_) => return Err(StoreError::Malformed(format!("`{field}` is not an array"))),
    };

    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        let decoded = serde_json::from_value::<T>(item.clone())
            .map_err(|e| e.to_string())
            .and_then(|record| validate(&record, &mut seen).map(|_| record));
        match decoded {
            Ok(record) => out.push(record),
            Err(reason) => {
                log::warn!("Rejected cached {kind} #{index}: {reason}");
                report.rejected.push(RejectedRecord { kind, index, reason });
            }
        }
    }
    Ok(out)
}

fn validate_poll(poll: &LocalPoll, seen: &mut HashSet<String>) -> Result<(), String> {
    if poll.id.trim().is_empty() {
        return Err("empty id".into());
    }
    if !seen.insert(poll.id.clone()) {
        return Err(format!("duplicate id {}", poll.id));
    }
    if poll.creator.trim().is_empty() {
        return Err("empty creator".into());
    }
    if poll.contract_id == Some(0) {
        return Err("chain identifiers start at 1".into());
    }
    if let Some(hash) = poll.ipfs_hash.as_deref().filter(|h| !h.is_empty()) {
        if !is_valid_content_hash(hash) {
            return Err(format!("malformed ipfs hash {hash}"));
        }
    }
    let mut embedded = HashSet::new();
    for feedback in &poll.feedbacks {
        validate_feedback(feedback, &mut embedded)?;
        if feedback.poll_id != poll.id {
            return Err(format!("embedded feedback {} belongs to {}", feedback.id, feedback.poll_id));
        }
    }
    Ok(())
}

fn validate_feedback(feedback: &LocalFeedback, seen: &mut HashSet<String>) -> Result<(), String> {
    if feedback.id.trim().is_empty() {
        return Err("empty id".into());
    }
    if !seen.insert(feedback.id.clone()) {
        return Err(format!("duplicate id {}", feedback.id));
    }
    if feedback.poll_id.trim().is_empty() {
        return Err("empty poll id".into());
    }
    Ok(())
}

/// Reads and writes one JSON file; writes go through a temporary file and rename.
#[derive(Debug, Clone)]
pub struct FileBackend {
    path: PathBuf,
}

impl FileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileBackend { path: path.into() }
    }

    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self::new(dir.as_ref().join(STORE_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Missing file loads as an empty cache.
    pub fn load(&self) -> Result<(StoreSnapshot, LoadReport), StoreError> {
        match std::fs::read_to_string(&self.path) {
            Ok(text) => decode(&text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Ok((StoreSnapshot::default(), LoadReport::default()))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn save(&self, snapshot: &StoreSnapshot) -> Result<(), StoreError> {
        write_atomic(&self.path, &encode(snapshot)?)
    }
}

pub(crate) fn write_atomic(path: &Path, text: &str) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, text)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}
