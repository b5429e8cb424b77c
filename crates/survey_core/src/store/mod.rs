//! Submission log and draft slot on top of a key-value backend.
//!
//! Submissions are written under `submission_<millis>` keys and never
//! rewritten. The draft lives under its own key so enumerating submissions
//! never touches it. Key order is insertion order: keys are zero-padded and
//! strictly increasing.

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use serde::{Deserialize, Serialize};
use std::fmt;
use time::OffsetDateTime;

use crate::error::StoreError;
use crate::flow::FlowState;
use crate::form::FormSnapshot;
use crate::schema::Submission;

/// Maximum number of submissions one device may hold.
pub const MAX_SUBMISSIONS: usize = 3;

const SUBMISSION_PREFIX: &str = "submission_";
const DRAFT_KEY: &str = "draft";

pub trait KeyValueStore {
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn remove(&mut self, key: &str) -> Result<(), StoreError>;
    fn keys(&self) -> Result<Vec<String>, StoreError>;
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubmissionKey(String);

impl SubmissionKey {
    pub(crate) fn from_millis(millis: u64) -> Self {
        Self(format!("{SUBMISSION_PREFIX}{millis:013}"))
    }

    fn millis(&self) -> Option<u64> {
        self.0.strip_prefix(SUBMISSION_PREFIX)?.parse().ok()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubmissionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// In-progress session: where the surveyor is and what they have typed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Draft {
    pub flow: FlowState,
    pub form: FormSnapshot,
}

/// A stored submission that could not be read back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedRecord {
    pub key: SubmissionKey,
    pub reason: String,
}

#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    /// Readable submissions in insertion order.
    pub submissions: Vec<Submission>,
    pub malformed: Vec<MalformedRecord>,
}

pub struct SubmissionStore<S> {
    backend: S,
    keys: Vec<SubmissionKey>,
}

impl<S: KeyValueStore> SubmissionStore<S> {
    /// Wrap a backend, indexing the submissions it already holds.
    pub fn open(backend: S) -> Result<Self, StoreError> {
        let mut keys: Vec<SubmissionKey> = backend
            .keys()?
            .into_iter()
            .filter(|key| key.starts_with(SUBMISSION_PREFIX))
            .map(SubmissionKey)
            .collect();
        keys.sort();
        tracing::debug!(count = keys.len(), "submission store opened");
        Ok(Self { backend, keys })
    }

    pub fn count(&self) -> usize {
        self.keys.len()
    }

    pub fn remaining(&self) -> usize {
        MAX_SUBMISSIONS.saturating_sub(self.keys.len())
    }

    pub fn keys(&self) -> &[SubmissionKey] {
        &self.keys
    }

    /// Append a submission. Fails without writing anything once
    /// [`MAX_SUBMISSIONS`] are stored.
    pub fn save(&mut self, submission: &Submission) -> Result<SubmissionKey, StoreError> {
        if self.keys.len() >= MAX_SUBMISSIONS {
            return Err(StoreError::CapacityExceeded {
                limit: MAX_SUBMISSIONS,
            });
        }
        let value = serde_json::to_string(submission).map_err(|source| {
            StoreError::Serialization {
                what: "submission",
                source,
            }
        })?;

        let key = self.next_key(now_millis());
        self.backend.set(key.as_str(), &value)?;
        self.keys.push(key.clone());
        tracing::info!(%key, count = self.keys.len(), "submission saved");
        Ok(key)
    }

    /// Read every submission in insertion order, setting aside records that
    /// no longer parse.
    pub fn all(&self) -> Result<LoadReport, StoreError> {
        let mut report = LoadReport::default();
        for key in &self.keys {
            let parsed = match self.backend.get(key.as_str())? {
                Some(raw) => serde_json::from_str::<Submission>(&raw)
                    .map_err(|e| e.to_string())
                    .and_then(|submission| {
                        if submission.entry.has_sub_entries() {
                            Ok(submission)
                        } else {
                            Err("entry list is empty".to_string())
                        }
                    }),
                None => Err("record is missing".to_string()),
            };
            match parsed {
                Ok(submission) => report.submissions.push(submission),
                Err(reason) => {
                    tracing::warn!(%key, %reason, "skipping malformed submission");
                    report.malformed.push(MalformedRecord {
                        key: key.clone(),
                        reason,
                    });
                }
            }
        }
        Ok(report)
    }

    pub fn save_draft(&mut self, draft: &Draft) -> Result<(), StoreError> {
        let value = serde_json::to_string(draft).map_err(|source| StoreError::Serialization {
            what: "draft",
            source,
        })?;
        self.backend.set(DRAFT_KEY, &value)?;
        tracing::debug!(step = %draft.flow.step(), "draft saved");
        Ok(())
    }

    /// The saved draft, if any. A draft that no longer parses is treated as
    /// absent.
    pub fn load_draft(&self) -> Result<Option<Draft>, StoreError> {
        let Some(raw) = self.backend.get(DRAFT_KEY)? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(draft) => Ok(Some(draft)),
            Err(err) => {
                tracing::warn!(error = %err, "ignoring unreadable draft");
                Ok(None)
            }
        }
    }

    pub fn clear_draft(&mut self) -> Result<(), StoreError> {
        self.backend.remove(DRAFT_KEY)
    }

    pub fn into_backend(self) -> S {
        self.backend
    }

    fn next_key(&self, millis: u64) -> SubmissionKey {
        // keys written by something else may not carry a timestamp
        let floor = self
            .keys
            .iter()
            .filter_map(SubmissionKey::millis)
            .max()
            .map_or(0, |last| last + 1);
        SubmissionKey::from_millis(millis.max(floor))
    }
}

fn now_millis() -> u64 {
    let nanos = OffsetDateTime::now_utc().unix_timestamp_nanos();
    u64::try_from(nanos / 1_000_000).unwrap_or_default()
}
