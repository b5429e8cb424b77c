//! Core of the property-damage survey: the guided form's step flow and
//! validation, the capped submission log with its draft slot, and the
//! flattening of stored submissions into one exportable table.

pub mod catalog;
pub mod config;
pub mod entries;
pub mod error;
pub mod export;
pub mod flow;
pub mod form;
pub mod schema;
pub mod store;
pub mod validate;

pub use catalog::Catalog;
pub use config::SurveyConfig;
pub use entries::{EntryCollection, EntryHandle, Removal};
pub use error::{
    CatalogError, CollectionError, ConfigError, ExportError, FlowError, LocationError, StoreError,
    UnknownValue,
};
pub use export::{ExportSummary, FlatRecord, flatten, flatten_report};
pub use flow::{FlowState, Progress, Receipt, Step, StepFlowController, Transition, progress};
pub use form::{FloorFields, FormSnapshot, ResidentFields, Review};
pub use schema::{EntryKind, EntryVariant, Submission};
pub use store::{
    Draft, KeyValueStore, LoadReport, MAX_SUBMISSIONS, MemoryStore, SqliteStore, SubmissionKey,
    SubmissionStore,
};
pub use validate::{FieldId, ValidationResult, validate};
