//! Error types for the survey core.
//!
//! Each concern gets its own enum. Store and flow errors also carry a
//! user-facing message for the error display surface.

use std::path::PathBuf;
use thiserror::Error;

use crate::flow::Step;
use crate::validate::ValidationResult;

/// Persistence error.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The submission cap has been reached; nothing was written.
    #[error("submission limit of {limit} reached")]
    CapacityExceeded { limit: usize },

    /// The key-value backend failed.
    #[error("storage backend failed to {operation}")]
    Backend {
        operation: &'static str,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A record could not be serialized for storage.
    #[error("failed to serialize {what}")]
    Serialization {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

impl StoreError {
    pub(crate) fn backend(
        operation: &'static str,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Backend {
            operation,
            source: Box::new(source),
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            Self::CapacityExceeded { limit } => format!(
                "You have reached the maximum number of registrations ({limit}). \
                 Please contact us to register more properties."
            ),
            Self::Backend { .. } => {
                "The survey data could not be accessed. Please try again.".to_string()
            }
            Self::Serialization { .. } => {
                "An error occurred while saving the survey data.".to_string()
            }
        }
    }
}

/// A location that does not resolve against the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocationError {
    #[error("unknown sector: {sector}")]
    UnknownSector { sector: String },

    #[error("village {village} is not in sector {sector}")]
    UnknownVillage { sector: String, village: String },

    #[error("property number {property_number} is not in village {village}")]
    UnknownPropertyNumber {
        village: String,
        property_number: String,
    },
}

/// Navigation or confirmation failure in the step flow.
#[derive(Debug, Error)]
pub enum FlowError {
    /// The current step failed validation; the step did not change.
    #[error("step {step} is incomplete")]
    Invalid {
        step: Step,
        result: ValidationResult,
    },

    #[error("there is no step before {step}")]
    NoPreviousStep { step: Step },

    #[error("the entry type can no longer be changed")]
    VariantLocked,

    #[error("cannot {action} from step {step}")]
    WrongStep { action: &'static str, step: Step },

    #[error(transparent)]
    Location(#[from] LocationError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("failed to format the submission time")]
    Timestamp(#[from] time::error::Format),
}

impl FlowError {
    pub fn user_message(&self) -> String {
        match self {
            Self::Invalid { result, .. } => match &result.batch_error {
                Some(alert) => alert.clone(),
                None => "Please correct the highlighted fields.".to_string(),
            },
            Self::NoPreviousStep { .. } => "This is the first step.".to_string(),
            Self::VariantLocked => {
                "The entry type was already chosen for this registration.".to_string()
            }
            Self::WrongStep { .. } => "That action is not available at this step.".to_string(),
            Self::Location(err) => format!("The selected location is not valid: {err}."),
            Self::Store(err) => err.user_message(),
            Self::Timestamp(_) => "The submission could not be dated. Please try again.".to_string(),
        }
    }
}

/// Export failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExportError {
    #[error("no submissions to export")]
    EmptyInput,
}

impl ExportError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::EmptyInput => "There is no data to export. Please register a property first.",
        }
    }
}

/// A form value outside the closed option set of an enum field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown value: {0}")]
pub struct UnknownValue(pub String);

/// A stored row collection that breaks the collection invariants.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CollectionError {
    #[error("entry collection must hold at least one row")]
    Empty,

    #[error("entry collection has duplicate handle {handle}")]
    DuplicateHandle { handle: u32 },
}

/// Failure to read the location catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("catalog {path} is malformed")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Failure to read the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config {path} is malformed")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}
