use std::result::Result as StdResult;

use thiserror::Error;
use uuid::Uuid;

use crate::wizard::ValidationError;

/// Unified error type for the config, storage and CLI layers.
#[derive(Error, Debug)]
pub enum ClubError {
    #[error("Persistence error: {0}")]
    Store(#[from] StoreError),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type Result<T> = StdResult<T, ClubError>;

/// Failures raised by a document store backend.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{collection} record {id} not found")]
    NotFound { collection: String, id: Uuid },
    #[error("payload for `{0}` must serialize to a JSON object")]
    InvalidPayload(String),
    #[error("invalid collection name `{0}`")]
    InvalidCollection(String),
    #[error("stored {collection} record {id} does not match its schema: {source}")]
    Corrupt {
        collection: String,
        id: Uuid,
        #[source]
        source: serde_json::Error,
    },
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("store IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("store serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type StoreResult<T> = StdResult<T, StoreError>;

/// Failure to deliver a single outbound notification.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NotifyError {
    #[error("recipient `{0}` rejected")]
    Rejected(String),
    #[error("delivery failed: {0}")]
    Delivery(String),
}

/// Local device failures (file reads, camera).
#[derive(Error, Debug)]
pub enum DeviceError {
    #[error("camera access denied")]
    CameraDenied,
    #[error("camera unavailable: {0}")]
    Unavailable(String),
    #[error("a camera session is already open")]
    CameraBusy,
    #[error("no camera session is open")]
    NoCameraSession,
    #[error("could not read `{path}`: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("background read was aborted")]
    Aborted,
}

/// Errors surfaced at the commit boundary of a wizard.
#[derive(Error, Debug)]
pub enum CommitError {
    #[error("{0}")]
    Validation(ValidationError),
    #[error("{0} no longer exists")]
    MissingReference(String),
    #[error("{0}")]
    Rejected(String),
    #[error("could not save {entity}: {source}")]
    Store {
        entity: &'static str,
        #[source]
        source: StoreError,
    },
}

impl CommitError {
    pub(crate) fn store(entity: &'static str) -> impl FnOnce(StoreError) -> Self {
        move |source| CommitError::Store { entity, source }
    }

    /// Whether resubmitting the same draft may succeed without edits.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CommitError::Store { .. })
    }
}

impl From<ValidationError> for CommitError {
    fn from(err: ValidationError) -> Self {
        CommitError::Validation(err)
    }
}

/// Errors returned by wizard session operations.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("the wizard is closed")]
    Closed,
    #[error("the wizard has no applicable steps")]
    NoSteps,
    #[error("finish is only available on the last step")]
    NotAtLastStep,
    #[error("{0}")]
    Blocked(ValidationError),
    #[error(transparent)]
    Commit(#[from] CommitError),
    #[error(transparent)]
    Device(#[from] DeviceError),
}

impl From<ValidationError> for SessionError {
    fn from(err: ValidationError) -> Self {
        SessionError::Blocked(err)
    }
}

impl From<tokio::task::JoinError> for DeviceError {
    fn from(_: tokio::task::JoinError) -> Self {
        DeviceError::Aborted
    }
}

/// User-facing CLI error wrapper.
#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] ClubError),
    #[error("Invalid input: {0}")]
    Input(String),
    #[error("Command failed: {0}")]
    Command(String),
}

impl From<StoreError> for CliError {
    fn from(err: StoreError) -> Self {
        CliError::Core(ClubError::Store(err))
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::Core(ClubError::Io(err))
    }
}
