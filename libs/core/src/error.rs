use std::time::Duration;

/// Why a script or module never became available.
///
/// Cloneable so a single cached failure can be handed to every caller that
/// joined the shared load.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoadError {
    #[error("{resource} was not available after {waited:?}")]
    TimedOut { resource: String, waited: Duration },
    #[error("loading {resource} was cancelled")]
    Cancelled { resource: String },
    #[error("{resource} could not be loaded: {reason}")]
    Unavailable { resource: String, reason: String },
}

impl LoadError {
    pub fn cancelled(resource: impl Into<String>) -> Self {
        LoadError::Cancelled {
            resource: resource.into(),
        }
    }

    pub fn resource(&self) -> &str {
        match self {
            LoadError::TimedOut { resource, .. }
            | LoadError::Cancelled { resource }
            | LoadError::Unavailable { resource, .. } => resource,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("widget SDK did not load: {0}")]
    LoadTimeoutOrCancelled(#[from] LoadError),
    #[error("bridge has already been disposed")]
    AlreadyDisposed,
    #[error("host callback {method} failed: {source}")]
    CallbackFailure {
        method: &'static str,
        #[source]
        source: anyhow::Error,
    },
    #[error("failed to subscribe to {event}: {source}")]
    Subscription {
        event: &'static str,
        #[source]
        source: anyhow::Error,
    },
    #[error("widget runtime call {call} failed: {source}")]
    Runtime {
        call: &'static str,
        #[source]
        source: anyhow::Error,
    },
    #[error("failed to serialize widget payload: {0}")]
    Payload(#[from] serde_json::Error),
    #[error("operation cancelled")]
    Cancelled,
}

impl BridgeError {
    pub fn runtime(call: &'static str, source: anyhow::Error) -> Self {
        BridgeError::Runtime { call, source }
    }

    pub fn is_load_failure(&self) -> bool {
        matches!(self, BridgeError::LoadTimeoutOrCancelled(_))
    }
}

pub type BridgeResult<T> = Result<T, BridgeError>;
