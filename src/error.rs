use thiserror::Error;

pub type Result<T> = core::result::Result<T, TimelineError>;

/// Error type returned by collaborator traits.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Error, Debug)]
pub enum TimelineError {
    #[error("Logging setup error: {0}")]
    LoggingSetup(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Collaborator call `{operation}` failed: {source}")]
    Collaborator {
        operation: &'static str,
        #[source]
        source: BoxError,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

impl TimelineError {
    pub(crate) fn collaborator(operation: &'static str) -> impl FnOnce(BoxError) -> Self {
        move |source| TimelineError::Collaborator { operation, source }
    }
}
