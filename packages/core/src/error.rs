use thiserror::Error;

#[derive(Error, Debug)]
pub enum ShortsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Engine error: {0}")]
    Engine(String),

    #[error("Engine initialization failed: {0}")]
    EngineInit(String),

    #[error("Processing error: {0}")]
    Processing(String),

    #[error("Export already in progress")]
    ExportInProgress,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Timeline error: {0}")]
    Timeline(String),
}

pub type ShortsResult<T> = Result<T, ShortsError>;

impl ShortsError {
    pub fn engine(msg: impl Into<String>) -> Self {
        Self::Engine(msg.into())
    }

    /// Wrap a failed `load`, keeping only the underlying detail
    pub fn engine_init(cause: ShortsError) -> Self {
        match cause {
            Self::Engine(detail) | Self::EngineInit(detail) => Self::EngineInit(detail),
            other => Self::EngineInit(other.to_string()),
        }
    }

    pub fn processing(msg: impl Into<String>) -> Self {
        Self::Processing(msg.into())
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    pub fn timeline(msg: impl Into<String>) -> Self {
        Self::Timeline(msg.into())
    }

    /// Whether the caller may retry the same operation unchanged
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ShortsError::ExportInProgress
                | ShortsError::Engine(_)
                | ShortsError::EngineInit(_)
                | ShortsError::Io(_)
        )
    }
}
