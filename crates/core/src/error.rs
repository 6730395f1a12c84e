use thiserror::Error;

/// Call screening errors
#[derive(Debug, Error)]
pub enum ScreenError {
    /// Telephony-level errors (answer, transfer, playback, recording)
    #[error("Telephony error: {0}")]
    Telephony(String),

    /// Speech-to-text errors
    #[error("Transcription error: {0}")]
    Transcription(String),

    /// Reasoning service errors
    #[error("Reasoning error: {0}")]
    Reasoning(String),

    /// Recording storage errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// Invalid call status transition
    #[error("Invalid status transition: {0}")]
    InvalidTransition(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Already exists
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// Resource unavailable
    #[error("Resource unavailable: {0}")]
    ResourceUnavailable(String),

    /// Timeout
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ScreenError {
    /// Create a new Telephony error
    pub fn telephony<S: Into<String>>(msg: S) -> Self {
        Self::Telephony(msg.into())
    }

    /// Create a new Transcription error
    pub fn transcription<S: Into<String>>(msg: S) -> Self {
        Self::Transcription(msg.into())
    }

    /// Create a new Reasoning error
    pub fn reasoning<S: Into<String>>(msg: S) -> Self {
        Self::Reasoning(msg.into())
    }

    /// Create a new Storage error
    pub fn storage<S: Into<String>>(msg: S) -> Self {
        Self::Storage(msg.into())
    }

    /// Create a new InvalidInput error
    pub fn invalid_input<S: Into<String>>(msg: S) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a new NotFound error
    pub fn not_found<S: Into<String>>(msg: S) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a new AlreadyExists error
    pub fn already_exists<S: Into<String>>(msg: S) -> Self {
        Self::AlreadyExists(msg.into())
    }

    /// Create a new ResourceUnavailable error
    pub fn resource_unavailable<S: Into<String>>(msg: S) -> Self {
        Self::ResourceUnavailable(msg.into())
    }

    /// Create a new Timeout error
    pub fn timeout<S: Into<String>>(msg: S) -> Self {
        Self::Timeout(msg.into())
    }

    /// Create a new Config error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new Internal error
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Internal(msg.into())
    }
}

/// Result type for call screening operations
pub type Result<T> = std::result::Result<T, ScreenError>;
