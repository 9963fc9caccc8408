use thiserror::Error;

/// The session error type.
#[derive(Error, Debug)]
pub enum SessionError {
    /// The identifier generator failed to produce an id.
    #[error("Session id generation failed: {0}")]
    IdGeneration(String),

    /// A stored cookie expiry could not be parsed into a timestamp.
    #[error("Invalid stored expiry {value:?}: {reason}")]
    InvalidExpiry {
        /// The raw value read from the snapshot.
        value: String,
        /// Why parsing failed.
        reason: String,
    },

    /// An application write targeted a key managed by the session itself.
    #[error("Reserved session key: {0}")]
    ReservedKey(String),

    /// A snapshot or data value could not be (de)serialized.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Cookie options or secret are unusable.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl From<sonic_rs::Error> for SessionError {
    fn from(e: sonic_rs::Error) -> Self {
        SessionError::Serialization(e.to_string())
    }
}

impl From<serde_json::Error> for SessionError {
    fn from(e: serde_json::Error) -> Self {
        SessionError::Serialization(e.to_string())
    }
}

/// A `Result` type that uses `SessionError` as the error type.
pub type Result<T> = std::result::Result<T, SessionError>;
