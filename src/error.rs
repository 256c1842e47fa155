use thiserror::Error;

/// How a failure is handled by the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Network or timeout failure; skip and retry on the next tick
    Transient,
    /// Empty, oversized or undecodable media; drop the asset and carry on
    DataQuality,
    /// The event source or chat channel is unusable; terminate
    FatalIntegration,
    /// The state store refused a write; terminate
    FatalState,
}

impl ErrorKind {
    pub fn is_fatal(&self) -> bool {
        matches!(self, ErrorKind::FatalIntegration | ErrorKind::FatalState)
    }
}

#[derive(Error, Debug, Clone)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Event source error: {0}")]
    Source(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Media error: {0}")]
    Media(String),

    #[error("Messaging error: {0}")]
    Messaging(String),

    #[error("State store error: {0}")]
    Store(String),

    #[error("Integration error: {0}")]
    Integration(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Media(_) => ErrorKind::DataQuality,
            Error::Store(_) => ErrorKind::FatalState,
            Error::Integration(_) | Error::Config(_) => ErrorKind::FatalIntegration,
            _ => ErrorKind::Transient,
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.kind().is_fatal()
    }
}

/// Classify an `anyhow::Error`, treating foreign errors as transient.
pub fn kind_of(err: &anyhow::Error) -> ErrorKind {
    err.downcast_ref::<Error>()
        .map(Error::kind)
        .unwrap_or(ErrorKind::Transient)
}
