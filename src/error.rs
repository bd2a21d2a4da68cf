use std::io;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("unknown backend: {0}")]
    UnknownBackend(String),

    #[error("unknown device: {0}")]
    UnknownDevice(String),

    #[error("backend {backend}: {message}")]
    Backend {
        backend: &'static str,
        message: String,
    },

    #[error("audio stream: {0}")]
    Stream(String),

    #[error("terminal event: {0}")]
    TerminalEvent(io::Error),

    #[error("processor: {0}")]
    Processor(String),
}

impl Error {
    pub fn backend(backend: &'static str, message: impl Into<String>) -> Self {
        Self::Backend {
            backend,
            message: message.into(),
        }
    }
}
