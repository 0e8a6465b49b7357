/// Shared error type used across all vaultlock crates.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("store: {0}")]
    Store(String),

    #[error("lease already held: {key}")]
    LeaseHeld { key: String },

    #[error("worker task panicked: {0}")]
    TaskPanicked(String),

    #[error("worker pool is shut down")]
    PoolShutdown,

    #[error("operation cancelled before it ran")]
    Cancelled,

    #[error("config: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;
