use thiserror::Error;

#[derive(Error, Debug)]
pub enum MarkerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("marker queue full, dropped {0:?}")]
    QueueFull(String),

    #[error("marker outlet error: {0}")]
    Outlet(String),

    #[error("marker worker has shut down")]
    Disconnected,
}

pub type Result<T> = std::result::Result<T, MarkerError>;
