use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Transmission to device failed: {0}")]
    Transmission(String),
    #[error("Malformed settings page response: {0}")]
    MalformedResponse(String),
    #[error("Storage write failed: {0}")]
    Storage(String),
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("Device link failed: {0}")]
    Connection(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
