use thiserror::Error;

#[derive(Error, Debug)]
pub enum SmartFitError {
    #[error("failed to decode image: {0}")]
    Decode(String),

    #[error("failed to encode image: {0}")]
    Encode(String),

    #[error("insufficient landmarks: found {found}, required {required}")]
    InsufficientLandmarks { found: usize, required: usize },

    #[error("compositing failed: {0}")]
    Compositing(String),

    #[error("landmark provider error: {0}")]
    Provider(String),

    #[error("{stage} timed out after {seconds}s")]
    Timeout { stage: &'static str, seconds: u64 },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    OpenCv(#[from] opencv::Error),

    #[error(transparent)]
    Rpc(#[from] tonic::Status),

    #[error(transparent)]
    Transport(#[from] tonic::transport::Error),

    #[error(transparent)]
    Shape(#[from] ndarray::ShapeError),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SmartFitError>;
