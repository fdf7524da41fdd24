use thiserror::Error;

#[derive(Debug, Error)]
pub enum InfraError {
    #[error("output failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("telemetry setup: {0}")]
    Telemetry(String),
    #[error("failed to serialize output: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl InfraError {
    pub fn telemetry(message: impl Into<String>) -> Self {
        Self::Telemetry(message.into())
    }
}
