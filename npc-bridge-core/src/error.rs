use thiserror::Error;

use crate::pool::PoolError;

/// All errors produced by npc-bridge-core.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("malformed audio payload: {0}")]
    AudioPayload(#[source] serde_json::Error),

    #[error("invalid sample rate: {0:?}")]
    InvalidSampleRate(String),

    #[error("pool error: {0}")]
    Pool(#[from] PoolError),

    #[error("resampler error: {0}")]
    Resample(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, BridgeError>;
