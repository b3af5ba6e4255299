//! Error types for PetalSfx

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PetalSfxError {
    #[error("Audio device error: {0}")]
    AudioDevice(String),

    #[error("Audio format error: {0}")]
    AudioFormat(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Audio loading error: {0}")]
    AudioLoading(String),

    #[error("All {voice_count} voices are busy")]
    PoolExhausted { voice_count: usize },

    #[error("Audio backend failed to start: {0}")]
    BackendStart(String),

    #[error("Engine error: {0}")]
    Engine(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

pub type Result<T> = std::result::Result<T, PetalSfxError>;
