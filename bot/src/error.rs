use thiserror::Error;

use market::SourceError;
use scheduler::TransportError;

/// Startup failures. Everything after startup is logged, never fatal.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("missing required environment variable {0}")]
    MissingEnv(&'static str),

    #[error("invalid value for {key}: {reason}")]
    InvalidConfig { key: &'static str, reason: String },

    #[error("durable store unavailable: {0:#}")]
    StoreUnavailable(anyhow::Error),

    #[error("price source setup failed: {0}")]
    Source(#[from] SourceError),

    #[error("messaging transport setup failed: {0}")]
    Transport(#[from] TransportError),
}
