use std::collections::TryReserveError;

use crate::time::Time;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to allocate event storage")]
    Alloc(#[from] TryReserveError),

    #[error("event delay must be finite, got {0}")]
    InvalidDelay(f64),

    #[error("clock cannot go back in time: now={now}, target={target}")]
    TimeWentBackwards { now: Time, target: Time },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("serde error")]
    Serde(#[from] serde_json::Error),

    #[error("IO error")]
    Io(#[from] std::io::Error),
}
