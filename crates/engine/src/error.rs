//! The engine crate's error category, in the same per-crate `thiserror`
//! idiom as every other crate in the workspace.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("timer calibration failed: {0}")]
    Calibration(#[from] timing::CalibrationError),
    #[error("thread spawn failed: {0}")]
    Spawn(#[source] std::io::Error),
}

pub type EngineResult<T> = Result<T, EngineError>;
