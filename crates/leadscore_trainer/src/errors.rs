use leadscore_core::{CompileError, CoreError};
use thiserror::Error;

/// Errors returned by the lead scoring trainer.
#[derive(Debug, Error)]
pub enum TrainerError {
    #[error("dataset error: {0}")]
    Dataset(String),

    #[error("training error: {0}")]
    Training(String),

    #[error("compilation failed: {0}")]
    Compile(#[from] CompileError),

    #[error(transparent)]
    Core(#[from] CoreError),
}
