pub mod aggregate;
pub mod batch;
pub mod classify;
pub mod gemini;
pub mod journal;
pub mod parser;
pub mod prompt;
pub mod runner;
pub mod types;

pub use aggregate::*;
pub use batch::*;
pub use classify::*;
pub use gemini::*;
pub use journal::*;
pub use parser::*;
pub use prompt::*;
pub use runner::*;
pub use types::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClassificationError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("input validation error: {0}")]
    Validation(String),

    #[error("model service is unreachable at {0}")]
    Connection(String),

    #[error("model service returned error (status {status}): {body}")]
    Service { status: u16, body: String },

    #[error("HTTP transport error: {0}")]
    Transport(String),

    #[error("malformed model response: {reason}")]
    Parse {
        reason: String,
        /// The raw response text the decode failed on.
        raw: String,
    },

    #[error("failed to write output: {0}")]
    OutputWrite(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ClassificationError {
    /// True for failures that cost one batch its results but leave the rest
    /// of the run meaningful. Everything else aborts the run.
    pub fn is_batch_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Connection(_) | Self::Service { .. } | Self::Transport(_) | Self::Parse { .. }
        )
    }
}
