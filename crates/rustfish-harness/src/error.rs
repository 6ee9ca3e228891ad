//! Error types for the regression harness
//!
//! Fatal conditions that end a game, a worker batch or the whole run.

use std::process::ExitStatus;
use std::time::Duration;

/// Harness-level errors
#[derive(thiserror::Error, Debug)]
pub enum MatchError {
    /// The engine answered with a move the rules oracle rejects
    #[error("{engine}: illegal move '{mv}' in position {fen}")]
    IllegalMove {
        engine: String,
        mv: String,
        fen: String,
    },

    /// No bestmove arrived within the bounded wait
    #[error("{engine}: no bestmove after {waited:?}")]
    EngineUnresponsive { engine: String, waited: Duration },

    /// The engine closed its stdout while a reply was pending
    #[error("{engine}: engine exited unexpectedly")]
    EngineExited { engine: String },

    /// The compiler invocation exited non-zero
    #[error("engine build failed ({status})")]
    BuildFailed { status: ExitStatus },

    /// One or more workers delivered an invalid tally
    #[error("{failed} of {total} workers failed; aggregate tally is incomplete")]
    WorkerFailed { failed: usize, total: usize },
}
