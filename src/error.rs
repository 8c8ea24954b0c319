//! Typed error taxonomy for the reducer. Every fatal condition in this binary
//! maps to exactly one of the kinds below and to a process exit code: 1 for
//! configuration/setup/thread failures, 2 for resource exhaustion or invalid
//! input.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ReduceError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("failed to set up scratch file {path}: {source}")]
    ScratchSetup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse input record `{line}`: {reason}")]
    RecordParse { line: String, reason: String },

    #[error("worker {worker} exhausted its {capacity}-byte arena")]
    ArenaExhausted { worker: usize, capacity: usize },

    #[error("failed to create thread: {0}")]
    ThreadCreate(#[source] std::io::Error),

    #[error("internal invariant violation: {0}")]
    InvariantViolation(String),
}

impl ReduceError {
    /// The process exit code mandated for this error kind.
    pub fn exit_code(&self) -> i32 {
        match self {
            ReduceError::Configuration(_)
            | ReduceError::ScratchSetup { .. }
            | ReduceError::ThreadCreate(_)
            | ReduceError::InvariantViolation(_) => 1,
            ReduceError::RecordParse { .. } | ReduceError::ArenaExhausted { .. } => 2,
        }
    }
}

/// Log a fatal error to stderr/tracing and terminate the process with its
/// mandated exit code. Never returns. Called from any thread, worker,
/// merger, or the main thread, since every error here is fatal to the
/// process: there is no per-record recovery.
pub fn fatal(err: ReduceError) -> ! {
    tracing::error!("{err:#}");
    eprintln!("{err:#}");
    std::process::exit(err.exit_code());
}
