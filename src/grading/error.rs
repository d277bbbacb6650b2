use std::io;
use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

/// Why a grading session could not produce a verdict at all.
///
/// A failing submission is not an error: it is `Verdict::Failed`. Every
/// variant here means no score was produced.
#[derive(Debug, Error)]
pub enum GradeError {
    #[error("exercise {exercise_id}: failed to stage submission: {source}")]
    Staging {
        exercise_id: u32,
        #[source]
        source: io::Error,
    },

    #[error("exercise {exercise_id}: failed to read fixtures in {}: {source}", .dir.display())]
    Enumeration {
        exercise_id: u32,
        dir: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("exercise {exercise_id}, fixture {fixture}: {source}")]
    Execution {
        exercise_id: u32,
        fixture: String,
        #[source]
        source: ExecutionError,
    },
}

impl GradeError {
    pub fn exercise_id(&self) -> u32 {
        match self {
            Self::Staging { exercise_id, .. }
            | Self::Enumeration { exercise_id, .. }
            | Self::Execution { exercise_id, .. } => *exercise_id,
        }
    }

    /// Short stable label, used in logs and HTTP error bodies
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Staging { .. } => "StagingError",
            Self::Enumeration { .. } => "EnumerationError",
            Self::Execution { .. } => "ExecutionError",
        }
    }
}

/// Failure of a single bounded subprocess run.
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("failed to spawn interpreter: {0}")]
    Spawn(#[source] io::Error),

    #[error("failed while waiting for process: {0}")]
    Wait(#[source] io::Error),

    #[error("process exited unsuccessfully ({0})")]
    NonZeroExit(ExitStatus),

    #[error("deadline exceeded")]
    Timeout,

    #[error("cancelled by caller")]
    Cancelled,
}

impl ExecutionError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout)
    }
}
