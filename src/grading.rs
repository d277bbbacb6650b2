mod artifact;
mod error;
mod fixtures;
mod runner;
mod scope;
mod session;
mod verdict;

pub use artifact::{Artifact, stage_artifact};
pub use error::{ExecutionError, GradeError};
pub use fixtures::{CaseInput, enumerate_cases, exercise_dir};
pub use runner::{CaseRunner, ProcessRunner};
pub use scope::{Expiry, Scope};
pub use session::{Grader, GradingLimits};
pub use verdict::{FULL_SCORE, Verdict, expected_token, output_contains_token};
