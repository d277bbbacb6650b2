use std::path::PathBuf;
use std::time::Duration;

use super::artifact::{Artifact, stage_artifact};
use super::error::GradeError;
use super::fixtures::{CaseInput, enumerate_cases, exercise_dir};
use super::runner::{CaseRunner, ProcessRunner};
use super::scope::Scope;
use super::verdict::{Verdict, output_contains_token};

/// Time budgets applied to every session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GradingLimits {
    /// Upper bound for one fixture run
    pub case_timeout: Duration,
    /// Upper bound for all fixture runs of one session together
    pub session_timeout: Duration,
}

/// Grades submissions against exercise fixtures.
///
/// A `Grader` only holds immutable configuration, so one instance can serve
/// any number of concurrent sessions.
#[derive(Debug, Clone)]
pub struct Grader<R = ProcessRunner> {
    runner: R,
    fixtures_root: PathBuf,
    staging_dir: PathBuf,
    limits: GradingLimits,
}

impl<R: CaseRunner> Grader<R> {
    pub fn new(
        runner: R,
        fixtures_root: PathBuf,
        staging_dir: PathBuf,
        limits: GradingLimits,
    ) -> Self {
        Self {
            runner,
            fixtures_root,
            staging_dir,
            limits,
        }
    }

    pub fn limits(&self) -> GradingLimits {
        self.limits
    }

    /// Runs one grading session.
    ///
    /// Stages `submission`, runs it against every fixture of `exercise_id`
    /// in listing order and stops at the first fixture whose output lacks
    /// the expected token. The staged file is removed before returning, and
    /// also if the returned future is dropped midway.
    pub async fn grade(
        &self,
        exercise_id: u32,
        submission: &[u8],
        caller: &Scope,
    ) -> Result<Verdict, GradeError> {
        log::info!(
            "Grading exercise {exercise_id} ({} bytes submitted)",
            submission.len()
        );

        let artifact = stage_artifact(&self.staging_dir, submission).map_err(|source| {
            GradeError::Staging {
                exercise_id,
                source,
            }
        })?;

        let result = self.grade_staged(exercise_id, &artifact, caller).await;

        if let Err(e) = artifact.close() {
            log::warn!("Failed to remove staged submission for exercise {exercise_id}: {e}");
        }

        match &result {
            Ok(verdict) => log::info!("Exercise {exercise_id} graded: score {}", verdict.score()),
            Err(e) => log::info!("Exercise {exercise_id} not graded: {e}"),
        }
        result
    }

    async fn grade_staged(
        &self,
        exercise_id: u32,
        artifact: &Artifact,
        caller: &Scope,
    ) -> Result<Verdict, GradeError> {
        let dir = exercise_dir(&self.fixtures_root, exercise_id);
        let cases = enumerate_cases(&dir).map_err(|source| GradeError::Enumeration {
            exercise_id,
            dir: dir.clone(),
            source,
        })?;
        log::debug!("Exercise {exercise_id} has {} fixtures", cases.len());

        let session = caller.bounded(self.limits.session_timeout);

        for case in &cases {
            let output = self.run_case(exercise_id, artifact, case, &session).await?;

            if !output_contains_token(&output, case.expected_token()) {
                log::debug!("Exercise {exercise_id}: fixture {} failed", case.file_name);
                return Ok(Verdict::Failed { output });
            }
            log::debug!("Exercise {exercise_id}: fixture {} passed", case.file_name);
        }

        Ok(Verdict::Passed)
    }

    async fn run_case(
        &self,
        exercise_id: u32,
        artifact: &Artifact,
        case: &CaseInput,
        session: &Scope,
    ) -> Result<Vec<u8>, GradeError> {
        let scope = session.bounded(self.limits.case_timeout);
        self.runner
            .run(artifact.path(), &case.path, &scope)
            .await
            .map_err(|source| GradeError::Execution {
                exercise_id,
                fixture: case.file_name.clone(),
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::fs;
    use std::path::Path;
    use std::sync::Arc;

    use parking_lot::Mutex;
    use tokio_util::sync::CancellationToken;

    use super::*;
    use crate::grading::ExecutionError;

    /// Canned per-fixture outputs; records every invocation
    #[derive(Default)]
    struct FakeRunner {
        outputs: HashMap<String, Vec<u8>>,
        calls: Arc<Mutex<Vec<String>>>,
        seen_artifacts: Arc<Mutex<Vec<PathBuf>>>,
    }

    impl FakeRunner {
        fn with(mut self, fixture: &str, output: &str) -> Self {
            self.outputs
                .insert(fixture.to_string(), output.as_bytes().to_vec());
            self
        }
    }

    impl CaseRunner for FakeRunner {
        async fn run(
            &self,
            artifact: &Path,
            fixture: &Path,
            scope: &Scope,
        ) -> Result<Vec<u8>, ExecutionError> {
            assert!(artifact.exists(), "artifact must exist while running");
            assert!(scope.deadline().is_some());

            let name = fixture.file_name().unwrap().to_string_lossy().into_owned();
            self.calls.lock().push(name.clone());
            self.seen_artifacts.lock().push(artifact.to_path_buf());

            // Fixtures without a canned output behave like a hung process
            self.outputs
                .get(&name)
                .cloned()
                .ok_or(ExecutionError::Timeout)
        }
    }

    struct Fixture {
        root: tempfile::TempDir,
        staging: tempfile::TempDir,
    }

    fn fixture_tree(exercise_id: u32, names: &[&str]) -> Fixture {
        let root = tempfile::tempdir().unwrap();
        let dir = exercise_dir(root.path(), exercise_id);
        fs::create_dir_all(&dir).unwrap();
        for name in names {
            fs::write(dir.join(name), "").unwrap();
        }
        Fixture {
            root,
            staging: tempfile::tempdir().unwrap(),
        }
    }

    fn limits() -> GradingLimits {
        GradingLimits {
            case_timeout: Duration::from_secs(1),
            session_timeout: Duration::from_secs(5),
        }
    }

    fn grader(fx: &Fixture, runner: FakeRunner) -> Grader<FakeRunner> {
        Grader::new(
            runner,
            fx.root.path().to_path_buf(),
            fx.staging.path().to_path_buf(),
            limits(),
        )
    }

    fn caller() -> Scope {
        Scope::new(CancellationToken::new())
    }

    fn staging_is_empty(fx: &Fixture) -> bool {
        fs::read_dir(fx.staging.path()).unwrap().count() == 0
    }

    #[tokio::test]
    async fn test_all_fixtures_pass() {
        let fx = fixture_tree(3, &["hello.txt", "world.txt"]);
        let runner = FakeRunner::default()
            .with("hello.txt", "hello\n")
            .with("world.txt", "world\n");
        let calls = runner.calls.clone();

        let verdict = grader(&fx, runner).grade(3, b"prog", &caller()).await.unwrap();

        assert_eq!(verdict, Verdict::Passed);
        assert_eq!(calls.lock().len(), 2);
        assert!(staging_is_empty(&fx));
    }

    #[tokio::test]
    async fn test_first_failure_stops_session() {
        let fx = fixture_tree(3, &["hello.txt", "world.txt"]);
        let runner = FakeRunner::default()
            .with("hello.txt", "goodbye")
            .with("world.txt", "goodbye");
        let calls = runner.calls.clone();

        let verdict = grader(&fx, runner).grade(3, b"prog", &caller()).await.unwrap();

        assert_eq!(
            verdict,
            Verdict::Failed {
                output: b"goodbye".to_vec()
            }
        );
        assert_eq!(calls.lock().len(), 1);
        assert!(staging_is_empty(&fx));
    }

    #[tokio::test]
    async fn test_runner_error_is_not_a_score() {
        let fx = fixture_tree(7, &["only.txt"]);
        let runner = FakeRunner::default();

        let err = grader(&fx, runner)
            .grade(7, b"prog", &caller())
            .await
            .unwrap_err();

        match err {
            GradeError::Execution {
                exercise_id,
                fixture,
                source,
            } => {
                assert_eq!(exercise_id, 7);
                assert_eq!(fixture, "only.txt");
                assert!(source.is_timeout());
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(staging_is_empty(&fx));
    }

    #[tokio::test]
    async fn test_missing_exercise_is_enumeration_error() {
        let fx = fixture_tree(3, &[]);
        let runner = FakeRunner::default();
        let calls = runner.calls.clone();

        let err = grader(&fx, runner)
            .grade(99, b"prog", &caller())
            .await
            .unwrap_err();

        assert!(matches!(err, GradeError::Enumeration { exercise_id: 99, .. }));
        assert!(calls.lock().is_empty());
        assert!(staging_is_empty(&fx));
    }

    #[tokio::test]
    async fn test_no_fixtures_is_full_score() {
        let fx = fixture_tree(1, &[]);
        let verdict = grader(&fx, FakeRunner::default())
            .grade(1, b"prog", &caller())
            .await
            .unwrap();
        assert_eq!(verdict.score(), 100);
    }

    #[tokio::test]
    async fn test_unwritable_staging_dir_is_staging_error() {
        let fx = fixture_tree(1, &["a.txt"]);
        let grader = Grader::new(
            FakeRunner::default(),
            fx.root.path().to_path_buf(),
            fx.staging.path().join("missing"),
            limits(),
        );

        let err = grader.grade(1, b"prog", &caller()).await.unwrap_err();
        assert!(matches!(err, GradeError::Staging { exercise_id: 1, .. }));
    }

    #[tokio::test]
    async fn test_same_artifact_for_every_case() {
        let fx = fixture_tree(2, &["a1.txt", "b2.txt", "c3.txt"]);
        let runner = FakeRunner::default()
            .with("a1.txt", "a1")
            .with("b2.txt", "b2")
            .with("c3.txt", "c3");
        let seen = runner.seen_artifacts.clone();

        grader(&fx, runner).grade(2, b"prog", &caller()).await.unwrap();

        let seen = seen.lock();
        assert_eq!(seen.len(), 3);
        assert!(seen.iter().all(|p| p == &seen[0]));
        assert!(!seen[0].exists());
    }
}
