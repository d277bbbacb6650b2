use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::verdict::expected_token;

/// One input fixture of an exercise.
///
/// Names that are not valid UTF-8 are converted lossily, so their expected
/// token contains U+FFFD and such a fixture cannot be passed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseInput {
    pub path: PathBuf,
    pub file_name: String,
}

impl CaseInput {
    pub fn new(path: PathBuf) -> Self {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self { path, file_name }
    }

    /// The token the submission must print for this fixture
    pub fn expected_token(&self) -> &str {
        expected_token(&self.file_name)
    }
}

/// Directory holding the fixtures of `exercise_id`
pub fn exercise_dir(fixtures_root: &Path, exercise_id: u32) -> PathBuf {
    fixtures_root.join(exercise_id.to_string())
}

/// Lists the fixtures of one exercise, skipping subdirectories.
///
/// Order is whatever the directory listing yields; callers must process the
/// result in the order returned.
pub fn enumerate_cases(dir: &Path) -> io::Result<Vec<CaseInput>> {
    let mut cases = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            continue;
        }
        cases.push(CaseInput::new(entry.path()));
    }
    Ok(cases)
}
