use std::fs;
use std::io::{self, Write};
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use tempfile::TempPath;

// Owner may read, write and execute; nobody else gets anything
const ARTIFACT_PERMISSIONS: u32 = 0o700;
const ARTIFACT_PREFIX: &str = "submission-";

/// A submission staged on disk as an owner-executable file.
///
/// The file is removed when the artifact is closed or dropped, whichever
/// comes first, so every exit path of a session releases it.
#[derive(Debug)]
pub struct Artifact {
    path: TempPath,
}

impl Artifact {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Removes the staged file, reporting failures instead of swallowing them
    pub fn close(self) -> io::Result<()> {
        self.path.close()
    }
}

/// Writes `content` to a fresh, uniquely named file inside `dir`.
///
/// The file is created with owner-only permissions, written, flushed to disk
/// and closed before the executable bit is set. If any step fails the file is
/// removed and never becomes executable.
pub fn stage_artifact(dir: &Path, content: &[u8]) -> io::Result<Artifact> {
    let mut file = tempfile::Builder::new()
        .prefix(ARTIFACT_PREFIX)
        .tempfile_in(dir)?;

    file.write_all(content)?;
    file.as_file().sync_all()?;

    // Closing the handle first: executing a file that is still open for
    // writing fails with ETXTBSY on Linux.
    let path = file.into_temp_path();
    fs::set_permissions(&path, fs::Permissions::from_mode(ARTIFACT_PERMISSIONS))?;

    log::debug!("Staged {} bytes at {}", content.len(), path.display());
    Ok(Artifact { path })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_writes_content_and_sets_exec_bit() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = stage_artifact(dir.path(), b"echo staged\n").unwrap();

        assert!(artifact.path().starts_with(dir.path()));
        assert_eq!(fs::read(artifact.path()).unwrap(), b"echo staged\n");

        let mode = fs::metadata(artifact.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, ARTIFACT_PERMISSIONS);
    }

    #[test]
    fn test_close_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = stage_artifact(dir.path(), b"x").unwrap();
        let path = artifact.path().to_path_buf();

        artifact.close().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_drop_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = {
            let artifact = stage_artifact(dir.path(), b"x").unwrap();
            artifact.path().to_path_buf()
        };
        assert!(!path.exists());
    }

    #[test]
    fn test_names_are_unique() {
        let dir = tempfile::tempdir().unwrap();
        let a = stage_artifact(dir.path(), b"a").unwrap();
        let b = stage_artifact(dir.path(), b"b").unwrap();
        assert_ne!(a.path(), b.path());
    }

    #[test]
    fn test_missing_dir_fails_without_leftovers() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(stage_artifact(&missing, b"x").is_err());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
