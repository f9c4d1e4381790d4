//! Scoped resource guards (§9 "Unwinding of partial work"): each temp file,
//! temp directory, or temp branch created mid-transaction is wrapped in a
//! guard whose `Drop` deletes it. A successful commit calls `disarm()` first,
//! so nothing is removed out from under the rename that just made it
//! permanent.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{trace, warn};

/// Deletes a file at `path` on drop, unless disarmed.
pub struct TempFile {
    path: PathBuf,
    armed: bool,
}

impl TempFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        TempFile {
            path: path.into(),
            armed: true,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Consumes the guard without deleting its file -- used once the file has
    /// been renamed into its permanent location.
    pub fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for TempFile {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        match fs::remove_file(&self.path) {
            Ok(()) => trace!(path = %self.path.display(), "cleaned up temp file"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %self.path.display(), error = %e, "failed to clean up temp file"),
        }
    }
}

/// Recursively deletes a directory at `path` on drop, unless disarmed.
pub struct TempDir {
    path: PathBuf,
    armed: bool,
}

impl TempDir {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        TempDir {
            path: path.into(),
            armed: true,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        match fs::remove_dir_all(&self.path) {
            Ok(()) => trace!(path = %self.path.display(), "cleaned up temp directory"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %self.path.display(), error = %e, "failed to clean up temp directory"),
        }
    }
}

/// A target-VCS branch created mid-transaction; on drop, removes it through
/// the supplied closure (kept generic over the driver so this module doesn't
/// depend on `vcs::target`).
pub struct TempBranch<F: FnMut(&str)> {
    name: String,
    remove: F,
    armed: bool,
}

impl<F: FnMut(&str)> TempBranch<F> {
    pub fn new(name: impl Into<String>, remove: F) -> Self {
        TempBranch {
            name: name.into(),
            remove,
            armed: true,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn disarm(mut self) {
        self.armed = false;
    }
}

impl<F: FnMut(&str)> Drop for TempBranch<F> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        (self.remove)(&self.name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn temp_file_is_removed_on_drop() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("f");
        fs::write(&path, b"x").unwrap();
        {
            let _guard = TempFile::new(&path);
        }
        assert!(!path.exists());
    }

    #[test]
    fn temp_file_survives_disarm() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("f");
        fs::write(&path, b"x").unwrap();
        {
            let guard = TempFile::new(&path);
            guard.disarm();
        }
        assert!(path.exists());
    }

    #[test]
    fn temp_dir_is_removed_recursively_on_drop() {
        let parent = tempdir().unwrap();
        let path = parent.path().join("d");
        fs::create_dir(&path).unwrap();
        fs::write(path.join("nested"), b"x").unwrap();
        {
            let _guard = TempDir::new(&path);
        }
        assert!(!path.exists());
    }

    #[test]
    fn temp_branch_calls_remove_closure_unless_disarmed() {
        let mut removed = Vec::new();
        {
            let _guard = TempBranch::new("br", |name| removed.push(name.to_string()));
        }
        assert_eq!(removed, vec!["br".to_string()]);

        let mut removed2: Vec<String> = Vec::new();
        {
            let guard = TempBranch::new("br2", |name| removed2.push(name.to_string()));
            guard.disarm();
        }
        assert!(removed2.is_empty());
    }
}
