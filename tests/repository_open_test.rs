use std::path::Path;

use tempfile::TempDir;
use vcs_bridge::config::Config;
use vcs_bridge::error::EngineError;
use vcs_bridge::repository::Repository;

#[test]
fn open_rejects_a_directory_that_was_never_initialized() {
    let tempdir = TempDir::new().unwrap();

    let err = Repository::open(tempdir.path(), Config::default()).unwrap_err();
    assert!(matches!(err, EngineError::Config(_)));
}

#[test]
fn open_succeeds_once_init_has_run() {
    let tempdir = TempDir::new().unwrap();
    let root = tempdir.path().join("repo");

    // `init`/`open` both shell out to the real `bzr`/`git` binaries through
    // the default drivers, so this only checks the layout precondition, not
    // a full round-trip -- `test_install` covers binary availability, and
    // the fake-driver engine tests in `src/engine/*.rs` cover the rest.
    std::fs::create_dir_all(&root).unwrap();
    std::fs::write(root.join("git-bzr-bridge-branches.cfg"), "[]").unwrap();
    std::fs::write(root.join("git-bzr-bridge-bzr.marks"), "").unwrap();
    std::fs::write(root.join("git-bzr-bridge-git.marks"), "").unwrap();

    let repo = Repository::open(&root, Config::default()).unwrap();
    assert_eq!(repo.root(), Path::new(&root));
}
