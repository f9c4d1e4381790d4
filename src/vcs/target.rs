//! The target-VCS driver (historically Git): clone/export/import plus the
//! bare-repository branch manipulation the engine needs on that side (§4.1).

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::error::Result;
use crate::vcs::process::{command, run, run_capturing_stdout};

pub trait TargetDriver: Send + Sync {
    /// `git init --bare <path>` -- the target-VCS bare repository that sits
    /// at the repository root.
    fn init_repo(&self, path: &Path) -> Result<()>;

    /// Starts (but does not run) a fast-export of `branch`, with rename- and
    /// copy-detection enabled, reading marks from `in_marks` and writing the
    /// updated set to `out_marks`.
    fn export(&self, branch: &str, in_marks: &Path, out_marks: &Path) -> Command;

    /// Starts (but does not run) a fast-import into the bare repository,
    /// reading marks from `in_marks` and writing the updated set to
    /// `out_marks`.
    fn import(&self, in_marks: &Path, out_marks: &Path) -> Command;

    fn rename_branch(&self, from: &str, to: &str) -> Result<()>;
    fn remove_branch(&self, name: &str) -> Result<()>;

    /// Creates branch `name` directly at `rev`, without fetching anything
    /// new -- `rev` must already be an object in the bare repository
    /// (§4.5.1 step 6 relies on this).
    fn new_branch(&self, name: &str, rev: &str) -> Result<()>;

    /// Ancestry query: empty output iff `new` is a descendant of `old`
    /// (the fast-forward check, §4.5.5 step 2).
    fn left_rev_list(&self, old: &str, new: &str) -> Result<Vec<u8>>;

    /// Verifies the binary is runnable and its fast-export/fast-import
    /// supports the option names this driver relies on.
    fn test_install(&self) -> Result<()>;
}

pub struct GitDriver {
    prefix: Vec<String>,
    quiet: bool,
    repo_root: PathBuf,
}

impl GitDriver {
    pub fn new(prefix: Vec<String>, quiet: bool, repo_root: PathBuf) -> Self {
        GitDriver { prefix, quiet, repo_root }
    }

    fn command<I, S>(&self, args: I) -> Command
    where
        I: IntoIterator<Item = S>,
        S: AsRef<std::ffi::OsStr>,
    {
        let mut cmd = command(&self.prefix, args);
        cmd.current_dir(&self.repo_root);
        cmd
    }
}

impl TargetDriver for GitDriver {
    fn init_repo(&self, path: &Path) -> Result<()> {
        run(command(&self.prefix, ["init", "--bare", &path.to_string_lossy()]))
    }

    fn export(&self, branch: &str, in_marks: &Path, out_marks: &Path) -> Command {
        let args = [
            "fast-export".to_string(),
            "-M".to_string(),
            "-C".to_string(),
            format!("--import-marks={}", in_marks.display()),
            format!("--export-marks={}", out_marks.display()),
            branch.to_string(),
        ];
        let mut cmd = self.command(args);
        cmd.stderr(Stdio::inherit());
        cmd
    }

    fn import(&self, in_marks: &Path, out_marks: &Path) -> Command {
        let mut args = vec![
            "fast-import".to_string(),
            "--force".to_string(),
            format!("--import-marks={}", in_marks.display()),
            format!("--export-marks={}", out_marks.display()),
        ];
        if self.quiet {
            args.push("--quiet".to_string());
        }
        let mut cmd = self.command(args);
        cmd.stderr(Stdio::inherit());
        cmd
    }

    fn rename_branch(&self, from: &str, to: &str) -> Result<()> {
        run(self.command(["branch", "-M", from, to]))
    }

    fn remove_branch(&self, name: &str) -> Result<()> {
        run(self.command(["branch", "-D", name]))
    }

    fn new_branch(&self, name: &str, rev: &str) -> Result<()> {
        run(self.command(["branch", name, rev]))
    }

    fn left_rev_list(&self, old: &str, new: &str) -> Result<Vec<u8>> {
        run_capturing_stdout(self.command(["rev-list", "--left-only", &format!("{old}...{new}")]))
    }

    fn test_install(&self) -> Result<()> {
        run(command(&self.prefix, ["help"]))?;

        let usage = run_capturing_stdout(command(&self.prefix, ["fast-export", "--help"]))?;
        let usage = String::from_utf8_lossy(&usage);
        for required in ["-M", "-C", "--export-marks", "--import-marks"] {
            if !usage.contains(required) {
                return Err(crate::error::EngineError::Config(format!(
                    "target VCS fast-export doesn't support {required:?}"
                )));
            }
        }
        Ok(())
    }
}
