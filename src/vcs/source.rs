//! The source-VCS driver (historically Bazaar): clone/export/import plus the
//! working-tree-less branch manipulation the engine needs on that side
//! (§4.1).

use std::path::Path;
use std::process::{Command, Stdio};

use crate::error::Result;
use crate::vcs::process::{command, run, run_capturing_stdout, run_capturing_stdout_string};

pub trait SourceDriver: Send + Sync {
    /// `bzr init-repo --no-trees <path>` -- a shared, working-tree-less
    /// repository that every registered source branch lives under.
    fn init_repo(&self, path: &Path) -> Result<()>;

    /// Materializes `url` as a working-tree-less branch at `path`.
    fn clone(&self, url: &str, path: &Path) -> Result<()>;

    /// Starts (but does not run) a fast-export of `branch_path`, with the
    /// branch renamed in the stream to `target_name_hint`, reading marks
    /// from `in_marks` and writing the updated set to `out_marks`.
    fn export(&self, branch_path: &Path, target_name_hint: &str, in_marks: &Path, out_marks: &Path) -> Command;

    /// Starts (but does not run) a fast-import into the shared repository at
    /// `repo_root`, reading marks from `in_marks` and writing the updated
    /// set to `out_marks`. Used by push-hook (§4.5.5) to bring a target-VCS
    /// export back into the source VCS.
    fn import(&self, repo_root: &Path, in_marks: &Path, out_marks: &Path) -> Command;

    /// Revision id at the tip of the branch working copy at `path`.
    fn tip(&self, path: &Path) -> Result<String>;

    /// Pulls `from` into `to`, overwriting `to`'s history (used to move new
    /// revisions into the permanent source branch, §4.5.4/§4.5.5).
    fn pull_overwrite(&self, from: &Path, to: &Path) -> Result<()>;

    /// Pushes `branch_path`'s history to `url`.
    fn push(&self, branch_path: &Path, url: &str) -> Result<()>;

    /// Creates a new branch at `path` containing exactly revision `rev`,
    /// without fetching anything new -- `rev` must already be present in the
    /// shared repository `path` lives under (§4.5.1 step 6 relies on this).
    fn new_branch(&self, path: &Path, rev: &str) -> Result<()>;

    /// Verifies the binary is runnable and its fast-export/fast-import
    /// plugin supports the option names this driver relies on.
    fn test_install(&self) -> Result<()>;
}

pub struct BzrDriver {
    prefix: Vec<String>,
    quiet: bool,
}

impl BzrDriver {
    pub fn new(prefix: Vec<String>, quiet: bool) -> Self {
        BzrDriver { prefix, quiet }
    }

    fn maybe_quiet(&self, args: &mut Vec<String>) {
        if self.quiet {
            args.push("--quiet".to_string());
        }
    }
}

impl SourceDriver for BzrDriver {
    fn init_repo(&self, path: &Path) -> Result<()> {
        run(command(&self.prefix, ["init-repo", "--no-trees", &path.to_string_lossy()]))
    }

    fn clone(&self, url: &str, path: &Path) -> Result<()> {
        let mut args = vec!["branch".to_string(), "--no-tree".to_string()];
        self.maybe_quiet(&mut args);
        args.push(url.to_string());
        args.push(path.to_string_lossy().to_string());
        run(command(&self.prefix, args))
    }

    fn export(&self, branch_path: &Path, target_name_hint: &str, in_marks: &Path, out_marks: &Path) -> Command {
        let mut args = vec![
            "fast-export".to_string(),
            "--plain".to_string(),
            "--no-tags".to_string(),
            "--import-marks".to_string(),
            in_marks.to_string_lossy().to_string(),
            "--export-marks".to_string(),
            out_marks.to_string_lossy().to_string(),
            "--git-branch".to_string(),
            target_name_hint.to_string(),
        ];
        self.maybe_quiet(&mut args);
        args.push(branch_path.to_string_lossy().to_string());
        args.push("-".to_string());
        let mut cmd = command(&self.prefix, args);
        cmd.stderr(Stdio::inherit());
        cmd
    }

    fn import(&self, repo_root: &Path, in_marks: &Path, out_marks: &Path) -> Command {
        let mut args = vec![
            "fast-import".to_string(),
            "--import-marks".to_string(),
            in_marks.to_string_lossy().to_string(),
            "--export-marks".to_string(),
            out_marks.to_string_lossy().to_string(),
        ];
        self.maybe_quiet(&mut args);
        args.push("-".to_string());
        args.push(repo_root.to_string_lossy().to_string());
        let mut cmd = command(&self.prefix, args);
        cmd.stderr(Stdio::inherit());
        cmd
    }

    fn tip(&self, path: &Path) -> Result<String> {
        let cmd = command(&self.prefix, ["revision-info", "-d", &path.to_string_lossy()]);
        let out = run_capturing_stdout_string(cmd)?;
        let rev = out
            .split_whitespace()
            .nth(1)
            .ok_or_else(|| crate::error::EngineError::child_process("bzr", "revision-info", format!("invalid output {out:?}")))?;
        Ok(rev.to_string())
    }

    fn pull_overwrite(&self, from: &Path, to: &Path) -> Result<()> {
        run(command(
            &self.prefix,
            ["pull", "--overwrite", "-d", &to.to_string_lossy(), &from.to_string_lossy()],
        ))
    }

    fn push(&self, branch_path: &Path, url: &str) -> Result<()> {
        run(command(&self.prefix, ["push", "-d", &branch_path.to_string_lossy(), url]))
    }

    fn new_branch(&self, path: &Path, rev: &str) -> Result<()> {
        run(command(&self.prefix, ["init", "--create-prefix", &path.to_string_lossy()]))?;
        run(command(
            &self.prefix,
            [
                "pull",
                "-d",
                &path.to_string_lossy(),
                "-r",
                &format!("revid:{rev}"),
                &path.to_string_lossy(),
            ],
        ))
    }

    fn test_install(&self) -> Result<()> {
        run(command(&self.prefix, ["help"]))?;

        let usage = run_capturing_stdout(command(&self.prefix, ["fast-export", "--usage"]))?;
        let usage = String::from_utf8_lossy(&usage);
        for required in ["--plain", "--import-marks", "--export-marks", "--no-tags"] {
            if !usage.contains(required) {
                return Err(crate::error::EngineError::Config(format!(
                    "source VCS fast-export doesn't support {required:?}"
                )));
            }
        }
        Ok(())
    }
}
