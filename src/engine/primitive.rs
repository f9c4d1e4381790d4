//! The `clone-export-source-into-target` primitive (§4.5.1), shared by
//! `import-branch`, `update-branch`, and the first phase of `push-hook`.

use std::path::Path;

use tracing::{debug, info, warn};

use crate::error::Result;
use crate::guard::{TempBranch, TempDir, TempFile};
use crate::pipe::run_pipe;
use crate::repository::Repository;

use super::temp_branch_name;

/// Outcome of running the primitive.
pub enum Outcome {
    /// `should_export` returned false; nothing was exported, `finalize` was
    /// never called.
    NotUpdated,
    /// `finalize` ran. `marks_updated` is false for the empty-export
    /// recovery path (§4.5.1 step 6).
    Updated { marks_updated: bool },
}

/// Everything `finalize` needs to commit a transaction: temp resources
/// already populated with the right content, still owned by their guards so
/// an early return cleans them up.
pub struct FinalizeCtx<'a> {
    pub marks_updated: bool,
    pub temp_target_branch: String,
    pub temp_src_branch: &'a Path,
    pub tmp_src_marks: TempFile,
    pub tmp_target_marks: TempFile,
    pub target_branch_guard: TempBranch<Box<dyn FnMut(&str) + 'a>>,
}

/// Runs the primitive against `url`.
///
/// `should_export(temp_src_branch)` is evaluated once the source branch has
/// been cloned to a scratch location; if it returns false the whole
/// transaction is torn down and `Outcome::NotUpdated` is returned. `finalize`
/// is handed ownership of the temp resources and is responsible for
/// committing them -- disarming the guards it keeps, letting the rest clean
/// up on drop.
pub fn run<P, F>(repo: &Repository, url: &str, should_export: P, finalize: F) -> Result<Outcome>
where
    P: FnOnce(&Path) -> Result<bool>,
    F: FnOnce(&Repository, FinalizeCtx) -> Result<()>,
{
    let temp_target_branch = temp_branch_name();
    let temp_src_branch = repo.source_vcs_dir().join(&temp_target_branch);

    let tmp_src_marks_path = repo.tmp_path(&format!("{temp_target_branch}.src.marks"));
    let tmp_target_marks_path = repo.tmp_path(&format!("{temp_target_branch}.target.marks"));
    crate::marks::write_empty(&tmp_src_marks_path)?;
    crate::marks::write_empty(&tmp_target_marks_path)?;
    let tmp_src_marks = TempFile::new(&tmp_src_marks_path);
    let tmp_target_marks = TempFile::new(&tmp_target_marks_path);

    debug!(url, temp_target_branch, "cloning source branch");
    repo.source().clone(url, &temp_src_branch)?;
    // Kept alive purely for its Drop: finalize either renames this path away
    // (import-branch) or copies out of it without moving it (update-branch,
    // push-hook probe), in which case this cleans up the scratch clone.
    let _src_branch_guard = TempDir::new(&temp_src_branch);

    if !should_export(&temp_src_branch)? {
        info!(url, "source branch introduces nothing new, skipping export");
        return Ok(Outcome::NotUpdated);
    }

    let source_marks = repo.load_source_marks()?;
    let target_marks = repo.load_target_marks()?;

    let export_cmd = repo
        .source()
        .export(&temp_src_branch, &temp_target_branch, &repo.source_marks_path(), &tmp_src_marks_path);
    let import_cmd = repo.target().import(&repo.target_marks_path(), &tmp_target_marks_path);

    // Constructed before `run_pipe` runs: fast-import applies ref updates
    // incrementally as it processes the stream, so `temp_target_branch` may
    // already exist in the target VCS even if the pipe later fails. The
    // guard must be armed across that call so a failure still cleans up
    // whatever partial branch fast-import created (§4.5.1 step 5).
    let target_branch_guard: TempBranch<Box<dyn FnMut(&str) + '_>> = TempBranch::new(
        temp_target_branch.clone(),
        Box::new(move |name| {
            if let Err(e) = repo.target().remove_branch(name) {
                warn!(branch = name, error = %e, "failed to clean up temp target branch");
            }
        }),
    );

    info!(temp_target_branch, "exporting source branch into target");
    let exported_bytes = run_pipe(export_cmd, import_cmd)?;
    debug!(exported_bytes, "export/import pipe complete");

    let marks_updated = exported_bytes != 0;

    if !marks_updated {
        let rev = repo.source().tip(&temp_src_branch)?;
        let target_rev = source_marks.translate(&rev, &target_marks)?;
        info!(rev, target_rev, "empty export, recovering translation via marks");
        repo.target().new_branch(&temp_target_branch, &target_rev)?;
    }

    let ctx = FinalizeCtx {
        marks_updated,
        temp_target_branch: temp_target_branch.clone(),
        temp_src_branch: &temp_src_branch,
        tmp_src_marks,
        tmp_target_marks,
        target_branch_guard,
    };

    finalize(repo, ctx)?;

    Ok(Outcome::Updated { marks_updated })
}
