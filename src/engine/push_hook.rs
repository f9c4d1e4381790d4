//! `push-hook` / `update-hook` (§4.5.5): mirrors a fast-forward update on the
//! target VCS back into the source VCS.

use tracing::info;

use crate::config::{PUSH_HOOK_TEMP_BRANCH_PREFIX, ZERO_REV};
use crate::error::{EngineError, Result};
use crate::guard::{TempBranch, TempDir, TempFile};
use crate::marks;
use crate::pipe::run_pipe;
use crate::repository::Repository;

use super::primitive::{self, Outcome};

pub struct PushHookRequest<'a> {
    pub ref_name: &'a str,
    pub old_rev: &'a str,
    pub new_rev: &'a str,
}

pub fn push_hook(repo: &Repository, req: PushHookRequest) -> Result<()> {
    let target_name = req
        .ref_name
        .strip_prefix("refs/heads/")
        .ok_or_else(|| EngineError::PolicyReject(format!("ref {:?} is not under refs/heads/", req.ref_name)))?;

    if req.old_rev == ZERO_REV || req.new_rev == ZERO_REV {
        return Err(EngineError::PolicyReject(
            "branch creation/deletion through the push hook is rejected".to_string(),
        ));
    }

    let registry = repo.load_registry()?;
    let record = registry
        .by_target_name(target_name)
        .ok_or_else(|| EngineError::PolicyReject(format!("target branch {target_name:?} is not registered")))?
        .clone();

    let permanent_src_branch = repo.source_branch_path(&record.source_name);

    // 1. Divergence probe: clone the source URL and check whether it has
    // moved beyond what we already imported. If so, both sides have new
    // commits and we must not silently pick one.
    let probe = {
        let permanent_src_branch = permanent_src_branch.clone();
        primitive::run(
            repo,
            &record.url,
            move |temp_src_branch| check_if_branch_updated(repo, temp_src_branch, &permanent_src_branch),
            |_repo, _ctx| Ok(()),
        )?
    };
    if matches!(probe, Outcome::Updated { .. }) {
        return Err(EngineError::PolicyReject(format!(
            "source and target branches for {target_name:?} have diverged"
        )));
    }

    // 2. Fast-forward check.
    let non_ff = repo.target().left_rev_list(req.old_rev, req.new_rev)?;
    if !non_ff.is_empty() {
        return Err(EngineError::PolicyReject(format!(
            "update of {target_name:?} is not a fast-forward"
        )));
    }

    // 3. Export target -> import source & push.
    let temp_target_branch = format!("{PUSH_HOOK_TEMP_BRANCH_PREFIX}{target_name}");
    let temp_src_branch = repo.source_vcs_dir().join(&temp_target_branch);

    repo.target().new_branch(&temp_target_branch, req.new_rev)?;
    // Kept alive purely for its Drop: nothing renames this ref away, so
    // letting it go out of scope at the end of this function removes it.
    let _target_branch_guard = TempBranch::new(temp_target_branch.clone(), |name| {
        if let Err(e) = repo.target().remove_branch(name) {
            tracing::warn!(branch = name, error = %e, "failed to clean up push-hook temp target branch");
        }
    });

    if let Some(parent) = temp_src_branch.parent() {
        std::fs::create_dir_all(parent).map_err(|e| EngineError::io(parent, e))?;
    }

    let tmp_src_marks_path = repo.tmp_path(&format!("{}.src.marks", temp_target_branch.replace('/', "_")));
    let tmp_target_marks_path = repo.tmp_path(&format!("{}.target.marks", temp_target_branch.replace('/', "_")));
    marks::write_empty(&tmp_src_marks_path)?;
    marks::write_empty(&tmp_target_marks_path)?;
    let tmp_src_marks = TempFile::new(&tmp_src_marks_path);
    let tmp_target_marks = TempFile::new(&tmp_target_marks_path);

    let source_marks = repo.load_source_marks()?;
    let target_marks = repo.load_target_marks()?;

    let export_cmd = repo.target().export(&temp_target_branch, &repo.target_marks_path(), &tmp_target_marks_path);
    let import_cmd = repo.source().import(&repo.source_vcs_dir(), &repo.source_marks_path(), &tmp_src_marks_path);

    info!(target_name, "exporting target branch back into source");
    let exported_bytes = run_pipe(export_cmd, import_cmd)?;
    let marks_updated = exported_bytes != 0;

    // Same here: this scratch clone is only read from below, never moved.
    let _src_branch_guard = if marks_updated {
        // fast-import has already materialized the branch tip commit inside
        // the shared source-VCS repository, but only the freshly written
        // marks (not yet committed over the permanent ones) record which
        // revid it landed at -- resolve through those.
        let fresh_target_marks = marks::Marks::load(&tmp_target_marks_path)?;
        let fresh_source_marks = marks::Marks::load(&tmp_src_marks_path)?;
        let source_rev = fresh_target_marks.translate(req.new_rev, &fresh_source_marks)?;
        repo.source().new_branch(&temp_src_branch, &source_rev)?;
        TempDir::new(&temp_src_branch)
    } else {
        // Nothing new was imported; the translation already exists in the
        // permanent marks files.
        let source_rev = target_marks.translate(req.new_rev, &source_marks)?;
        repo.source().new_branch(&temp_src_branch, &source_rev)?;
        TempDir::new(&temp_src_branch)
    };

    repo.source().push(&temp_src_branch, &record.url)?;
    repo.source().pull_overwrite(&temp_src_branch, &permanent_src_branch)?;

    if marks_updated {
        marks::commit_marks_file(tmp_src_marks.path(), &repo.source_marks_path())?;
        marks::commit_marks_file(tmp_target_marks.path(), &repo.target_marks_path())?;
        tmp_src_marks.disarm();
        tmp_target_marks.disarm();
    }

    // `target_branch_guard` and `src_branch_guard` are left armed: unlike
    // import-branch's temp target branch, nothing renames these away, so
    // their Drop impls do the real cleanup work once this function returns.
    info!(target_name, "push-hook committed");
    Ok(())
}

/// §4.5.6: true iff the freshly cloned `temp_src_branch` carries revisions
/// not present in the registered `permanent_src_branch`.
fn check_if_branch_updated(repo: &Repository, temp_src_branch: &std::path::Path, permanent_src_branch: &std::path::Path) -> Result<bool> {
    let temp_tip = repo.source().tip(temp_src_branch)?;
    let permanent_tip = repo.source().tip(permanent_src_branch)?;
    Ok(temp_tip != permanent_tip)
}
