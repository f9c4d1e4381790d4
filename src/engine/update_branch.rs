//! `update-branch` (§4.5.4): re-sync one or more already-registered branches.

use std::panic::{self, AssertUnwindSafe};

use tracing::{error, info};

use crate::error::{EngineError, IoResultExt, Result};
use crate::marks;
use crate::registry::BranchRecord;
use crate::repository::Repository;

use super::primitive::{self, FinalizeCtx};

pub enum UpdateSelection<'a> {
    All,
    Named(&'a [String]),
}

pub fn update_branch(repo: &Repository, selection: UpdateSelection) -> Result<()> {
    let registry = repo.load_registry()?;

    let records: Vec<BranchRecord> = match selection {
        UpdateSelection::All => registry.branches().to_vec(),
        UpdateSelection::Named(names) => {
            let mut out = Vec::with_capacity(names.len());
            for name in names {
                let record = registry
                    .by_target_name(name)
                    .ok_or_else(|| EngineError::PolicyReject(format!("unknown target branch {name:?}")))?;
                out.push(record.clone());
            }
            out
        }
    };

    let mut failures = Vec::new();
    for record in records {
        let target_name = record.target_name.clone();
        let result = panic::catch_unwind(AssertUnwindSafe(|| update_one(repo, &record)));
        match result {
            Ok(Ok(())) => info!(target_name, "update committed"),
            Ok(Err(e)) => {
                error!(target_name, error = %e, "update failed");
                failures.push((target_name, e.to_string()));
            }
            Err(panic) => {
                let msg = panic_message(&panic);
                error!(target_name, panic = %msg, "update panicked");
                failures.push((target_name, format!("panicked: {msg}")));
            }
        }
    }

    if failures.is_empty() {
        Ok(())
    } else {
        let detail = failures
            .iter()
            .map(|(name, msg)| format!("{name}: {msg}"))
            .collect::<Vec<_>>()
            .join("; ");
        Err(EngineError::PolicyReject(format!("{} branch(es) failed to update: {detail}", failures.len())))
    }
}

fn update_one(repo: &Repository, record: &BranchRecord) -> Result<()> {
    let permanent_src_branch = repo.source_branch_path(&record.source_name);
    let target_name = record.target_name.clone();

    let outcome = primitive::run(
        repo,
        &record.url,
        |_temp_src_branch| Ok(true),
        move |repo, ctx: FinalizeCtx| {
            repo.source().pull_overwrite(ctx.temp_src_branch, &permanent_src_branch)?;
            repo.target().rename_branch(&ctx.temp_target_branch, &target_name)?;
            ctx.target_branch_guard.disarm();

            if ctx.marks_updated {
                marks::commit_marks_file(ctx.tmp_src_marks.path(), &repo.source_marks_path())?;
                marks::commit_marks_file(ctx.tmp_target_marks.path(), &repo.target_marks_path())?;
                ctx.tmp_src_marks.disarm();
                ctx.tmp_target_marks.disarm();
            }
            Ok(())
        },
    )?;

    let _ = outcome;
    Ok(())
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::engine::import_branch::{import_branch, ImportBranchRequest};
    use crate::repository::Repository;
    use crate::testutil::{self, PanickingSourceDriver};

    fn ref_content(fake: &testutil::FakeRepo, target_name: &str) -> String {
        fs::read_to_string(fake.repository.root().join(".fake_git_refs").join(target_name)).unwrap()
    }

    #[test]
    fn update_no_op_leaves_marks_and_ref_unchanged() {
        let fake = testutil::fake_repository();
        let remote = testutil::fake_remote(&fake.tempdir.path().join("remote"), "r1");

        import_branch(
            &fake.repository,
            ImportBranchRequest {
                url: remote.to_str().unwrap(),
                source_name: "foo",
                target_name: None,
            },
        )
        .unwrap();

        update_branch(&fake.repository, UpdateSelection::Named(&["foo".to_string()])).unwrap();

        assert_eq!(ref_content(&fake, "foo"), "target-r1");
        assert_eq!(fake.repository.load_source_marks().unwrap().len(), 1);
        assert_eq!(fake.repository.load_target_marks().unwrap().len(), 1);
    }

    #[test]
    fn update_forward_grows_marks_and_updates_ref() {
        let fake = testutil::fake_repository();
        let remote = testutil::fake_remote(&fake.tempdir.path().join("remote"), "r1");

        import_branch(
            &fake.repository,
            ImportBranchRequest {
                url: remote.to_str().unwrap(),
                source_name: "foo",
                target_name: None,
            },
        )
        .unwrap();

        fs::write(remote.join(".rev"), "r2").unwrap();

        update_branch(&fake.repository, UpdateSelection::All).unwrap();

        assert_eq!(ref_content(&fake, "foo"), "target-r2");
        assert_eq!(fake.repository.load_source_marks().unwrap().len(), 2);
        assert_eq!(fake.repository.load_target_marks().unwrap().len(), 2);
    }

    #[test]
    fn update_rejects_unknown_target_name() {
        let fake = testutil::fake_repository();
        let err = update_branch(&fake.repository, UpdateSelection::Named(&["nope".to_string()])).unwrap_err();
        assert!(matches!(err, EngineError::PolicyReject(_)));
    }

    #[test]
    fn update_isolates_a_panicking_branch_from_the_rest() {
        let fake = testutil::fake_repository();
        let good_remote = testutil::fake_remote(&fake.tempdir.path().join("good"), "r1");
        let bad_remote = testutil::fake_remote(&fake.tempdir.path().join("bad"), "r1");

        import_branch(
            &fake.repository,
            ImportBranchRequest {
                url: good_remote.to_str().unwrap(),
                source_name: "good",
                target_name: None,
            },
        )
        .unwrap();
        import_branch(
            &fake.repository,
            ImportBranchRequest {
                url: bad_remote.to_str().unwrap(),
                source_name: "bad",
                target_name: None,
            },
        )
        .unwrap();

        fs::write(good_remote.join(".rev"), "r2").unwrap();
        fs::write(bad_remote.join(".rev"), "r2").unwrap();

        // Swap in a source driver that panics while cloning the "bad" remote,
        // to confirm catch_unwind isolates that branch's failure instead of
        // aborting the whole `update` run.
        let panicking_repo = Repository::with_drivers(
            fake.repository.root().to_path_buf(),
            fake.repository.config().clone(),
            Box::new(PanickingSourceDriver {
                trigger_url: bad_remote.to_str().unwrap().to_string(),
            }),
            Box::new(testutil::FakeTargetDriver::new(fake.repository.root().to_path_buf())),
        );

        let err = update_branch(&panicking_repo, UpdateSelection::All).unwrap_err();
        assert!(matches!(err, EngineError::PolicyReject(_)));
        assert!(err.to_string().contains("bad"));

        assert_eq!(ref_content(&fake, "good"), "target-r2");
        assert_eq!(ref_content(&fake, "bad"), "target-r1");
    }
}
