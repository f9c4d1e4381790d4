//! `import-branch` (§4.5.3): register a new branch pair and run the first
//! sync into it.

use std::fs;

use tracing::info;

use crate::error::{EngineError, IoResultExt, Result};
use crate::marks;
use crate::registry::BranchRecord;
use crate::repository::Repository;

use super::primitive::{self, FinalizeCtx, Outcome};

pub struct ImportBranchRequest<'a> {
    pub url: &'a str,
    pub source_name: &'a str,
    pub target_name: Option<&'a str>,
}

pub fn import_branch(repo: &Repository, req: ImportBranchRequest) -> Result<()> {
    let target_name = req.target_name.unwrap_or(req.source_name);

    let registry = repo.load_registry()?;
    if registry.by_source_name(req.source_name).is_some() {
        return Err(EngineError::PolicyReject(format!(
            "source branch name {:?} already registered",
            req.source_name
        )));
    }
    if registry.by_target_name(target_name).is_some() {
        return Err(EngineError::PolicyReject(format!(
            "target branch name {target_name:?} already registered"
        )));
    }

    let permanent_src_branch = repo.source_branch_path(req.source_name);
    let source_name = req.source_name.to_string();
    let target_name_owned = target_name.to_string();
    let url = req.url.to_string();

    let outcome = primitive::run(
        repo,
        req.url,
        |_temp_src_branch| Ok(true),
        move |repo, ctx: FinalizeCtx| {
            if let Some(parent) = permanent_src_branch.parent() {
                fs::create_dir_all(parent).io_ctx(parent)?;
            }
            fs::rename(ctx.temp_src_branch, &permanent_src_branch).io_ctx(&permanent_src_branch)?;

            repo.target().rename_branch(&ctx.temp_target_branch, &target_name_owned)?;
            ctx.target_branch_guard.disarm();

            crate::registry::BranchRegistry::add(
                &repo.registry_path(),
                BranchRecord {
                    url: url.clone(),
                    source_name: source_name.clone(),
                    target_name: target_name_owned.clone(),
                },
            )?;

            if ctx.marks_updated {
                marks::commit_marks_file(ctx.tmp_src_marks.path(), &repo.source_marks_path())?;
                marks::commit_marks_file(ctx.tmp_target_marks.path(), &repo.target_marks_path())?;
                ctx.tmp_src_marks.disarm();
                ctx.tmp_target_marks.disarm();
            }

            info!(target_name = %target_name_owned, "import-branch committed");
            Ok(())
        },
    )?;

    match outcome {
        Outcome::Updated { .. } => Ok(()),
        // should_export is always-true for import-branch, so this arm is
        // unreachable in practice; treated as success rather than panicking.
        Outcome::NotUpdated => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil;

    #[test]
    fn import_registers_branch_and_writes_marks() {
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

        let registry = fake.repository.load_registry().unwrap();
        let record = registry.by_target_name("foo").unwrap();
        assert_eq!(record.source_name, "foo");
        assert_eq!(record.url, remote.to_str().unwrap());

        let source_marks = fake.repository.load_source_marks().unwrap();
        let target_marks = fake.repository.load_target_marks().unwrap();
        assert_eq!(source_marks.len(), 1);
        assert_eq!(target_marks.len(), 1);

        let ref_content = fs::read_to_string(fake.repository.root().join(".fake_git_refs").join("foo")).unwrap();
        assert_eq!(ref_content, "target-r1");
    }

    #[test]
    fn import_rejects_clashing_source_name_before_any_mutation() {
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

        let err = import_branch(
            &fake.repository,
            ImportBranchRequest {
                url: remote.to_str().unwrap(),
                source_name: "foo",
                target_name: Some("bar"),
            },
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::PolicyReject(_)));

        let registry = fake.repository.load_registry().unwrap();
        assert_eq!(registry.branches().len(), 1);
    }
}
