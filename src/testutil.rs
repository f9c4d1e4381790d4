//! Test support: fake `SourceDriver`/`TargetDriver` implementations that
//! simulate fast-export/fast-import/branch semantics without requiring a
//! real `bzr` or `git` binary, plus a scratch `Repository` builder.
//!
//! Branches are modeled as plain directories containing a `.rev` file with
//! the revision-id text; "URLs" are themselves filesystem paths to such a
//! directory, standing in for a remote. `export`/`import` still return real
//! `Command`s (spawned by the Pipe Runner exactly like the real drivers),
//! built as tiny `/bin/sh` scripts so the transactional skeleton is
//! exercised end-to-end rather than mocked away.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use tempfile::TempDir;

use crate::config::Config;
use crate::error::{EngineError, IoResultExt, Result};
use crate::repository::Repository;
use crate::vcs::{SourceDriver, TargetDriver};

fn sh(script: String) -> Command {
    let mut c = Command::new("/bin/sh");
    c.arg("-c").arg(script);
    c
}

fn read_rev(branch_path: &Path) -> Result<String> {
    fs::read_to_string(branch_path.join(".rev"))
        .io_ctx(branch_path)
        .map(|s| s.trim().to_string())
}

fn write_rev(branch_path: &Path, rev: &str) -> Result<()> {
    fs::create_dir_all(branch_path).io_ctx(branch_path)?;
    fs::write(branch_path.join(".rev"), rev).io_ctx(branch_path)
}

pub struct FakeSourceDriver;

impl SourceDriver for FakeSourceDriver {
    fn init_repo(&self, path: &Path) -> Result<()> {
        fs::create_dir_all(path).io_ctx(path)
    }

    fn clone(&self, url: &str, path: &Path) -> Result<()> {
        let rev = read_rev(Path::new(url))?;
        write_rev(path, &rev)
    }

    fn export(&self, branch_path: &Path, target_name_hint: &str, in_marks: &Path, out_marks: &Path) -> Command {
        // If `branch_path`'s revision is already the last field of some line
        // in `in_marks`, this is a no-op export (zero bytes). Otherwise emit
        // a one-commit stream carrying the mark and revision, and append the
        // new mark to `out_marks`.
        let script = format!(
            r#"
rev=$(cat '{branch}/.rev')
if grep -qF " $rev" '{in_marks}' 2>/dev/null; then
    cp '{in_marks}' '{out_marks}' 2>/dev/null || : > '{out_marks}'
else
    n=$( (wc -l < '{in_marks}') 2>/dev/null || echo 0)
    mark=$((n + 1))
    cp '{in_marks}' '{out_marks}' 2>/dev/null || : > '{out_marks}'
    echo ":$mark $rev" >> '{out_marks}'
    printf 'MARK %s\nREF %s\nREV %s\n' "$mark" '{target_name_hint}' "$rev"
fi
"#,
            branch = branch_path.display(),
            in_marks = in_marks.display(),
            out_marks = out_marks.display(),
            target_name_hint = target_name_hint,
        );
        sh(script)
    }

    fn import(&self, _repo_root: &Path, in_marks: &Path, out_marks: &Path) -> Command {
        // Reverse direction (push-hook): records `src-<target-rev>` for
        // whatever mark/rev the upstream fed in, or leaves marks untouched
        // when the stream is empty.
        let script = format!(
            r#"
cp '{in_marks}' '{out_marks}' 2>/dev/null || : > '{out_marks}'
mark=""
rev=""
while IFS= read -r line; do
    case "$line" in
        MARK\ *) mark=${{line#MARK }} ;;
        REV\ *) rev=${{line#REV }} ;;
    esac
done
if [ -n "$mark" ]; then
    echo ":$mark src-$rev" >> '{out_marks}'
fi
"#,
            in_marks = in_marks.display(),
            out_marks = out_marks.display(),
        );
        sh(script)
    }

    fn tip(&self, path: &Path) -> Result<String> {
        read_rev(path)
    }

    fn pull_overwrite(&self, from: &Path, to: &Path) -> Result<()> {
        let rev = read_rev(from)?;
        write_rev(to, &rev)
    }

    fn push(&self, branch_path: &Path, url: &str) -> Result<()> {
        let rev = read_rev(branch_path)?;
        write_rev(Path::new(url), &rev)
    }

    fn new_branch(&self, path: &Path, rev: &str) -> Result<()> {
        write_rev(path, rev)
    }

    fn test_install(&self) -> Result<()> {
        Ok(())
    }
}

pub struct FakeTargetDriver {
    repo_root: PathBuf,
}

impl FakeTargetDriver {
    pub fn new(repo_root: impl Into<PathBuf>) -> Self {
        FakeTargetDriver { repo_root: repo_root.into() }
    }

    fn ref_path(&self, name: &str) -> PathBuf {
        self.repo_root.join(".fake_git_refs").join(name)
    }
}

impl TargetDriver for FakeTargetDriver {
    fn init_repo(&self, path: &Path) -> Result<()> {
        fs::create_dir_all(path.join(".fake_git_refs")).io_ctx(path)
    }

    fn export(&self, branch: &str, in_marks: &Path, out_marks: &Path) -> Command {
        let ref_path = self.ref_path(branch);
        let script = format!(
            r#"
rev=$(cat '{ref_path}')
if grep -qF " $rev" '{in_marks}' 2>/dev/null; then
    cp '{in_marks}' '{out_marks}' 2>/dev/null || : > '{out_marks}'
else
    n=$( (wc -l < '{in_marks}') 2>/dev/null || echo 0)
    mark=$((n + 1))
    cp '{in_marks}' '{out_marks}' 2>/dev/null || : > '{out_marks}'
    echo ":$mark $rev" >> '{out_marks}'
    printf 'MARK %s\nREV %s\n' "$mark" "$rev"
fi
"#,
            ref_path = ref_path.display(),
            in_marks = in_marks.display(),
            out_marks = out_marks.display(),
        );
        sh(script)
    }

    fn import(&self, in_marks: &Path, out_marks: &Path) -> Command {
        let refs_dir = self.repo_root.join(".fake_git_refs");
        let script = format!(
            r#"
mkdir -p '{refs_dir}'
cp '{in_marks}' '{out_marks}' 2>/dev/null || : > '{out_marks}'
mark=""
rev=""
branch=""
while IFS= read -r line; do
    case "$line" in
        MARK\ *) mark=${{line#MARK }} ;;
        REF\ *) branch=${{line#REF }} ;;
        REV\ *) rev=${{line#REV }} ;;
    esac
done
if [ -n "$branch" ]; then
    target_rev="target-$rev"
    echo "$target_rev" > "{refs_dir}/$branch"
    if [ -n "$mark" ]; then
        echo ":$mark $target_rev" >> '{out_marks}'
    fi
fi
"#,
            refs_dir = refs_dir.display(),
            in_marks = in_marks.display(),
            out_marks = out_marks.display(),
        );
        sh(script)
    }

    fn rename_branch(&self, from: &str, to: &str) -> Result<()> {
        let from_path = self.ref_path(from);
        let to_path = self.ref_path(to);
        fs::rename(&from_path, &to_path).io_ctx(&to_path)
    }

    fn remove_branch(&self, name: &str) -> Result<()> {
        let path = self.ref_path(name);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(EngineError::io(path, e)),
        }
    }

    fn new_branch(&self, name: &str, rev: &str) -> Result<()> {
        let path = self.ref_path(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).io_ctx(parent)?;
        }
        fs::write(&path, rev).io_ctx(&path)
    }

    fn left_rev_list(&self, old: &str, new: &str) -> Result<Vec<u8>> {
        // Fake ancestry: `new` fast-forwards from `old` iff `new` carries
        // `old`'s revision as a literal substring (tests construct revs like
        // "r1", "r1+r2" to model this cheaply).
        if new.contains(old) {
            Ok(Vec::new())
        } else {
            Ok(b"diverged".to_vec())
        }
    }

    fn test_install(&self) -> Result<()> {
        Ok(())
    }
}

/// A scratch repository wired up with the fake drivers instead of real `bzr`
/// / `git` processes, for engine-level transactional tests. Lays out the
/// full on-disk structure `Repository::init` would, without shelling out.
pub struct FakeRepo {
    pub tempdir: TempDir,
    pub repository: Repository,
}

pub fn fake_repository() -> FakeRepo {
    let tempdir = TempDir::new().expect("tempdir");
    let root = tempdir.path().join("repo");
    let config = Config::default();

    let repository = Repository::with_drivers(root.clone(), config, Box::new(FakeSourceDriver), Box::new(FakeTargetDriver::new(root)));

    fs::create_dir_all(repository.root()).unwrap();
    repository.source().init_repo(&repository.source_vcs_dir()).unwrap();
    repository.target().init_repo(repository.root()).unwrap();
    crate::registry::BranchRegistry::write_empty(&repository.registry_path()).unwrap();
    crate::marks::write_empty(&repository.source_marks_path()).unwrap();
    crate::marks::write_empty(&repository.target_marks_path()).unwrap();
    fs::create_dir_all(repository.tmp_dir()).unwrap();

    FakeRepo { tempdir, repository }
}

/// Creates a fake "remote" source branch at `rev`, ready to be passed as a
/// `url` to `clone`/`import_branch`.
pub fn fake_remote(dir: &Path, rev: &str) -> PathBuf {
    fs::create_dir_all(dir).unwrap();
    fs::write(dir.join(".rev"), rev).unwrap();
    dir.to_path_buf()
}

/// Delegates to `FakeSourceDriver` for everything except `clone`, which
/// panics when asked to clone `trigger_url`. Used to exercise `update-branch`'s
/// per-branch panic-isolation boundary without a real bug to trigger it.
pub struct PanickingSourceDriver {
    pub trigger_url: String,
}

impl SourceDriver for PanickingSourceDriver {
    fn init_repo(&self, path: &Path) -> Result<()> {
        FakeSourceDriver.init_repo(path)
    }

    fn clone(&self, url: &str, path: &Path) -> Result<()> {
        if url == self.trigger_url {
            panic!("simulated panic while cloning {url}");
        }
        FakeSourceDriver.clone(url, path)
    }

    fn export(&self, branch_path: &Path, target_name_hint: &str, in_marks: &Path, out_marks: &Path) -> Command {
        FakeSourceDriver.export(branch_path, target_name_hint, in_marks, out_marks)
    }

    fn import(&self, repo_root: &Path, in_marks: &Path, out_marks: &Path) -> Command {
        FakeSourceDriver.import(repo_root, in_marks, out_marks)
    }

    fn tip(&self, path: &Path) -> Result<String> {
        FakeSourceDriver.tip(path)
    }

    fn pull_overwrite(&self, from: &Path, to: &Path) -> Result<()> {
        FakeSourceDriver.pull_overwrite(from, to)
    }

    fn push(&self, branch_path: &Path, url: &str) -> Result<()> {
        FakeSourceDriver.push(branch_path, url)
    }

    fn new_branch(&self, path: &Path, rev: &str) -> Result<()> {
        FakeSourceDriver.new_branch(path, rev)
    }

    fn test_install(&self) -> Result<()> {
        FakeSourceDriver.test_install()
    }
}
