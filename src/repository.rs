//! The explicit `Repository` value (§9 "Global state", §10.3): opening a
//! repository directory produces one of these, bundling the loaded
//! configuration, every persisted-file path, and the two constructed VCS
//! drivers. No operation reaches for a module-level global.

use std::path::{Path, PathBuf};

use crate::config::{self, Config};
use crate::error::{EngineError, IoResultExt, Result};
use crate::marks::Marks;
use crate::registry::BranchRegistry;
use crate::vcs::{BzrDriver, GitDriver, SourceDriver, TargetDriver};

pub struct Repository {
    root: PathBuf,
    config: Config,
    source: Box<dyn SourceDriver>,
    target: Box<dyn TargetDriver>,
}

impl Repository {
    /// Builds a `Repository` for `root` with the given `config`, without
    /// touching the filesystem -- used by `init` before any of the layout
    /// exists yet, and by every other command once it does.
    pub fn new(root: impl Into<PathBuf>, config: Config) -> Self {
        let root = root.into();
        let quiet = config.verbosity.quiet_children();
        let source: Box<dyn SourceDriver> = Box::new(BzrDriver::new(config.source_command.clone(), quiet));
        let target: Box<dyn TargetDriver> = Box::new(GitDriver::new(config.target_command.clone(), quiet, root.clone()));
        Repository {
            root,
            config,
            source,
            target,
        }
    }

    /// Builds a `Repository` around already-constructed drivers, bypassing
    /// the default `BzrDriver`/`GitDriver` wiring. Used by tests to swap in
    /// fakes (see `testutil`).
    #[cfg(test)]
    pub fn with_drivers(root: impl Into<PathBuf>, config: Config, source: Box<dyn SourceDriver>, target: Box<dyn TargetDriver>) -> Self {
        Repository {
            root: root.into(),
            config,
            source,
            target,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn source(&self) -> &dyn SourceDriver {
        self.source.as_ref()
    }

    pub fn target(&self) -> &dyn TargetDriver {
        self.target.as_ref()
    }

    pub fn registry_path(&self) -> PathBuf {
        self.root.join(config::REGISTRY_FILE)
    }

    pub fn source_marks_path(&self) -> PathBuf {
        self.root.join(config::SOURCE_MARKS_FILE)
    }

    pub fn target_marks_path(&self) -> PathBuf {
        self.root.join(config::TARGET_MARKS_FILE)
    }

    pub fn source_vcs_dir(&self) -> PathBuf {
        self.root.join(config::SOURCE_VCS_SUBDIR)
    }

    pub fn tmp_dir(&self) -> PathBuf {
        self.root.join(config::TMP_DIR)
    }

    /// Path under the source-VCS subdirectory for a registered branch's
    /// working-tree-less checkout.
    pub fn source_branch_path(&self, source_name: &str) -> PathBuf {
        self.source_vcs_dir().join(source_name)
    }

    pub fn load_registry(&self) -> Result<BranchRegistry> {
        BranchRegistry::load(&self.registry_path())
    }

    pub fn load_source_marks(&self) -> Result<Marks> {
        Marks::load(&self.source_marks_path())
    }

    pub fn load_target_marks(&self) -> Result<Marks> {
        Marks::load(&self.target_marks_path())
    }

    /// Allocates a fresh path in `<tmp-dir>` for scratch files, without
    /// creating anything on disk.
    pub fn tmp_path(&self, name: &str) -> PathBuf {
        self.tmp_dir().join(name)
    }

    /// Opens the repository at `root`, validating that the layout created by
    /// `init` (§4.5.2) exists. Every command except `init` itself calls this.
    pub fn open(root: impl Into<PathBuf>, config: Config) -> Result<Self> {
        let repo = Repository::new(root, config);
        for required in [repo.registry_path(), repo.source_marks_path(), repo.target_marks_path()] {
            if !required.exists() {
                return Err(EngineError::Config(format!(
                    "{} is not an initialized repository (missing {})",
                    repo.root.display(),
                    required.display()
                )));
            }
        }
        Ok(repo)
    }

    /// Creates the repository layout in an empty (or not-yet-existing)
    /// directory: target-VCS bare repo, source-VCS shared repository, empty
    /// registry, empty marks files, tmp directory (§4.5.2).
    pub fn init(root: impl Into<PathBuf>, config: Config) -> Result<Self> {
        let repo = Repository::new(root, config);
        std::fs::create_dir_all(&repo.root).io_ctx(&repo.root)?;

        let source_dir = repo.source_vcs_dir();
        std::fs::create_dir_all(&source_dir).io_ctx(&source_dir)?;
        repo.source.init_repo(&source_dir)?;

        repo.target.init_repo(&repo.root)?;

        BranchRegistry::write_empty(&repo.registry_path())?;
        Marks::write_empty(&repo.source_marks_path())?;
        Marks::write_empty(&repo.target_marks_path())?;

        let tmp_dir = repo.tmp_dir();
        std::fs::create_dir_all(&tmp_dir).io_ctx(&tmp_dir)?;

        Ok(repo)
    }
}
