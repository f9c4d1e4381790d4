//! Per-invocation configuration and the fixed repository layout constants.
//!
//! There is no process-wide mutable state (unlike the tool this was ported
//! from, which kept the VCS command prefixes as package-level variables): a
//! [`Config`] is built once in `main` and threaded through every operation
//! via [`crate::repository::Repository`].

/// Name of the branch registry file, relative to the repository root.
pub const REGISTRY_FILE: &str = "git-bzr-bridge-branches.cfg";
/// Name of the source-VCS marks file, relative to the repository root.
pub const SOURCE_MARKS_FILE: &str = "git-bzr-bridge-bzr.marks";
/// Name of the target-VCS marks file, relative to the repository root.
pub const TARGET_MARKS_FILE: &str = "git-bzr-bridge-git.marks";
/// Subdirectory holding all source-VCS branches (no working trees).
pub const SOURCE_VCS_SUBDIR: &str = "bzr";
/// Scratch directory for in-flight transactions.
pub const TMP_DIR: &str = "git-bzr-bridge-tmp";

/// Prefix used for the target-VCS temp branch created while mirroring a
/// target-VCS ref back into the source VCS (§4.5.5 step 3a).
pub const PUSH_HOOK_TEMP_BRANCH_PREFIX: &str = "__git_import/";

/// All-zeroes sentinel used by the target VCS to signal ref creation/deletion.
pub const ZERO_REV: &str = "0000000000000000000000000000000000000000";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verbosity {
    Normal,
    Verbose,
    Debug,
}

impl Verbosity {
    pub fn from_flags(verbose: bool, debug: bool) -> Self {
        if debug {
            Verbosity::Debug
        } else if verbose {
            Verbosity::Verbose
        } else {
            Verbosity::Normal
        }
    }

    /// Whether driver invocations should add `--quiet` to their VCS command
    /// line (added whenever verbosity is below debug, per §4.1).
    pub fn quiet_children(self) -> bool {
        self < Verbosity::Debug
    }
}

/// Resolved configuration for one invocation of the tool.
#[derive(Debug, Clone)]
pub struct Config {
    /// Command-line prefix used to invoke the source VCS binary, e.g. `["bzr"]`.
    pub source_command: Vec<String>,
    /// Command-line prefix used to invoke the target VCS binary, e.g. `["git"]`.
    pub target_command: Vec<String>,
    pub verbosity: Verbosity,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            source_command: vec!["bzr".to_string()],
            target_command: vec!["git".to_string()],
            verbosity: Verbosity::Normal,
        }
    }
}
