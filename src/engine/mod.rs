//! The Synchronization Engine (§4.5): the transactional orchestrator built
//! around the `clone-export-source-into-target` primitive, specialized into
//! the four top-level operations.

mod primitive;

pub mod import_branch;
pub mod push_hook;
pub mod update_branch;

pub use import_branch::import_branch;
pub use push_hook::push_hook;
pub use update_branch::update_branch;

use rand::Rng;

/// Generates a unique temp target-VCS branch name of the form
/// `__bzr_import_<pid>_<random>` (§4.5.1 step 1).
pub fn temp_branch_name() -> String {
    let pid = std::process::id();
    let rand: u64 = rand::thread_rng().gen();
    format!("__bzr_import_{pid}_{rand:016x}")
}
