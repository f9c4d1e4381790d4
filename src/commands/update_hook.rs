//! `update-hook` (§4.5.5): wired as the target VCS's pre-receive/update hook.

use crate::config::Config;
use crate::engine::push_hook::{self, PushHookRequest};
use crate::error::Result;
use crate::repository::Repository;

pub fn update_hook(root: &std::path::Path, config: Config, ref_name: &str, old_rev: &str, new_rev: &str) -> Result<()> {
    let repo = Repository::open(root, config)?;
    push_hook::push_hook(&repo, PushHookRequest { ref_name, old_rev, new_rev })
}
