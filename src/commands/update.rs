//! `update` (§4.5.4).

use crate::config::Config;
use crate::engine::update_branch::{self, UpdateSelection};
use crate::error::Result;
use crate::repository::Repository;

pub fn update(root: &std::path::Path, config: Config, target_names: &[String], all: bool) -> Result<()> {
    let repo = Repository::open(root, config)?;
    let selection = if all {
        UpdateSelection::All
    } else {
        UpdateSelection::Named(target_names)
    };
    update_branch::update_branch(&repo, selection)
}
