//! `import` (§4.5.3).

use crate::config::Config;
use crate::engine::import_branch::{self, ImportBranchRequest};
use crate::error::Result;
use crate::repository::Repository;

pub fn import(root: &std::path::Path, config: Config, url: &str, source_name: &str, target_name: Option<&str>) -> Result<()> {
    let repo = Repository::open(root, config)?;
    import_branch::import_branch(
        &repo,
        ImportBranchRequest {
            url,
            source_name,
            target_name,
        },
    )
}
