//! `branches` (§6): list registered target branches, sorted by target name.

use crate::config::Config;
use crate::error::Result;
use crate::repository::Repository;

pub fn branches(root: &std::path::Path, config: Config, verbose: bool) -> Result<()> {
    let repo = Repository::open(root, config)?;
    let registry = repo.load_registry()?;

    for record in registry.sorted_by_target_name() {
        if verbose {
            println!("{}\t{}\t{}", record.target_name, record.source_name, record.url);
        } else {
            println!("{}", record.target_name);
        }
    }
    Ok(())
}
