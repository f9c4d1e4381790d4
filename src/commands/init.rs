//! `init` (§4.5.2).

use std::path::Path;

use tracing::info;

use crate::config::Config;
use crate::error::Result;
use crate::repository::Repository;

pub fn init(path: &Path, config: Config) -> Result<()> {
    Repository::init(path, config)?;
    info!(path = %path.display(), "initialized repository");
    Ok(())
}
