//! `test-install`: health-checks both VCS binaries and their fast-export
//! plugin's option support (§4.1).

use crate::config::Config;
use crate::error::{EngineError, Result};
use crate::repository::Repository;

pub fn test_install(root: &std::path::Path, config: Config) -> Result<()> {
    let repo = Repository::new(root, config);

    let source_result = repo.source().test_install();
    let target_result = repo.target().test_install();

    if let Err(e) = &source_result {
        println!("source VCS: FAILED: {e}");
    } else {
        println!("source VCS: ok");
    }
    if let Err(e) = &target_result {
        println!("target VCS: FAILED: {e}");
    } else {
        println!("target VCS: ok");
    }

    match (source_result, target_result) {
        (Ok(()), Ok(())) => Ok(()),
        (Err(e), _) | (_, Err(e)) => Err(EngineError::Config(format!("test-install failed: {e}"))),
    }
}
