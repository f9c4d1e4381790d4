//! Command handlers: one module per CLI subcommand (§6), each a thin
//! translation from parsed arguments into a `Repository` + `engine` call.

pub mod branches;
pub mod import;
pub mod init;
pub mod test_install;
pub mod update;
pub mod update_hook;

pub use branches::branches;
pub use import::import;
pub use init::init;
pub use test_install::test_install;
pub use update::update;
pub use update_hook::update_hook;
