//! VCS driver traits and their concrete shell-out implementations.
//!
//! The engine talks to both sides of the bridge through these traits so that
//! `engine::*` never shells out directly; tests substitute fakes (see
//! `testutil`) instead of requiring real `bzr`/`git` binaries.

pub mod process;
pub mod source;
pub mod target;

pub use source::{BzrDriver, SourceDriver};
pub use target::{GitDriver, TargetDriver};
