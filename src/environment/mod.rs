//! Environment detection module.
//!
//! Determines whether the agent itself runs inside a container, and whether a
//! given process does.
mod checks;
mod detect;
mod error;

pub use checks::{CgroupEntry, is_container_cgroup_path, is_process_in_container, parse_cgroup_line};
pub use detect::{RuntimeContext, RuntimeEnvironment};
pub use error::{Error, Result};
