//! Utilities shared by the commands
//!
//! - [`fs`] - atomic writes of archives and reports
//! - [`progress`] - spinners for long-running operations

pub mod fs;
pub mod progress;

pub use fs::{atomic_write, ensure_dir, write_json_report};
pub use progress::{ProgressBar, disable_progress, spinner_with_message};
