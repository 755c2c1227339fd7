//! Cross-platform utilities and helpers
//!
//! # Modules
//!
//! - [`platform`] - Detached process launch and executable permissions
//! - [`progress`] - Progress bars and spinners for the command-line surface

pub mod platform;
pub mod progress;

pub use platform::{exe_name, is_windows, make_executable, spawn_detached, spawn_detached_with_env};
pub use progress::{ProgressBar, ProgressObserver, ProgressStyle};
