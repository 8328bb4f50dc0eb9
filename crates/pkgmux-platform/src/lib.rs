mod commands;
pub mod fs;
mod paths;

pub use commands::{HideWindow, tool_command};
pub use paths::{AppPaths, AppPathsError};
