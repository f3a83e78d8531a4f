pub mod common;
pub mod completions;
pub mod hook;
pub mod project;
pub mod pull;
pub mod time_entry;
pub mod work_package;
