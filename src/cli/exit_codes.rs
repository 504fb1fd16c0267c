//! Process exit codes
//!
//! Exit codes of the install step and the server pass through unchanged;
//! these cover failures of appstart itself.

pub const SUCCESS: i32 = 0;
pub const UNEXPECTED_FAILURE: i32 = 1;
/// Bad config file or flags
pub const CONFIG_ERROR: i32 = 2;
/// Same code a shell uses for "command not found"
pub const BINARY_MISSING: i32 = 127;
/// 128 + SIGINT
pub const INTERRUPTED: i32 = 130;
