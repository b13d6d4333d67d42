//! Process exit codes shared by every mode
//!
//! A supervised command's own exit code is passed through unchanged and is not
//! listed here.

/// Success, is-primary, or a skipped command
pub const EXIT_SUCCESS: i32 = 0;

/// Any failure, including "not primary" and argument errors
pub const EXIT_ERROR: i32 = 1;
