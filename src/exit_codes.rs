//! Exit code constants for the mediatask CLI.
//!
//! - 0: Success
//! - 1: User error (bad args, unreadable input)
//! - 2: Invalid pipeline configuration
//! - 3: Task action failure
//! - 4: Export delivery failure
//! - 5: Condition evaluated to false (`eval --exit-status` only)

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// User error: bad arguments, unreadable or unparseable input files.
pub const USER_ERROR: i32 = 1;

/// Configuration failed to parse or validate.
pub const CONFIG_INVALID: i32 = 2;

/// A task action (model, post-processor, sub-workflow) failed.
pub const ACTION_FAILURE: i32 = 3;

/// An export could not be planned or delivered.
pub const EXPORT_FAILURE: i32 = 4;

/// A condition evaluated to false and the caller asked for a status code.
pub const CONDITION_FALSE: i32 = 5;
