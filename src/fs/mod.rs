//! Filesystem utilities for export delivery.
//!
//! Exports are written with a temp-file-then-rename strategy so a reader of
//! the destination folder never sees a half-copied file.

pub mod atomic;

pub use atomic::{atomic_copy, atomic_write};
