//! Per-path locking for cache fills
//!
//! This module serializes work keyed by a template path so that concurrent
//! renders of the same uncompiled or changed template compile it once. Locks
//! for distinct paths are independent.
//!
//! The lock table grows lazily, one entry per distinct path ever locked, and
//! entries live as long as the table. The key space is bounded by the number
//! of templates, not by request volume.

mod guard;
mod table;

pub use guard::PathLockGuard;
pub use table::LockTable;
