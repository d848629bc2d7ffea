//! Error type for table operations that can be refused.
//!
//! Lookups and deletions of absent keys are not errors; they come back as
//! `None`/`false`. Misuse of iterators is a programming error and panics.

use crate::dict::Handle;

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DictError {
    /// The key is already present. Carries the handle of the existing entry.
    #[error("key already exists in the table")]
    KeyExists(Handle),

    /// A resize was requested while a previous one is still migrating.
    #[error("table is already rehashing")]
    Rehashing,

    /// The requested capacity cannot hold the live entries, or equals the
    /// current capacity.
    #[error("invalid table size {requested} for {used} live entries")]
    InvalidSize { requested: usize, used: usize },

    /// An explicit shrink was requested while resizing is switched off.
    #[error("resizing is disabled")]
    ResizeDisabled,
}
