//! Concurrency building blocks for the lazy slot.
//!
//! `primitives` hides the loom switch; `sync` holds the exclusive lock that
//! serializes construction.

pub(crate) mod primitives;
pub mod sync;
