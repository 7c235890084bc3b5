//! Cells holding a single lazily constructed instance.

pub mod lazy;

pub use lazy::{LazySingleton, OnceSlot, State, TryLazySingleton};
