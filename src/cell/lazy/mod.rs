//! Lazy single-instance construction.

pub mod lazy_singleton;
pub mod once_slot;
pub mod try_lazy_singleton;

#[cfg(feature = "serde")]
mod serde_impls;

pub use lazy_singleton::LazySingleton;
pub use once_slot::{OnceSlot, State};
pub use try_lazy_singleton::TryLazySingleton;
