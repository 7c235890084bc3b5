//! `TryLazySingleton` — a lazy single instance whose recipe can fail.

use core::fmt;
use core::marker::PhantomData;

use super::once_slot::{OnceSlot, State};

/// Like [`LazySingleton`](crate::LazySingleton), for a recipe returning
/// `Result<T, E>`.
///
/// A failed construction hands the error to the caller that triggered it and
/// leaves the slot unset, so a later [`get`](Self::get) runs the recipe again.
///
/// ```rust
/// use lone::TryLazySingleton;
///
/// let port = TryLazySingleton::new(|| "8080".parse::<u16>());
/// assert_eq!(port.get(), Ok(&8080));
/// ```
pub struct TryLazySingleton<T, E, F = fn() -> Result<T, E>> {
    slot: OnceSlot<T>,
    init: F,
    _error: PhantomData<fn() -> E>,
}

impl<T, E, F> TryLazySingleton<T, E, F>
where
    F: Fn() -> Result<T, E>,
{
    /// Creates a new `TryLazySingleton` with the given recipe.
    #[cfg(not(loom))]
    #[inline]
    pub const fn new(init: F) -> Self {
        Self {
            slot: OnceSlot::new(),
            init,
            _error: PhantomData,
        }
    }

    /// Creates a new `TryLazySingleton` with the given recipe.
    #[cfg(loom)]
    pub fn new(init: F) -> Self {
        Self {
            slot: OnceSlot::new(),
            init,
            _error: PhantomData,
        }
    }
}

impl<T, E, F> TryLazySingleton<T, E, F> {
    /// Returns the instance if it has already been built.
    #[inline]
    pub fn get_if_initialized(&self) -> Option<&T> {
        self.slot.get()
    }

    /// Returns `true` if the instance has been built.
    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.slot.is_initialized()
    }

    /// Returns the lifecycle state of the instance slot.
    #[inline]
    pub fn state(&self) -> State {
        self.slot.state()
    }

    /// Consumes the singleton, returning the instance if it was built.
    pub fn into_inner(self) -> Option<T> {
        self.slot.into_inner()
    }
}

impl<T, E, F> TryLazySingleton<T, E, F>
where
    F: Fn() -> Result<T, E>,
{
    /// Returns the instance, running the recipe if it has not succeeded yet.
    ///
    /// # Errors
    ///
    /// Returns the recipe's error if this call ran the recipe and it failed.
    #[inline]
    pub fn get(&self) -> Result<&T, E> {
        self.slot.get_or_try_init(&self.init)
    }
}

impl<T: fmt::Debug, E, F> fmt::Debug for TryLazySingleton<T, E, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TryLazySingleton")
            .field("slot", &self.slot)
            .finish_non_exhaustive()
    }
}
