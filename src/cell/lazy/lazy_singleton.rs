//! `LazySingleton` — one instance, built on first request by a stored recipe.

use core::fmt;
use core::ops::Deref;

use super::once_slot::{OnceSlot, State};

/// Owns exactly one instance of `T`, constructed by `init` on the first call to
/// [`get`](Self::get) and shared by every call after it.
///
/// The recipe is `Fn` rather than `FnOnce`: if it panics, the slot returns to
/// [`State::Unset`] and the next caller runs it again.
///
/// A `LazySingleton` is an ordinary value. Put it in a `static` (or use
/// [`singleton!`](crate::singleton)) for a process-wide instance, or own it in a
/// struct and hand out references to give the instance an explicit owner.
///
/// ```rust
/// use lone::LazySingleton;
///
/// static GREETING: LazySingleton<String> = LazySingleton::new(|| "hello".to_owned());
///
/// assert!(!GREETING.is_initialized());
/// assert!(std::ptr::eq(GREETING.get(), GREETING.get()));
/// assert_eq!(GREETING.len(), 5);
/// ```
pub struct LazySingleton<T, F = fn() -> T> {
    slot: OnceSlot<T>,
    init: F,
}

impl<T, F> LazySingleton<T, F>
where
    F: Fn() -> T,
{
    /// Creates a new `LazySingleton` with the given recipe. Nothing is built yet.
    #[cfg(not(loom))]
    #[inline]
    pub const fn new(init: F) -> Self {
        Self {
            slot: OnceSlot::new(),
            init,
        }
    }

    /// Creates a new `LazySingleton` with the given recipe. Nothing is built yet.
    #[cfg(loom)]
    pub fn new(init: F) -> Self {
        Self {
            slot: OnceSlot::new(),
            init,
        }
    }
}

impl<T, F> LazySingleton<T, F> {
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

impl<T, F> LazySingleton<T, F>
where
    F: Fn() -> T,
{
    /// Returns the instance, building it first if nobody has yet.
    ///
    /// Concurrent first callers block until the single construction finishes.
    #[inline]
    pub fn get(&self) -> &T {
        self.slot.get_or_init(&self.init)
    }
}

impl<T, F> Deref for LazySingleton<T, F>
where
    F: Fn() -> T,
{
    type Target = T;

    #[inline]
    fn deref(&self) -> &T {
        self.get()
    }
}

impl<T: Default> Default for LazySingleton<T> {
    fn default() -> Self {
        Self::new(T::default)
    }
}

impl<T: fmt::Debug, F> fmt::Debug for LazySingleton<T, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazySingleton")
            .field("slot", &self.slot)
            .finish_non_exhaustive()
    }
}
