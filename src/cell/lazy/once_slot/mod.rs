//! `OnceSlot` — the instance slot with double-checked initialization.
//!
//! The value lives in-place (`MaybeUninit`), next to a one-byte state and the
//! slot's own exclusive lock:
//!
//! 1. Fast path: an `Acquire` load of the state. If it reads `Set`, the value
//!    written before the matching `Release` store is visible and is returned
//!    without touching the lock.
//! 2. Slow path: take the lock, re-check the state, run the recipe, write the
//!    value, then publish it with a `Release` store of `Set`.
//!
//! A plain store in step 2 would let a fast-path reader on a weakly ordered
//! machine see `Set` before the value's fields.

mod state;

use core::convert::Infallible;
use core::fmt;
use core::mem::{self, MaybeUninit};
use std::panic::{RefUnwindSafe, UnwindSafe};

use crate::concurrency::primitives::{AtomicU8, Ordering, UnsafeCell};
use crate::concurrency::sync::RawMutex;

pub use state::State;

/// A thread-safe cell written at most once.
///
/// Unlike a [`LazySingleton`](crate::LazySingleton), the slot does not own its
/// recipe; each caller passes one to [`get_or_init`](Self::get_or_init) and the
/// first to finish wins. Callers that lose the race block on the slot's lock
/// until the winner has published, then return the winner's value.
pub struct OnceSlot<T> {
    value: UnsafeCell<MaybeUninit<T>>,
    state: AtomicU8,
    lock: RawMutex,
}

/// Restores `Unset` unless disarmed with `mem::forget`.
///
/// Declared after the lock guard, so it runs while the lock is still held.
struct Rollback<'a> {
    state: &'a AtomicU8,
}

impl Drop for Rollback<'_> {
    fn drop(&mut self) {
        self.state.store(State::UNSET, Ordering::Release);
    }
}

impl<T> OnceSlot<T> {
    /// Creates an empty slot.
    #[cfg(not(loom))]
    #[inline]
    pub const fn new() -> Self {
        Self {
            value: UnsafeCell::new(MaybeUninit::uninit()),
            state: AtomicU8::new(State::UNSET),
            lock: RawMutex::new(),
        }
    }

    /// Creates an empty slot.
    #[cfg(loom)]
    pub fn new() -> Self {
        Self {
            value: UnsafeCell::new(MaybeUninit::uninit()),
            state: AtomicU8::new(State::UNSET),
            lock: RawMutex::new(),
        }
    }

    /// Returns `true` once a value has been published.
    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.state.load(Ordering::Acquire) == State::SET
    }

    /// Returns the current lifecycle state.
    ///
    /// Anything other than [`State::Set`] may be stale by the time it is read.
    #[inline]
    pub fn state(&self) -> State {
        State::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Returns the value if it has been published. Never constructs.
    #[inline]
    pub fn get(&self) -> Option<&T> {
        if self.is_initialized() {
            // SAFETY: `Set` was observed with `Acquire`.
            Some(unsafe { self.get_unchecked() })
        } else {
            None
        }
    }

    /// Returns a mutable reference to the value, if set.
    ///
    /// `&mut self` guarantees no other caller can observe the change.
    #[inline]
    pub fn get_mut(&mut self) -> Option<&mut T> {
        if self.state.load(Ordering::Relaxed) != State::SET {
            return None;
        }
        // SAFETY: exclusive access, and the value is initialized.
        Some(self.value.with_mut(|slot| unsafe { (*slot).assume_init_mut() }))
    }

    /// Returns the value, constructing it with `f` if the slot is unset.
    ///
    /// If `f` panics, the panic propagates to this caller and the slot goes back
    /// to [`State::Unset`], so a later call runs a recipe again.
    ///
    /// Calling back into the same slot from inside `f` deadlocks.
    #[inline]
    pub fn get_or_init<F>(&self, f: F) -> &T
    where
        F: FnOnce() -> T,
    {
        match self.get_or_try_init(|| Ok::<T, Infallible>(f())) {
            Ok(value) => value,
            Err(never) => match never {},
        }
    }

    /// Returns the value, constructing it with the fallible `f` if the slot is
    /// unset.
    ///
    /// An `Err` from `f` is handed back to this caller untouched and leaves the
    /// slot unset; nothing is retried on the caller's behalf.
    ///
    /// # Errors
    ///
    /// Returns the error from `f` if this call ran it and it failed. Callers
    /// that find the slot already set, or set by another thread while they
    /// waited, always get `Ok`.
    #[inline]
    pub fn get_or_try_init<F, E>(&self, f: F) -> Result<&T, E>
    where
        F: FnOnce() -> Result<T, E>,
    {
        if let Some(value) = self.get() {
            return Ok(value);
        }
        self.initialize(f)?;
        debug_assert!(self.is_initialized());
        // SAFETY: `initialize` only returns `Ok` once `Set` has been published.
        Ok(unsafe { self.get_unchecked() })
    }

    #[cold]
    fn initialize<F, E>(&self, f: F) -> Result<(), E>
    where
        F: FnOnce() -> Result<T, E>,
    {
        if self.state.load(Ordering::Relaxed) == State::CONSTRUCTING {
            crate::event!(
                trace,
                ty = core::any::type_name::<T>(),
                "waiting for construction in progress"
            );
        }
        let _lock = self.lock.lock();

        // Second check: the previous lock holder may have published already.
        if self.state.load(Ordering::Acquire) == State::SET {
            return Ok(());
        }

        self.state.store(State::CONSTRUCTING, Ordering::Relaxed);
        let rollback = Rollback { state: &self.state };
        crate::event!(
            debug,
            ty = core::any::type_name::<T>(),
            "constructing instance"
        );

        let value = match f() {
            Ok(value) => value,
            Err(err) => {
                crate::event!(
                    debug,
                    ty = core::any::type_name::<T>(),
                    "construction failed; slot left unset"
                );
                return Err(err);
            }
        };

        // SAFETY: the lock is held and the state is not `Set`, so no reader
        // dereferences the slot until the store below publishes it.
        self.value.with_mut(|slot| unsafe {
            (*slot).write(value);
        });
        mem::forget(rollback);
        self.state.store(State::SET, Ordering::Release);

        crate::event!(debug, ty = core::any::type_name::<T>(), "instance published");
        Ok(())
    }

    /// Consumes the slot, returning the value if one was published.
    pub fn into_inner(self) -> Option<T> {
        if self.state.load(Ordering::Relaxed) != State::SET {
            return None;
        }
        // Drop must not run the destructor of the value we move out.
        self.state.store(State::UNSET, Ordering::Relaxed);
        // SAFETY: owned and initialized; marked unset above.
        Some(self.value.with_mut(|slot| unsafe { (*slot).assume_init_read() }))
    }

    /// # Safety
    /// The caller must have observed `Set` with `Acquire` ordering.
    #[inline]
    unsafe fn get_unchecked(&self) -> &T {
        self.value.with(|slot| unsafe { (*slot).assume_init_ref() })
    }
}

impl<T> Default for OnceSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> From<T> for OnceSlot<T> {
    /// Creates a slot that is already set, the eager form of the same contract.
    fn from(value: T) -> Self {
        let slot = Self::new();
        // SAFETY: not yet shared; the state is still `Unset`.
        slot.value.with_mut(|ptr| unsafe {
            (*ptr).write(value);
        });
        slot.state.store(State::SET, Ordering::Release);
        slot
    }
}

impl<T: fmt::Debug> fmt::Debug for OnceSlot<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut d = f.debug_tuple("OnceSlot");
        match self.get() {
            Some(value) => d.field(value),
            None => d.field(&format_args!("<{:?}>", self.state())),
        };
        d.finish()
    }
}

impl<T> Drop for OnceSlot<T> {
    fn drop(&mut self) {
        if self.state.load(Ordering::Acquire) == State::SET {
            // SAFETY: exclusive access in drop; the value is initialized.
            self.value.with_mut(|slot| unsafe { (*slot).assume_init_drop() });
        }
    }
}

// SAFETY: the value is written once under the lock and published with
// `Release`; readers only dereference after an `Acquire` load of `Set`. A value
// built on one thread may be dropped on another, hence `T: Send` for `Sync`.
unsafe impl<T: Send + Sync> Sync for OnceSlot<T> {}
unsafe impl<T: Send> Send for OnceSlot<T> {}

impl<T: RefUnwindSafe + UnwindSafe> RefUnwindSafe for OnceSlot<T> {}
impl<T: UnwindSafe> UnwindSafe for OnceSlot<T> {}
