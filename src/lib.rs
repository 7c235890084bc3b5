//! # `lone` - Lazily Constructed Single Instances
//!
//! Produce exactly one instance of a value, on first request, safely under
//! concurrent access, without taking a lock once the instance exists.
//!
//! ## Guarantees
//!
//! ### Identity
//! - Every call to [`LazySingleton::get`] on the same owner returns a reference
//!   to the same instance.
//!
//! ### Single construction
//! - However many threads race on the first call, the recipe completes
//!   successfully at most once. Losers block on the slot's own lock and then
//!   read the winner's instance.
//!
//! ### Publication
//! - The instance is published with a `Release` store and read after an
//!   `Acquire` load, so no thread ever observes a partially built value.
//!
//! ### Failure
//! - A recipe that panics (or, for [`TryLazySingleton`], returns `Err`) hands
//!   the failure to the caller that ran it and leaves the slot unset. The next
//!   call tries again.
//!
//! ## Architecture
//!
//! 1. **[`OnceSlot<T>`]**: the instance slot. In-place storage, a one-byte
//!    state (`Unset`, `Constructing`, `Set`) and a [`RawMutex`] taken only on
//!    the slow path (double-checked locking).
//! 2. **[`LazySingleton<T, F>`]** / **[`TryLazySingleton<T, E, F>`]**: a slot
//!    plus the parameterless recipe that fills it.
//! 3. **[`singleton!`]**: a process-wide `fn() -> &'static T` accessor backed
//!    by a private `static`.
//!
//! A singleton is a plain value: tests can build a fresh one per case, and
//! code that wants an explicit owner can hold one in a struct and pass
//! references around instead of reaching for a global.
//!
//! ## Example
//!
//! ```rust
//! use lone::LazySingleton;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::thread;
//!
//! static BUILDS: AtomicUsize = AtomicUsize::new(0);
//! static REGISTRY: LazySingleton<Vec<&'static str>> = LazySingleton::new(|| {
//!     BUILDS.fetch_add(1, Ordering::SeqCst);
//!     vec!["alpha", "beta"]
//! });
//!
//! thread::scope(|s| {
//!     for _ in 0..8 {
//!         s.spawn(|| assert_eq!(REGISTRY.len(), 2));
//!     }
//! });
//! assert_eq!(BUILDS.load(Ordering::SeqCst), 1);
//! ```
//!
//! ## Features
//!
//! - `tracing`: emit `tracing` events when construction starts, fails or
//!   publishes.
//! - `serde`: `Serialize` for the lazy types (serializes the instance).

#![warn(missing_docs, clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

mod macros;

pub mod cell;
pub mod concurrency;

pub(crate) use macros::event;

pub use cell::{LazySingleton, OnceSlot, State, TryLazySingleton};
#[cfg(not(loom))]
pub use concurrency::sync::{RawMutex, RawMutexGuard};

// Compile-time assertions for memory layout
#[cfg(not(loom))]
const _: () = {
    use core::mem;

    // The state is a single byte.
    assert!(mem::size_of::<State>() == 1);

    // The lock is a state byte, two queue pointers and a spin flag.
    assert!(mem::size_of::<RawMutex>() <= mem::size_of::<usize>() * 4);

    // A slot adds only the state byte and the lock to the value itself.
    assert!(
        mem::size_of::<OnceSlot<u64>>()
            <= mem::size_of::<u64>() + mem::size_of::<RawMutex>() + mem::size_of::<usize>()
    );

    // A singleton with a function-pointer recipe is the slot plus one pointer.
    assert!(
        mem::size_of::<LazySingleton<u64>>()
            <= mem::size_of::<OnceSlot<u64>>() + mem::size_of::<fn() -> u64>()
    );
};
