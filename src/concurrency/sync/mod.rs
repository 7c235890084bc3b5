//! Blocking primitives backing the slow path of [`OnceSlot`](crate::OnceSlot).
//!
//! Under `cfg(loom)` the parking mutex is replaced by loom's modelled mutex;
//! the intrusive wait queue parks real OS threads, which loom cannot explore.

#[cfg(not(loom))]
mod raw_mutex;
#[cfg(not(loom))]
mod wait_queue;

#[cfg(not(loom))]
pub use raw_mutex::{RawMutex, RawMutexGuard};

#[cfg(loom)]
pub(crate) use loom_mutex::RawMutex;

#[cfg(loom)]
mod loom_mutex {
    use loom::sync::{Mutex, MutexGuard};
    use std::sync::PoisonError;

    pub(crate) struct RawMutex {
        inner: Mutex<()>,
    }

    impl RawMutex {
        pub(crate) fn new() -> Self {
            Self { inner: Mutex::new(()) }
        }

        pub(crate) fn lock(&self) -> MutexGuard<'_, ()> {
            self.inner.lock().unwrap_or_else(PoisonError::into_inner)
        }
    }
}
