use super::wait_queue::{WaitNode, WaitQueue};
use crossbeam_utils::Backoff;
use std::fmt;
use std::panic::{RefUnwindSafe, UnwindSafe};
use std::ptr::NonNull;
use std::sync::atomic::{AtomicU8, Ordering};

/// A blocking mutex that guards no data of its own.
///
/// It is the exclusive lock a [`OnceSlot`](crate::OnceSlot) takes on its slow
/// path. Threads spin briefly, then park on a FIFO wait queue. There is no
/// poisoning: a guard dropped during unwinding simply unlocks.
///
/// # States
/// - 0: Unlocked
/// - 1: Locked, no waiters
/// - 2: Locked, waiters may exist (contended)
pub struct RawMutex {
    state: AtomicU8,
    queue: WaitQueue,
}

impl RawMutex {
    const UNLOCKED: u8 = 0;
    const LOCKED: u8 = 1;
    const CONTENDED: u8 = 2;

    /// Creates a new, unlocked mutex.
    pub const fn new() -> Self {
        Self {
            state: AtomicU8::new(Self::UNLOCKED),
            queue: WaitQueue::new(),
        }
    }

    /// Acquires the mutex, blocking the current thread until it is available.
    #[inline]
    pub fn lock(&self) -> RawMutexGuard<'_> {
        if self
            .state
            .compare_exchange(Self::UNLOCKED, Self::LOCKED, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
        {
            return RawMutexGuard { mutex: self };
        }
        self.lock_slow()
    }

    /// Attempts to acquire the mutex without blocking.
    #[inline]
    pub fn try_lock(&self) -> Option<RawMutexGuard<'_>> {
        self.state
            .compare_exchange(Self::UNLOCKED, Self::LOCKED, Ordering::Acquire, Ordering::Relaxed)
            .ok()
            .map(|_| RawMutexGuard { mutex: self })
    }

    /// Returns `true` if some thread currently holds the mutex.
    #[inline]
    pub fn is_locked(&self) -> bool {
        self.state.load(Ordering::Relaxed) != Self::UNLOCKED
    }

    #[cold]
    fn lock_slow(&self) -> RawMutexGuard<'_> {
        let backoff = Backoff::new();
        while !backoff.is_completed() {
            if self.state.load(Ordering::Relaxed) == Self::UNLOCKED
                && self
                    .state
                    .compare_exchange(
                        Self::UNLOCKED,
                        Self::LOCKED,
                        Ordering::Acquire,
                        Ordering::Relaxed,
                    )
                    .is_ok()
            {
                return RawMutexGuard { mutex: self };
            }
            backoff.snooze();
        }

        loop {
            let node = WaitNode::new();

            // SAFETY: the queue lock is held around the swap and the push, so an
            // unlocker that observes CONTENDED also observes our node. The node
            // outlives its stay in the queue because `wait` only returns once
            // the node has been popped and notified.
            unsafe {
                self.queue.lock();

                // Anything acquired from here on is taken as CONTENDED so the
                // matching unlock wakes the next waiter.
                if self.state.swap(Self::CONTENDED, Ordering::Acquire) == Self::UNLOCKED {
                    self.queue.unlock();
                    return RawMutexGuard { mutex: self };
                }

                self.queue.push_locked(NonNull::from(&node));
                self.queue.unlock();
            }

            node.wait();
        }
    }

    fn unlock(&self) {
        if self
            .state
            .compare_exchange(Self::LOCKED, Self::UNLOCKED, Ordering::Release, Ordering::Relaxed)
            .is_ok()
        {
            return;
        }
        self.unlock_slow();
    }

    #[cold]
    fn unlock_slow(&self) {
        self.queue.lock();
        self.state.store(Self::UNLOCKED, Ordering::Release);

        // SAFETY: queue lock held; a popped node is still parked in `wait`.
        unsafe {
            if let Some(node) = self.queue.pop_locked() {
                WaitNode::notify(node);
            }
        }
        self.queue.unlock();
    }

    #[cfg(test)]
    fn has_waiters(&self) -> bool {
        !self.queue.is_empty()
    }
}

// The mutex guards no data, so a panic while it is held cannot leave anything
// inconsistent behind it.
impl RefUnwindSafe for RawMutex {}
impl UnwindSafe for RawMutex {}

impl Default for RawMutex {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RawMutex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawMutex")
            .field("locked", &self.is_locked())
            .finish_non_exhaustive()
    }
}

/// RAII guard for [`RawMutex`]; unlocks on drop.
#[must_use = "if unused the mutex will immediately unlock"]
pub struct RawMutexGuard<'a> {
    mutex: &'a RawMutex,
}

impl Drop for RawMutexGuard<'_> {
    fn drop(&mut self) {
        self.mutex.unlock();
    }
}

impl fmt::Debug for RawMutexGuard<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawMutexGuard").finish_non_exhaustive()
    }
}
