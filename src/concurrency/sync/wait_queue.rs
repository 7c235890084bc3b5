use crossbeam_utils::Backoff;
use std::cell::{Cell, UnsafeCell};
use std::marker::PhantomPinned;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, Thread};

/// A node in the intrusive wait queue.
/// Must stay on the stack of the waiting thread until [`WaitNode::wait`] returns.
pub(crate) struct WaitNode {
    thread: Thread,
    next: Cell<Option<NonNull<WaitNode>>>,
    notified: AtomicBool,
    _pin: PhantomPinned,
}

impl WaitNode {
    pub(crate) fn new() -> Self {
        Self {
            thread: thread::current(),
            next: Cell::new(None),
            notified: AtomicBool::new(false),
            _pin: PhantomPinned,
        }
    }

    /// Parks until [`WaitNode::notify`] has been called for this node.
    ///
    /// Spurious unparks loop back into `park`, so the node is never left
    /// dangling in the queue.
    pub(crate) fn wait(&self) {
        while !self.notified.load(Ordering::Acquire) {
            thread::park();
        }
    }

    /// Wakes the thread waiting on `node`.
    ///
    /// # Safety
    /// `node` must have been popped from the queue and not yet notified. The
    /// waiter may free the node as soon as the flag is set, so the thread
    /// handle is cloned first and the node is not touched afterwards.
    pub(crate) unsafe fn notify(node: NonNull<WaitNode>) {
        let node = node.as_ptr();
        let thread = (*node).thread.clone();
        (*node).notified.store(true, Ordering::Release);
        thread.unpark();
    }
}

/// FIFO list of parked [`WaitNode`]s, linked through their `next` cells.
///
/// `head`, `tail` and every node's `next` are only read or written while the
/// `lock` flag is held; [`lock`](Self::lock) spins on it with a
/// [`Backoff`]. A node leaves the list in [`pop_locked`](Self::pop_locked)
/// before its `notified` flag is set, so a woken waiter never sees its node
/// still linked.
pub(crate) struct WaitQueue {
    head: UnsafeCell<Option<NonNull<WaitNode>>>,
    tail: UnsafeCell<Option<NonNull<WaitNode>>>,
    lock: AtomicBool,
}

impl WaitQueue {
    pub(crate) const fn new() -> Self {
        Self {
            head: UnsafeCell::new(None),
            tail: UnsafeCell::new(None),
            lock: AtomicBool::new(false),
        }
    }

    pub(crate) fn lock(&self) {
        let backoff = Backoff::new();
        while self.lock.swap(true, Ordering::Acquire) {
            backoff.spin();
        }
    }

    pub(crate) fn unlock(&self) {
        self.lock.store(false, Ordering::Release);
    }

    /// Adds a node to the back of the queue (caller must hold lock).
    ///
    /// # Safety
    /// Caller must hold the lock. Node must be valid and pinned until notified.
    pub(crate) unsafe fn push_locked(&self, node: NonNull<WaitNode>) {
        let tail_ptr = self.tail.get();
        let head_ptr = self.head.get();

        (*node.as_ptr()).next.set(None);

        if let Some(t) = *tail_ptr {
            (*t.as_ptr()).next.set(Some(node));
        } else {
            *head_ptr = Some(node);
        }
        *tail_ptr = Some(node);
    }

    /// Removes and returns the head node (caller must hold lock).
    ///
    /// # Safety
    /// Caller must hold the lock.
    pub(crate) unsafe fn pop_locked(&self) -> Option<NonNull<WaitNode>> {
        let head_ptr = self.head.get();
        let tail_ptr = self.tail.get();

        let ret = *head_ptr;
        if let Some(h) = ret {
            *head_ptr = (*h.as_ptr()).next.get();
            if (*head_ptr).is_none() {
                *tail_ptr = None;
            }
        }
        ret
    }

    /// Checks if the queue is empty.
    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.lock();
        // SAFETY: lock held.
        let empty = unsafe { (*self.head.get()).is_none() };
        self.unlock();
        empty
    }
}

// SAFETY: the list is only touched while `lock` is held.
unsafe impl Sync for WaitQueue {}
unsafe impl Send for WaitQueue {}
