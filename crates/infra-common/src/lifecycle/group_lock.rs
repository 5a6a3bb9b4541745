//! The group lock: a recursive mutex bundled with an atomic reference count
//! and an ordered list of on-destroy handlers.
//!
//! Every long-lived core object (transport, transaction, dialog, TURN
//! session, TURN socket, TURN data connection) embeds one of these instead
//! of relying on `Arc`'s implicit drop glue. The extra structure buys two
//! things `Arc` alone doesn't:
//!
//! - **Ordered teardown.** Destroy handlers run in reverse registration
//!   order once the count reaches zero, so a dialog can unregister itself
//!   from its transaction before the transaction unregisters from the
//!   transport, mirroring the locking order in [`acquire`](GroupLock::acquire).
//! - **Re-entrant destruction during callbacks.** A callback invoked while
//!   the lock is held may itself be the thing that drops the last
//!   reference (the application tears down a dialog from inside the
//!   dialog's own `on_established` callback). [`enter`](GroupLock::enter)
//!   detects this and returns [`EnterError::Destroyed`] instead of
//!   deadlocking or reinitializing torn-down state.
//!
//! Nesting discipline: acquire group locks in the order endpoint →
//! transport → transaction → dialog → TURN socket → TURN data connection.
//! Acquiring in the reverse order is a bug, not merely a style nit — it
//! is how two objects tearing each other down end up deadlocked.

use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

type DestroyHandler = Box<dyn FnOnce() + Send + 'static>;

struct Inner {
    refcount: AtomicI64,
    handlers: Mutex<Vec<DestroyHandler>>,
    /// Set once the refcount has reached zero and handlers have run.
    /// Guarded separately from `handlers` so `is_alive` can be checked
    /// without blocking on a destroy in progress.
    destroyed: std::sync::atomic::AtomicBool,
    guard: Mutex<()>,
}

/// A reference-counted, recursive-lockable handle shared by every
/// long-lived core object.
///
/// Cloning a `GroupLock` increments the reference count (`acquire`); the
/// clone must be balanced with a matching [`release`](GroupLock::release)
/// or the object will never be destroyed. Most callers don't call `release`
/// directly — it happens when the owning object's `Drop` impl runs.
#[derive(Clone)]
pub struct GroupLock {
    inner: Arc<Inner>,
}

/// Returned by [`GroupLock::enter`] when the object was torn down while the
/// caller was re-entering (e.g. an application callback destroyed the
/// dialog it was called on).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Destroyed;

impl fmt::Display for Destroyed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "object destroyed while lock was held")
    }
}

impl std::error::Error for Destroyed {}

impl GroupLock {
    /// Create a new group lock with a reference count of 1.
    pub fn new() -> Self {
        GroupLock {
            inner: Arc::new(Inner {
                refcount: AtomicI64::new(1),
                handlers: Mutex::new(Vec::new()),
                destroyed: std::sync::atomic::AtomicBool::new(false),
                guard: Mutex::new(()),
            }),
        }
    }

    /// Increment the reference count. Pair with [`release`](Self::release).
    pub fn acquire(&self) -> GroupLock {
        self.inner.refcount.fetch_add(1, Ordering::AcqRel);
        GroupLock { inner: self.inner.clone() }
    }

    /// Decrement the reference count. When it reaches zero, destroy
    /// handlers run in reverse registration order, outside of any lock
    /// held by the caller.
    pub fn release(&self) {
        let prev = self.inner.refcount.fetch_sub(1, Ordering::AcqRel);
        debug_assert!(prev > 0, "group lock refcount underflow");
        if prev == 1 {
            self.run_destroy_handlers();
        }
    }

    fn run_destroy_handlers(&self) {
        // Hold the main guard so a concurrent `enter` observes either the
        // pre-destruction state or `destroyed == true`, never a half-run
        // teardown.
        let _guard = self.inner.guard.lock().unwrap();
        if self.inner.destroyed.swap(true, Ordering::AcqRel) {
            return;
        }
        let mut handlers = self.inner.handlers.lock().unwrap();
        while let Some(handler) = handlers.pop() {
            handler();
        }
    }

    /// Register a handler to run (in reverse order relative to other
    /// registrations) when the reference count reaches zero. No-op if the
    /// object has already been destroyed.
    pub fn add_destroy_handler<F>(&self, handler: F)
    where
        F: FnOnce() + Send + 'static,
    {
        if self.inner.destroyed.load(Ordering::Acquire) {
            return;
        }
        self.inner.handlers.lock().unwrap().push(Box::new(handler));
    }

    /// Current reference count. For diagnostics/tests only — the count can
    /// change the instant after this returns.
    pub fn ref_count(&self) -> i64 {
        self.inner.refcount.load(Ordering::Acquire)
    }

    /// True once the object has been destroyed (refcount reached zero and
    /// destroy handlers ran).
    pub fn is_destroyed(&self) -> bool {
        self.inner.destroyed.load(Ordering::Acquire)
    }

    /// Take the recursive lock and run `f`, returning [`Destroyed`] instead
    /// of running `f` if the object was torn down concurrently (e.g. by a
    /// re-entrant callback holding the last reference).
    ///
    /// This is the idiom objects use to bracket application callbacks:
    /// acquire an extra reference, invoke the callback, then `enter` again
    /// to check whether the callback destroyed the object before doing any
    /// further work on it.
    pub fn enter<F, R>(&self, f: F) -> Result<R, Destroyed>
    where
        F: FnOnce() -> R,
    {
        let _guard: MutexGuard<'_, ()> = self.inner.guard.lock().unwrap();
        if self.inner.destroyed.load(Ordering::Acquire) {
            return Err(Destroyed);
        }
        Ok(f())
    }
}

impl Default for GroupLock {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for GroupLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GroupLock")
            .field("ref_count", &self.ref_count())
            .field("destroyed", &self.is_destroyed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn destroy_handlers_run_once_at_zero_refcount() {
        let lock = GroupLock::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let hits2 = hits.clone();
        lock.add_destroy_handler(move || {
            hits2.fetch_add(1, Ordering::SeqCst);
        });

        let extra = lock.acquire();
        assert_eq!(lock.ref_count(), 2);
        lock.release();
        assert_eq!(hits.load(Ordering::SeqCst), 0, "handler must not run early");

        extra.release();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert!(lock.is_destroyed());
    }

    #[test]
    fn destroy_handlers_run_in_reverse_order() {
        let lock = GroupLock::new();
        let order = Arc::new(Mutex::new(Vec::new()));
        for i in 0..3 {
            let order = order.clone();
            lock.add_destroy_handler(move || order.lock().unwrap().push(i));
        }
        lock.release();
        assert_eq!(*order.lock().unwrap(), vec![2, 1, 0]);
    }

    #[test]
    fn enter_detects_destruction_during_callback() {
        let lock = GroupLock::new();
        let lock_clone = lock.clone();
        // Simulate a callback that drops the last external reference
        // before the caller re-enters the lock.
        lock.release();
        let result = lock_clone.enter(|| 42);
        assert_eq!(result, Err(Destroyed));
    }

    #[test]
    fn enter_runs_while_alive() {
        let lock = GroupLock::new();
        assert_eq!(lock.enter(|| 7), Ok(7));
        lock.release();
    }
}
