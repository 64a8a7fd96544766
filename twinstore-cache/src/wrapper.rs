use std::sync::atomic::{AtomicBool, AtomicI64};
use std::sync::Mutex;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;

/// A single cached driver handle plus its reference-counted lifecycle.
pub struct Wrapper<H> {
    pub handle: H,
    /// The full SQL text this handle was prepared for, so a lookup can
    /// reject a hit whose key collides with a different statement (spec
    /// §3/§4.4: `sql_hash` is an identity key, not just the cache key).
    pub sql_text: String,
    pub ref_count: AtomicI64,
    pub closed: AtomicBool,
    /// Serializes a lookup's closed-check + ref-count increment against the
    /// idle-close timer's CAS-and-close, so a lookup can never hand out a
    /// handle that the evictor has just closed (spec §3: `reuse_lock`).
    pub reuse_lock: Mutex<()>,
    expires_at: Mutex<Instant>,
    cleanup: Mutex<Option<JoinHandle<()>>>,
    close_fn: Box<dyn Fn(H) + Send + Sync>,
    close_guard: AtomicBool,
}

impl<H: Clone> Wrapper<H> {
    pub fn new<C>(handle: H, sql_text: String, close_fn: C) -> Self
    where
        C: Fn(H) + Send + Sync + 'static,
    {
        Wrapper {
            handle,
            sql_text,
            ref_count: AtomicI64::new(1),
            closed: AtomicBool::new(false),
            reuse_lock: Mutex::new(()),
            expires_at: Mutex::new(Instant::now() + Duration::from_secs(30)),
            cleanup: Mutex::new(None),
            close_fn: Box::new(close_fn),
            close_guard: AtomicBool::new(false),
        }
    }

    pub fn expires_at(&self) -> Instant {
        *self.expires_at.lock().expect("expires_at mutex poisoned")
    }

    pub fn set_expires_at(&self, at: Instant) {
        *self.expires_at.lock().expect("expires_at mutex poisoned") = at;
    }

    /// Aborts any previously armed idle-close timer: called whenever a new
    /// reference is taken, since the entry is no longer idle.
    pub fn cancel_cleanup(&self) {
        if let Some(handle) = self.cleanup.lock().expect("cleanup mutex poisoned").take() {
            handle.abort();
        }
    }

    pub fn arm_cleanup(&self, handle: JoinHandle<()>) {
        let mut slot = self.cleanup.lock().expect("cleanup mutex poisoned");
        if let Some(previous) = slot.take() {
            previous.abort();
        }
        *slot = Some(handle);
    }

    /// Runs the driver-provided close exactly once, using an atomic guard
    /// rather than relying solely on the caller's own single-shot discipline.
    pub fn close_once(&self) {
        if self
            .close_guard
            .compare_exchange(false, true, std::sync::atomic::Ordering::AcqRel, std::sync::atomic::Ordering::Acquire)
            .is_ok()
        {
            (self.close_fn)(self.handle.clone());
        }
    }
}

/// A short-lived marker cached in place of a wrapper when `prepare` fails,
/// so a tight retry loop doesn't repeatedly hammer the driver.
pub struct PoisonMarker {
    expires_at: Instant,
}

impl PoisonMarker {
    pub fn new(ttl: Duration) -> Self {
        PoisonMarker {
            expires_at: Instant::now() + ttl,
        }
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}
