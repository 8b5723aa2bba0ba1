//! Process-wide cleanup registry.
//!
//! Every resource that must not outlive the run (scratch workspaces, an
//! enlarged swap file) registers an action here. Actions run exactly once,
//! on whichever path comes first: the owning guard going out of scope, or
//! [`run_all`] being invoked from the signal handler installed in `main`.

use lazy_static::lazy_static;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::ui::prelude::*;

type Action = Box<dyn FnOnce() + Send>;

struct Entry {
    id: u64,
    label: String,
    action: Action,
}

lazy_static! {
    static ref REGISTRY: Mutex<Vec<Entry>> = Mutex::new(Vec::new());
}

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Register a cleanup action. The returned guard runs the action when
/// dropped; call [`CleanupGuard::disarm`] first if the resource should be
/// kept (e.g. a source tree that installed successfully).
pub fn register(label: impl Into<String>, action: impl FnOnce() + Send + 'static) -> CleanupGuard {
    let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    REGISTRY.lock().expect("cleanup registry poisoned").push(Entry {
        id,
        label: label.into(),
        action: Box::new(action),
    });
    CleanupGuard { id }
}

/// Run every still-registered action. Called from the signal handler and as
/// the last step of a fatal exit; safe to call more than once.
pub fn run_all() {
    let entries: Vec<Entry> = {
        let mut reg = REGISTRY.lock().expect("cleanup registry poisoned");
        reg.drain(..).collect()
    };
    for entry in entries {
        emit(
            Level::Debug,
            "cleanup.run",
            &format!("running cleanup: {}", entry.label),
            None,
        );
        (entry.action)();
    }
}

/// Number of pending actions. Used by tests.
pub fn pending() -> usize {
    REGISTRY.lock().expect("cleanup registry poisoned").len()
}

#[must_use = "dropping the guard runs the cleanup action immediately"]
pub struct CleanupGuard {
    id: u64,
}

impl CleanupGuard {
    fn take(&self) -> Option<Entry> {
        let mut reg = REGISTRY.lock().expect("cleanup registry poisoned");
        reg.iter()
            .position(|e| e.id == self.id)
            .map(|idx| reg.remove(idx))
    }

    /// Deregister without running: the resource is intentionally kept.
    pub fn disarm(self) {
        let _ = self.take();
        std::mem::forget(self);
    }

    /// Run the action now instead of waiting for scope exit.
    pub fn run_now(self) {
        if let Some(entry) = self.take() {
            (entry.action)();
        }
        std::mem::forget(self);
    }
}

impl Drop for CleanupGuard {
    fn drop(&mut self) {
        if let Some(entry) = self.take() {
            (entry.action)();
        }
    }
}
