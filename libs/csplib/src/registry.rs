// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Live object registry for state dumps
//!
//! Channels, loggers and monitors register themselves on construction and
//! unregister on close. The registry holds weak references only, so
//! registration never keeps an object alive; dead entries are pruned on
//! every snapshot.

use crate::atomic::AtomicCounter;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::{Arc, LazyLock, Weak};
use std::thread::Thread;

/// Registration token. Zero is "never registered".
pub type StateKey = u64;

/// An object the debugger can render.
pub trait Debuggable: Send + Sync {
    fn debug_name(&self) -> String;

    /// Component kind, matched against the `suppress` configuration.
    fn kind(&self) -> &'static str;

    /// One-line state rendering for the debug dump.
    fn show_state(&self, out: &mut dyn std::fmt::Write) -> std::fmt::Result;

    /// Threads currently blocked on this object.
    fn get_waiting(&self) -> Vec<Thread> {
        Vec::new()
    }

    /// Whether there is anything worth showing right now.
    fn has_state(&self) -> bool {
        true
    }
}

static STATE_KEYS: AtomicCounter = AtomicCounter::new();

static REGISTERED: LazyLock<Mutex<BTreeMap<StateKey, Weak<dyn Debuggable>>>> =
    LazyLock::new(|| Mutex::new(BTreeMap::new()));

/// Register `obj` and return its token.
pub fn register(obj: Weak<dyn Debuggable>) -> StateKey {
    let key = STATE_KEYS.next();
    REGISTERED.lock().insert(key, obj);
    key
}

/// Remove the registration for `key`. Idempotent.
pub fn unregister(key: StateKey) {
    if key > 0 {
        REGISTERED.lock().remove(&key);
    }
}

/// Snapshot of every live registered object, in registration order. Entries
/// whose objects have been dropped are pruned as a side effect.
pub fn registered() -> Vec<Arc<dyn Debuggable>> {
    let mut guard = REGISTERED.lock();
    let mut live = Vec::with_capacity(guard.len());
    guard.retain(|_, weak| match weak.upgrade() {
        Some(strong) => {
            live.push(strong);
            true
        }
        None => false,
    });
    live
}
