// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Monitor: a waiter-tracked re-entrant lock
//!
//! Wraps a `parking_lot::ReentrantMutex` and records the threads blocked on
//! it, so the debugger can show who is queueing and `waiting_for` can answer
//! condition-style questions without a separate condition variable.

use crate::parking;
use crate::registry::{self, Debuggable, StateKey};
use parking_lot::{Mutex, ReentrantMutex};
use std::sync::Arc;
use std::thread::{self, Thread};
use std::time::Duration;

pub struct Monitor {
    name: String,
    lock: ReentrantMutex<()>,
    waiters: Mutex<Vec<Thread>>,
    key: Mutex<StateKey>,
}

impl Monitor {
    /// Monitors register themselves for debugging, so construction hands
    /// back an `Arc`.
    pub fn new(name: impl Into<String>) -> Arc<Self> {
        let monitor = Arc::new(Self {
            name: name.into(),
            lock: ReentrantMutex::new(()),
            waiters: Mutex::new(Vec::new()),
            key: Mutex::new(0),
        });
        let weak: std::sync::Weak<dyn Debuggable> = Arc::downgrade(&(Arc::clone(&monitor) as Arc<dyn Debuggable>));
        *monitor.key.lock() = registry::register(weak);
        monitor
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn note_waiting(&self) -> WaiterNote<'_> {
        self.waiters.lock().push(thread::current());
        WaiterNote { monitor: self }
    }

    fn forget_waiting(&self) {
        let me = thread::current().id();
        let mut waiters = self.waiters.lock();
        if let Some(pos) = waiters.iter().position(|t| t.id() == me) {
            waiters.remove(pos);
        }
    }

    /// Run `body` with the monitor held. Re-entrant: a thread may take its
    /// own monitor again.
    pub fn with_lock<R>(&self, body: impl FnOnce() -> R) -> R {
        let _note = self.note_waiting();
        let _guard = self.lock.lock();
        drop(_note);
        body()
    }

    /// Run `body` if the monitor can be taken within `timeout`, `otherwise`
    /// if not.
    pub fn try_lock_for<R>(
        &self,
        timeout: Duration,
        body: impl FnOnce() -> R,
        otherwise: impl FnOnce() -> R,
    ) -> R {
        let _note = self.note_waiting();
        match self.lock.try_lock_for(timeout) {
            Some(_guard) => {
                drop(_note);
                body()
            }
            None => {
                drop(_note);
                otherwise()
            }
        }
    }

    /// True iff a recorded waiter matches `pred` while the monitor is
    /// available; false whenever the monitor is held.
    pub fn waiting_for(&self, pred: impl Fn(&Thread) -> bool) -> bool {
        match self.lock.try_lock() {
            Some(_guard) => self.waiters.lock().iter().any(pred),
            None => false,
        }
    }

    pub fn get_waiting_threads(&self) -> Vec<Thread> {
        self.waiters.lock().clone()
    }
}

impl Drop for Monitor {
    fn drop(&mut self) {
        registry::unregister(*self.key.lock());
    }
}

impl Debuggable for Monitor {
    fn debug_name(&self) -> String {
        self.name.clone()
    }

    fn kind(&self) -> &'static str {
        "monitor"
    }

    fn show_state(&self, out: &mut dyn std::fmt::Write) -> std::fmt::Result {
        let waiters = self
            .waiters
            .lock()
            .iter()
            .map(parking::thread_identity)
            .collect::<Vec<_>>()
            .join(", ");
        write!(out, "Monitor({}) awaited by [{waiters}]", self.name)
    }

    fn get_waiting(&self) -> Vec<Thread> {
        self.get_waiting_threads()
    }

    fn has_state(&self) -> bool {
        !self.waiters.lock().is_empty()
    }
}

struct WaiterNote<'a> {
    monitor: &'a Monitor,
}

impl Drop for WaiterNote<'_> {
    fn drop(&mut self) {
        self.monitor.forget_waiting();
    }
}
