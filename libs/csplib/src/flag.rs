// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! One-shot flag
//!
//! A single-waiter latch: once released it stays released. `release` is not
//! idempotent (a second call is a usage error), and only one thread may be
//! parked on the flag at a time.

use crate::atomic::AtomicCell;
use crate::naming::NameGenerator;
use crate::parking;
use crate::semaphore::Semaphore;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, Thread};
use std::time::{Duration, Instant};

static FLAG_NAMES: NameGenerator = NameGenerator::new("Flag");

pub struct Flag {
    name: String,
    available: AtomicBool,
    waiter: AtomicCell<Option<Thread>>,
    is_cancelled: AtomicBool,
}

impl Flag {
    pub fn new() -> Self {
        Self::with_name(None)
    }

    pub fn with_name(name: Option<&str>) -> Self {
        Self {
            name: FLAG_NAMES.generate(name),
            available: AtomicBool::new(false),
            waiter: AtomicCell::new(None),
            is_cancelled: AtomicBool::new(false),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    /// Seat the current thread in the single waiter slot. Panics if another
    /// thread is already seated.
    fn seat(&self, me: &Thread) {
        let prior = self.waiter.get_and_update(|w| match w {
            None => Some(me.clone()),
            Some(t) => Some(t.clone()),
        });
        if let Some(other) = prior {
            panic!(
                "[{}] cannot wait on an already-awaited flag (waiter: {})",
                self.name,
                parking::thread_identity(&other)
            );
        }
    }

    fn unseat(&self, me: &Thread) {
        self.waiter.get_and_update(|w| match w {
            Some(t) if t.id() == me.id() => None,
            other => other.clone(),
        });
    }
}

impl Semaphore for Flag {
    fn acquire(&self) {
        if self.available() {
            return;
        }
        let me = thread::current();
        self.seat(&me);
        while !self.available() {
            parking::park();
        }
        self.unseat(&me);
    }

    /// Not idempotent: panics on the second call.
    fn release(&self) {
        if self
            .available
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            if let Some(waiter) = self.waiter.get() {
                parking::unpark(&waiter);
            }
        } else {
            panic!("[{}] flag already released", self.name);
        }
    }

    fn try_acquire_for(&self, timeout: Duration) -> bool {
        if self.available() {
            return true;
        }
        let me = thread::current();
        self.seat(&me);
        let deadline = Instant::now() + timeout;
        let outcome = loop {
            if self.available() {
                break true;
            }
            let left = deadline.saturating_duration_since(Instant::now());
            if left.is_zero() {
                break false;
            }
            parking::park_for(left);
        };
        self.unseat(&me);
        outcome
    }

    /// Set available and wake the waiter; `cancelled()` reports true
    /// thereafter.
    fn cancel(&self) {
        self.is_cancelled.store(true, Ordering::SeqCst);
        let stalled = self.waiter.get_and_set(None);
        self.available.store(true, Ordering::SeqCst);
        if let Some(waiter) = stalled {
            parking::unpark(&waiter);
        }
    }

    fn cancelled(&self) -> bool {
        self.is_cancelled.load(Ordering::SeqCst)
    }

    fn waiting(&self) -> Vec<Thread> {
        self.waiter.get().into_iter().collect()
    }

    fn remaining(&self) -> usize {
        usize::from(self.available())
    }
}

impl Default for Flag {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for Flag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let av = if self.available() { "available" } else { "unavailable" };
        let cancelled = if self.cancelled() { " [cancelled]" } else { "" };
        let waiter = match self.waiter.get() {
            None => "?".to_string(),
            Some(t) => parking::thread_identity(&t),
        };
        write!(f, "FLAG {}: {av}{cancelled} [waiter: {waiter}]", self.name)
    }
}
