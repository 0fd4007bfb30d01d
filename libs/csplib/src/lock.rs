// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Simple (non-re-entrant) lock over a boolean semaphore
//!
//! The guard form releases on every exit path, including panics; `cancel`
//! is inherited from the semaphore and turns the lock into a no-op, which
//! is how demo shutdowns break cycles of blocked lockers.

use crate::naming::NameGenerator;
use crate::semaphore::{BooleanSemaphore, Semaphore};
use std::thread::Thread;
use std::time::Duration;

static LOCK_NAMES: NameGenerator = NameGenerator::new("SimpleLock");

const LOCK_SPIN: u32 = 200;

pub struct SimpleLock {
    sem: BooleanSemaphore,
}

impl SimpleLock {
    pub fn new() -> Self {
        Self::with_name(None)
    }

    pub fn with_name(name: Option<&str>) -> Self {
        let name = LOCK_NAMES.generate(name);
        Self {
            sem: BooleanSemaphore::with_spin(true, Some(&name), LOCK_SPIN),
        }
    }

    pub fn name(&self) -> &str {
        self.sem.name()
    }

    pub fn lock(&self) {
        self.sem.acquire();
    }

    /// No-op once the lock is cancelled, so unwinding lockers never trip
    /// over a drained semaphore.
    pub fn unlock(&self) {
        if !self.sem.cancelled() {
            self.sem.release();
        }
    }

    pub fn try_lock_for(&self, timeout: Duration) -> bool {
        self.sem.try_acquire_for(timeout)
    }

    /// Scoped acquisition: the lock is held until the guard drops.
    pub fn guard(&self) -> SimpleLockGuard<'_> {
        self.lock();
        SimpleLockGuard { lock: self }
    }

    /// Run `body` with the lock held; released on all paths.
    pub fn with_lock<R>(&self, body: impl FnOnce() -> R) -> R {
        let _guard = self.guard();
        body()
    }

    pub fn cancel(&self) {
        self.sem.cancel();
    }

    pub fn cancelled(&self) -> bool {
        self.sem.cancelled()
    }

    pub fn waiting(&self) -> Vec<Thread> {
        self.sem.waiting()
    }
}

impl Default for SimpleLock {
    fn default() -> Self {
        Self::new()
    }
}

pub struct SimpleLockGuard<'a> {
    lock: &'a SimpleLock,
}

impl Drop for SimpleLockGuard<'_> {
    fn drop(&mut self) {
        if !self.lock.cancelled() {
            self.lock.unlock();
        }
    }
}
