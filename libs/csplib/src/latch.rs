// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Count-down latch used by `Par` and `Handle` for termination.

use parking_lot::{Condvar, Mutex};

pub struct CountDownLatch {
    count: Mutex<i64>,
    zeroed: Condvar,
}

impl CountDownLatch {
    /// A latch that opens after `count` count-downs (already open if
    /// `count <= 0`).
    pub fn new(count: i64) -> Self {
        Self { count: Mutex::new(count), zeroed: Condvar::new() }
    }

    pub fn count_down(&self) {
        let mut count = self.count.lock();
        *count -= 1;
        if *count <= 0 {
            self.zeroed.notify_all();
        }
    }

    /// Block until the latch opens.
    pub fn wait(&self) {
        let mut count = self.count.lock();
        while *count > 0 {
            self.zeroed.wait(&mut count);
        }
    }

    pub fn count(&self) -> i64 {
        *self.count.lock()
    }
}
