// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Repeated n-way barriers
//!
//! `Barrier(n)` stalls sync calls until n have been made; rounds are fully
//! serialised by a pair of complementary boolean semaphores (`enter` open,
//! `wait` shut, or vice versa) so a new round begins only after every waiter
//! of the previous round has been released. `n == 1` returns immediately, so
//! multi-worker structures can be exercised with a single worker.
//!
//! `CombiningBarrier(n, e, op)` additionally folds a contribution from each
//! participant: a round's calls contribute x1..xn and every caller gets back
//! `e op x1 op .. op xn`. `op` should be associative, or the result depends
//! on arrival order.

use crate::semaphore::{BooleanSemaphore, Semaphore};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

pub struct Barrier {
    n: usize,
    name: String,
    waiting: AtomicUsize,
    wait: BooleanSemaphore,
    enter: BooleanSemaphore,
}

impl Barrier {
    pub fn new(n: usize) -> Self {
        Self::with_name(n, "")
    }

    pub fn with_name(n: usize, name: &str) -> Self {
        assert!(n >= 1, "a barrier needs at least one participant");
        Self {
            n,
            name: name.to_string(),
            waiting: AtomicUsize::new(0),
            wait: BooleanSemaphore::with_name(false, Some(&format!("{name}.wait"))),
            enter: BooleanSemaphore::with_name(true, Some(&format!("{name}.enter"))),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Stall until all n participants have called `sync`.
    pub fn sync(&self) {
        if self.n == 1 {
            return;
        }
        self.enter.down();
        if self.waiting.load(Ordering::SeqCst) == self.n - 1 {
            // the last process arrives: start the release cascade
            self.wait.up();
        } else {
            self.waiting.fetch_add(1, Ordering::SeqCst);
            self.enter.up();
            self.wait.down();
            if self.waiting.fetch_sub(1, Ordering::SeqCst) == 1 {
                // the last waiting process awoke: a new round may start
                self.enter.up();
            } else {
                // pass the baton to another waiter
                self.wait.up();
            }
        }
    }
}

pub struct CombiningBarrier<T, F> {
    n: usize,
    name: String,
    e: T,
    op: F,
    waiting: AtomicUsize,
    wait: BooleanSemaphore,
    enter: BooleanSemaphore,
    result: Mutex<T>,
}

impl<T, F> CombiningBarrier<T, F>
where
    T: Clone,
    F: Fn(T, T) -> T,
{
    pub fn new(n: usize, e: T, op: F) -> Self {
        Self::with_name(n, e, op, "")
    }

    pub fn with_name(n: usize, e: T, op: F, name: &str) -> Self {
        assert!(n > 1, "a combining barrier needs at least two participants");
        Self {
            n,
            name: name.to_string(),
            result: Mutex::new(e.clone()),
            e,
            op,
            waiting: AtomicUsize::new(0),
            wait: BooleanSemaphore::with_name(false, Some(&format!("{name}.wait"))),
            enter: BooleanSemaphore::with_name(true, Some(&format!("{name}.enter"))),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Contribute `t`, stall until the round completes, and return the
    /// round's folded value. The accumulator resets to `e` only once the
    /// round has fully drained.
    pub fn sync(&self, t: T) -> T {
        self.enter.down();
        {
            let mut result = self.result.lock();
            let folded = (self.op)(result.clone(), t);
            *result = folded;
        }
        if self.waiting.load(Ordering::SeqCst) == self.n - 1 {
            // the last process arrives: snapshot, then release everyone
            let out = self.result.lock().clone();
            self.wait.up();
            out
        } else {
            self.waiting.fetch_add(1, Ordering::SeqCst);
            self.enter.up();
            self.wait.down();
            let last_out = self.waiting.fetch_sub(1, Ordering::SeqCst) == 1;
            let out = self.result.lock().clone();
            if last_out {
                *self.result.lock() = self.e.clone();
                self.enter.up();
            } else {
                self.wait.up();
            }
            out
        }
    }
}

/// A combining barrier equivalent to `any()`.
pub type OrBarrier = CombiningBarrier<bool, fn(bool, bool) -> bool>;

/// A combining barrier equivalent to `all()`.
pub type AndBarrier = CombiningBarrier<bool, fn(bool, bool) -> bool>;

pub fn or_barrier(n: usize) -> OrBarrier {
    CombiningBarrier::with_name(n, false, |a, b| a || b, "OrBarrier")
}

pub fn and_barrier(n: usize) -> AndBarrier {
    CombiningBarrier::with_name(n, true, |a, b| a && b, "AndBarrier")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    fn launch(
        n: usize,
        before: &Arc<AtomicUsize>,
        after: &Arc<AtomicUsize>,
        body: impl Fn() + Send + Sync + 'static,
    ) {
        let body = Arc::new(body);
        for _ in 0..n {
            let before = Arc::clone(before);
            let after = Arc::clone(after);
            let body = Arc::clone(&body);
            std::thread::spawn(move || {
                before.fetch_add(1, Ordering::SeqCst);
                body();
                after.fetch_add(1, Ordering::SeqCst);
            });
        }
        std::thread::sleep(Duration::from_millis(200));
    }

    #[test]
    fn test_degenerate_barrier_returns_immediately() {
        Barrier::new(1).sync();
    }

    #[test]
    fn test_barrier_stalls_until_full() {
        let barrier = Arc::new(Barrier::new(3));
        let before = Arc::new(AtomicUsize::new(0));
        let after = Arc::new(AtomicUsize::new(0));

        let b = Arc::clone(&barrier);
        launch(2, &before, &after, move || b.sync());
        assert_eq!(
            (before.load(Ordering::SeqCst), after.load(Ordering::SeqCst)),
            (2, 0)
        );

        let b = Arc::clone(&barrier);
        launch(2, &before, &after, move || b.sync());
        assert_eq!(
            (before.load(Ordering::SeqCst), after.load(Ordering::SeqCst)),
            (4, 3)
        );

        let b = Arc::clone(&barrier);
        launch(2, &before, &after, move || b.sync());
        assert_eq!(
            (before.load(Ordering::SeqCst), after.load(Ordering::SeqCst)),
            (6, 6)
        );
    }

    #[test]
    fn test_combining_barrier_folds_round() {
        let barrier = Arc::new(CombiningBarrier::new(3, 0i64, |a, b| a + b));
        let mut handles = Vec::new();
        for i in 1..=3i64 {
            let barrier = Arc::clone(&barrier);
            handles.push(std::thread::spawn(move || barrier.sync(i)));
        }
        for h in handles {
            assert_eq!(h.join().unwrap(), 1 + 2 + 3);
        }
        // the accumulator reset: a second round folds afresh
        let mut handles = Vec::new();
        for i in 4..=6i64 {
            let barrier = Arc::clone(&barrier);
            handles.push(std::thread::spawn(move || barrier.sync(i)));
        }
        for h in handles {
            assert_eq!(h.join().unwrap(), 4 + 5 + 6);
        }
    }

    #[test]
    fn test_or_and_barriers() {
        let or = Arc::new(or_barrier(2));
        let o = Arc::clone(&or);
        let h = std::thread::spawn(move || o.sync(false));
        assert!(or.sync(true));
        assert!(h.join().unwrap());

        let and = Arc::new(and_barrier(2));
        let a = Arc::clone(&and);
        let h = std::thread::spawn(move || a.sync(false));
        assert!(!and.sync(true));
        assert!(!h.join().unwrap());
    }
}
