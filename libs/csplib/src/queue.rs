// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! FIFO waiter queue
//!
//! Safe under concurrent producers and consumers; no ordering promise beyond
//! FIFO between a single enqueue/dequeue pair. The semaphores seat their
//! blocked threads here; `enqueue_first` re-seats a timed try-acquire caller
//! at the head, and `remove_where` lets a timed-out waiter unseat itself from
//! mid-queue.

use parking_lot::Mutex;
use std::collections::VecDeque;

pub struct WaiterQueue<T> {
    inner: Mutex<VecDeque<T>>,
}

impl<T> WaiterQueue<T> {
    pub fn new() -> Self {
        Self { inner: Mutex::new(VecDeque::new()) }
    }

    pub fn enqueue(&self, value: T) {
        self.inner.lock().push_back(value);
    }

    /// Push to the head of the queue.
    pub fn enqueue_first(&self, value: T) {
        self.inner.lock().push_front(value);
    }

    pub fn dequeue(&self) -> Option<T> {
        self.inner.lock().pop_front()
    }

    /// Drop the head element, returning it if the queue was non-empty.
    pub fn remove_first(&self) -> Option<T> {
        self.inner.lock().pop_front()
    }

    /// Remove the first element matching `pred`. Returns whether one was
    /// removed.
    pub fn remove_where(&self, pred: impl Fn(&T) -> bool) -> bool {
        let mut guard = self.inner.lock();
        if let Some(pos) = guard.iter().position(|x| pred(x)) {
            guard.remove(pos);
            true
        } else {
            false
        }
    }

    pub fn length(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    pub fn clear(&self) {
        self.inner.lock().clear();
    }

    pub fn for_each(&self, mut f: impl FnMut(&T)) {
        for x in self.inner.lock().iter() {
            f(x);
        }
    }
}

impl<T: Clone> WaiterQueue<T> {
    /// Head element, if any, without removing it.
    pub fn peek(&self) -> Option<T> {
        self.inner.lock().front().cloned()
    }

    /// Snapshot of the queue contents, head first.
    pub fn elements(&self) -> Vec<T> {
        self.inner.lock().iter().cloned().collect()
    }
}

impl<T> Default for WaiterQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}
