// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Boolean and counting semaphores
//!
//! Both follow the same shape: a spin of CAS attempts on the fast path, then
//! a FIFO waiter queue of parked threads. `release` wakes the queue head;
//! a woken waiter re-checks that it is the head before claiming, so FIFO
//! order is honoured. `cancel` is terminal: it drains every current waiter,
//! and later acquires return immediately.
//!
//! State machine: Available <-> Held -> Cancelled (terminal).

use crate::atomic::AtomicCell;
use crate::naming::NameGenerator;
use crate::parking;
use crate::queue::WaiterQueue;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::thread::{self, Thread};
use std::time::{Duration, Instant};

/// Common surface of the blocking semaphores (and of `Flag`).
pub trait Semaphore {
    /// Block until a permit is held. Returns immediately after `cancel`.
    fn acquire(&self);

    /// Give a permit back and wake the queue head, if any.
    fn release(&self);

    /// Like `acquire` with a deadline; on timeout, unwind and return false.
    fn try_acquire_for(&self, timeout: Duration) -> bool;

    /// Terminal: unblock every current waiter. Further acquires return
    /// immediately.
    fn cancel(&self);

    fn cancelled(&self) -> bool;

    /// Snapshot of the threads currently seated in the waiter queue.
    fn waiting(&self) -> Vec<Thread>;

    /// Permits currently available.
    fn remaining(&self) -> usize {
        0
    }

    fn down(&self) {
        self.acquire();
    }

    fn up(&self) {
        self.release();
    }
}

static BOOLEAN_NAMES: NameGenerator = NameGenerator::new("BooleanSemaphore");
static COUNTING_NAMES: NameGenerator = NameGenerator::new("CountingSemaphore");

const DEFAULT_SPIN: u32 = 5;

/// Mutex-style semaphore: an owner slot (empty means available) plus a FIFO
/// waiter queue. At most one thread observes itself as owner at any instant.
pub struct BooleanSemaphore {
    name: String,
    spin: u32,
    owner: AtomicCell<Option<Thread>>,
    waiting: WaiterQueue<Thread>,
    is_cancelled: AtomicBool,
}

impl BooleanSemaphore {
    pub fn new(available: bool) -> Self {
        Self::with_name(available, None)
    }

    pub fn with_name(available: bool, name: Option<&str>) -> Self {
        Self::with_spin(available, name, DEFAULT_SPIN)
    }

    pub fn with_spin(available: bool, name: Option<&str>, spin: u32) -> Self {
        let owner = if available { None } else { Some(thread::current()) };
        Self {
            name: BOOLEAN_NAMES.generate(name),
            spin,
            owner: AtomicCell::new(owner),
            waiting: WaiterQueue::new(),
            is_cancelled: AtomicBool::new(false),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn try_claim(&self, me: &Thread) -> bool {
        self.owner.get_and_update(|o| match o {
            None => Some(me.clone()),
            Some(t) => Some(t.clone()),
        })
        .is_none()
    }

    fn acquire_fast(&self, me: &Thread) -> bool {
        for _ in 0..self.spin {
            if self.try_claim(me) {
                return true;
            }
        }
        false
    }

    fn head_is(&self, me: &Thread) -> bool {
        self.waiting.peek().is_some_and(|t| t.id() == me.id())
    }

    fn release_raw(&self) {
        self.owner.set(None);
        if let Some(waiter) = self.waiting.peek() {
            parking::unpark(&waiter);
        }
    }
}

impl Semaphore for BooleanSemaphore {
    fn acquire(&self) {
        if self.cancelled() {
            return;
        }
        let me = thread::current();
        if self.acquire_fast(&me) {
            return;
        }
        self.waiting.enqueue(me.clone());
        while !(self.head_is(&me) && self.try_claim(&me)) {
            if self.cancelled() {
                break;
            }
            parking::park();
        }
        self.waiting.remove_where(|t| t.id() == me.id());
    }

    fn release(&self) {
        assert!(
            !self.cancelled(),
            "[{}] release after cancel is a usage error",
            self.name
        );
        self.release_raw();
    }

    fn try_acquire_for(&self, timeout: Duration) -> bool {
        if self.cancelled() {
            return false;
        }
        let me = thread::current();
        if self.acquire_fast(&me) {
            return true;
        }
        let deadline = Instant::now() + timeout;
        self.waiting.enqueue_first(me.clone());
        let mut outcome = false;
        loop {
            if self.head_is(&me) && self.try_claim(&me) {
                outcome = true;
                break;
            }
            let left = deadline.saturating_duration_since(Instant::now());
            if left.is_zero() || self.cancelled() {
                break;
            }
            parking::park_for(left);
        }
        self.waiting.remove_where(|t| t.id() == me.id());
        if !outcome {
            // Someone behind us may have become the head while we were
            // seated; hand the wakeup on.
            if let Some(waiter) = self.waiting.peek() {
                parking::unpark(&waiter);
            }
        }
        outcome
    }

    fn cancel(&self) {
        self.is_cancelled.store(true, Ordering::SeqCst);
        for _ in 0..self.waiting.length() {
            self.release_raw();
        }
        // Waiters re-check the cancelled flag on wake; make sure every
        // seated thread gets a wake, not just the head of the moment.
        self.waiting.for_each(|t| parking::unpark(t));
    }

    fn cancelled(&self) -> bool {
        self.is_cancelled.load(Ordering::SeqCst)
    }

    fn waiting(&self) -> Vec<Thread> {
        self.waiting.elements()
    }

    fn remaining(&self) -> usize {
        usize::from(self.owner.get().is_none())
    }
}

impl std::fmt::Display for BooleanSemaphore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let owner = match self.owner.get() {
            None => "available".to_string(),
            Some(t) => parking::thread_identity(&t),
        };
        let cancelled = if self.cancelled() { " [cancelled]" } else { "" };
        let ids = self
            .waiting
            .elements()
            .iter()
            .map(parking::thread_identity)
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "{}: {owner}{cancelled} [{} {ids}]", self.name, self.waiting.length())
    }
}

/// Counting semaphore: `n` permits plus a FIFO waiter queue. The decrement
/// clamps at zero, and an acquire that leaves permits behind re-signals the
/// head so wakeups cascade.
pub struct CountingSemaphore {
    name: String,
    spin: u32,
    count: AtomicI64,
    waiting: WaiterQueue<Thread>,
    is_cancelled: AtomicBool,
}

impl CountingSemaphore {
    pub fn new(available: usize) -> Self {
        Self::with_name(available, None)
    }

    pub fn with_name(available: usize, name: Option<&str>) -> Self {
        Self {
            name: COUNTING_NAMES.generate(name),
            spin: DEFAULT_SPIN,
            count: AtomicI64::new(available as i64),
            waiting: WaiterQueue::new(),
            is_cancelled: AtomicBool::new(false),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Take one permit iff any remain; the count never goes below zero.
    fn atomic_dec(&self) -> bool {
        self.count
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |x| {
                if x > 0 { Some(x - 1) } else { None }
            })
            .is_ok()
    }

    fn acquire_fast(&self) -> bool {
        for _ in 0..self.spin {
            if self.atomic_dec() {
                return true;
            }
        }
        false
    }

    fn head_is(&self, me: &Thread) -> bool {
        self.waiting.peek().is_some_and(|t| t.id() == me.id())
    }

    fn signal(&self) {
        if let Some(waiter) = self.waiting.peek() {
            parking::unpark(&waiter);
        }
    }
}

impl Semaphore for CountingSemaphore {
    fn acquire(&self) {
        if self.cancelled() {
            return;
        }
        if self.acquire_fast() {
            return;
        }
        let me = thread::current();
        self.waiting.enqueue(me.clone());
        while !(self.head_is(&me) && self.atomic_dec()) {
            if self.cancelled() {
                break;
            }
            parking::park();
        }
        self.waiting.remove_where(|t| t.id() == me.id());
        if self.count.load(Ordering::SeqCst) > 0 {
            self.signal();
        }
    }

    fn release(&self) {
        if self.count.fetch_add(1, Ordering::SeqCst) + 1 > 0 {
            self.signal();
        }
    }

    fn try_acquire_for(&self, timeout: Duration) -> bool {
        if self.cancelled() {
            return false;
        }
        if self.acquire_fast() {
            return true;
        }
        let me = thread::current();
        let deadline = Instant::now() + timeout;
        self.waiting.enqueue_first(me.clone());
        let mut outcome = false;
        while !self.cancelled() {
            if self.head_is(&me) && self.atomic_dec() {
                outcome = true;
                break;
            }
            let left = deadline.saturating_duration_since(Instant::now());
            if left.is_zero() {
                break;
            }
            parking::park_for(left);
        }
        self.waiting.remove_where(|t| t.id() == me.id());
        if self.count.load(Ordering::SeqCst) > 0 {
            self.signal();
        }
        outcome
    }

    fn cancel(&self) {
        self.is_cancelled.store(true, Ordering::SeqCst);
        for _ in 0..self.waiting.length() {
            self.release();
        }
        // Late parkers re-check the cancelled flag, but wake anyone seated
        // between the drain above and the flag store.
        self.waiting.for_each(|t| parking::unpark(t));
    }

    fn cancelled(&self) -> bool {
        self.is_cancelled.load(Ordering::SeqCst)
    }

    fn waiting(&self) -> Vec<Thread> {
        self.waiting.elements()
    }

    fn remaining(&self) -> usize {
        self.count.load(Ordering::SeqCst).max(0) as usize
    }
}

impl std::fmt::Display for CountingSemaphore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let cancelled = if self.cancelled() { " [cancelled]" } else { "" };
        let ids = self
            .waiting
            .elements()
            .iter()
            .map(parking::thread_identity)
            .collect::<Vec<_>>()
            .join(", ");
        write!(
            f,
            "{}: {} available{cancelled} [{} {ids}]",
            self.name,
            self.count.load(Ordering::SeqCst),
            self.waiting.length()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_boolean_mutual_exclusion() {
        let sem = Arc::new(BooleanSemaphore::new(true));
        let held = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let mut handles = Vec::new();
        for _ in 0..8 {
            let sem = Arc::clone(&sem);
            let held = Arc::clone(&held);
            let peak = Arc::clone(&peak);
            handles.push(std::thread::spawn(move || {
                for _ in 0..500 {
                    sem.acquire();
                    let now = held.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    held.fetch_sub(1, Ordering::SeqCst);
                    sem.release();
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(peak.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_boolean_try_acquire_timeout() {
        let sem = BooleanSemaphore::new(true);
        sem.acquire();
        assert!(!sem.try_acquire_for(Duration::from_millis(30)));
        sem.release();
        assert!(sem.try_acquire_for(Duration::from_millis(30)));
    }

    #[test]
    fn test_boolean_cancel_unblocks() {
        let sem = Arc::new(BooleanSemaphore::new(false));
        let mut handles = Vec::new();
        for _ in 0..3 {
            let sem = Arc::clone(&sem);
            handles.push(std::thread::spawn(move || sem.acquire()));
        }
        std::thread::sleep(Duration::from_millis(50));
        sem.cancel();
        for h in handles {
            h.join().unwrap();
        }
        assert!(sem.cancelled());
        // further acquires return immediately
        sem.acquire();
    }

    #[test]
    #[should_panic(expected = "release after cancel")]
    fn test_boolean_release_after_cancel_panics() {
        let sem = BooleanSemaphore::new(true);
        sem.cancel();
        sem.release();
    }

    #[test]
    fn test_counting_never_below_zero() {
        let sem = CountingSemaphore::new(0);
        assert!(!sem.atomic_dec());
        assert_eq!(sem.remaining(), 0);
        sem.release();
        assert!(sem.atomic_dec());
        assert!(!sem.atomic_dec());
        assert_eq!(sem.remaining(), 0);
    }

    #[test]
    fn test_counting_bounds_holders() {
        const PERMITS: usize = 3;
        let sem = Arc::new(CountingSemaphore::new(PERMITS));
        let held = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let mut handles = Vec::new();
        for _ in 0..10 {
            let sem = Arc::clone(&sem);
            let held = Arc::clone(&held);
            let peak = Arc::clone(&peak);
            handles.push(std::thread::spawn(move || {
                for _ in 0..200 {
                    sem.acquire();
                    let now = held.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    held.fetch_sub(1, Ordering::SeqCst);
                    sem.release();
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }
        assert!(peak.load(Ordering::SeqCst) <= PERMITS);
        assert_eq!(sem.remaining(), PERMITS);
    }

    #[test]
    fn test_counting_cancel_unblocks_waiters() {
        let sem = Arc::new(CountingSemaphore::new(0));
        let mut handles = Vec::new();
        for _ in 0..4 {
            let sem = Arc::clone(&sem);
            handles.push(std::thread::spawn(move || sem.acquire()));
        }
        std::thread::sleep(Duration::from_millis(50));
        sem.cancel();
        for h in handles {
            h.join().unwrap();
        }
    }
}
