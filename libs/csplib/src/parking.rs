// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Thread parking and the process-wide thread directory
//!
//! The park slot is the per-thread token of `std::thread`: `unpark` is
//! idempotent, unpark-before-park is honoured, and there is exactly one slot
//! per thread identity. Parks may wake spuriously, so every caller loops on
//! its own condition.
//!
//! The directory maps live csplib threads to their identity string
//! `name#DA#id` (`D`/`_` daemon, `A`/`_` alive). The standard library cannot
//! enumerate threads, so executor workers and the main thread register here
//! for exactly their lifetime.

use crate::atomic::AtomicCounter;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::LazyLock;
use std::thread::{self, Thread, ThreadId};
use std::time::{Duration, Instant};

/// Block the current thread until another thread unparks it (or spuriously).
pub fn park() {
    thread::park();
}

/// Park for up to `timeout`. Returns true iff the thread was woken before
/// the timeout elapsed.
pub fn park_for(timeout: Duration) -> bool {
    let start = Instant::now();
    thread::park_timeout(timeout);
    start.elapsed() < timeout
}

/// Idempotent wake of `thread`'s park slot.
pub fn unpark(thread: &Thread) {
    thread.unpark();
}

/// Park-with-timeout in a loop while `!cond()` and time remains. Returns the
/// time left (zero if the timeout elapsed first).
pub fn park_until_elapsed_or(timeout: Duration, cond: impl Fn() -> bool) -> Duration {
    let deadline = Instant::now() + timeout;
    loop {
        let left = deadline.saturating_duration_since(Instant::now());
        if left.is_zero() || cond() {
            return left;
        }
        thread::park_timeout(left);
    }
}

#[derive(Clone)]
pub struct ThreadInfo {
    pub name: String,
    pub daemon: bool,
    pub numeric_id: u64,
    pub thread: Thread,
}

static NUMERIC_IDS: AtomicCounter = AtomicCounter::new();

static DIRECTORY: LazyLock<Mutex<HashMap<ThreadId, ThreadInfo>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

/// Register the current thread in the directory for the lifetime of the
/// returned guard.
pub fn register_current(name: impl Into<String>, daemon: bool) -> DirectoryGuard {
    let current = thread::current();
    let info = ThreadInfo {
        name: name.into(),
        daemon,
        numeric_id: NUMERIC_IDS.next(),
        thread: current.clone(),
    };
    DIRECTORY.lock().insert(current.id(), info);
    DirectoryGuard { id: current.id() }
}

pub struct DirectoryGuard {
    id: ThreadId,
}

impl Drop for DirectoryGuard {
    fn drop(&mut self) {
        DIRECTORY.lock().remove(&self.id);
    }
}

/// Snapshot of every registered live thread, in registration order.
pub fn active_threads() -> Vec<ThreadInfo> {
    let mut threads: Vec<ThreadInfo> = DIRECTORY.lock().values().cloned().collect();
    threads.sort_by_key(|t| t.numeric_id);
    threads
}

/// The `name#DA#id` identity of `thread`. Threads that never registered
/// render with `?` placeholders.
pub fn thread_identity(thread: &Thread) -> String {
    if let Some(info) = DIRECTORY.lock().get(&thread.id()) {
        return identity_of(info);
    }
    let name = thread.name().unwrap_or("?");
    format!("{name}#__#?")
}

pub(crate) fn identity_of(info: &ThreadInfo) -> String {
    let d = if info.daemon { 'D' } else { '_' };
    format!("{}#{}A#{}", info.name, d, info.numeric_id)
}
