// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! A counting semaphore guarding a critical section: with five permits the
//! in-section population never exceeds five and, under enough contention,
//! visits every level from one to five.

use csplib::prelude::*;
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

const PERMITS: usize = 5;
const WORKERS: usize = 100;
const ROUNDS: usize = 50;

#[test]
fn permits_bound_the_critical_section() {
    let sem = Arc::new(CountingSemaphore::new(PERMITS));
    let inside = Arc::new(AtomicUsize::new(0));
    let observed = Arc::new(parking_lot::Mutex::new(HashSet::new()));

    let workers: Vec<Proc> = (0..WORKERS)
        .map(|i| {
            let sem = Arc::clone(&sem);
            let inside = Arc::clone(&inside);
            let observed = Arc::clone(&observed);
            proc(format!("worker-{i}"), move || {
                for _ in 0..ROUNDS {
                    sem.acquire();
                    let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                    observed.lock().insert(now);
                    assert!(now <= PERMITS, "{now} holders with {PERMITS} permits");
                    // linger briefly so holders overlap and every level shows up
                    std::thread::yield_now();
                    inside.fetch_sub(1, Ordering::SeqCst);
                    sem.release();
                }
                Ok(())
            })
        })
        .collect();

    par(workers).run().unwrap();

    let observed = observed.lock();
    for level in 1..=PERMITS {
        assert!(observed.contains(&level), "level {level} never observed: {observed:?}");
    }
    assert_eq!(sem.remaining(), PERMITS);
}
