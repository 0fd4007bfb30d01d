// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Barrier rounds through the process API: three forked processes unblock
//! together, and a fresh set of processes completes the next round the same
//! way. No thread's (k+1)-th sync returns before every k-th sync has.

use csplib::prelude::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

#[test]
fn rounds_are_serialised_across_reforks() {
    let barrier = Arc::new(Barrier::new(3));
    let released = Arc::new(AtomicUsize::new(0));

    let fork_three = || {
        let handles: Vec<Handle> = (0..3)
            .map(|i| {
                let barrier = Arc::clone(&barrier);
                let released = Arc::clone(&released);
                proc(format!("syncer-{i}"), move || {
                    barrier.sync();
                    released.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                })
                .fork()
            })
            .collect();
        handles
    };

    for round in 1..=4 {
        let handles = fork_three();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(released.load(Ordering::SeqCst), 3 * round);
    }
}

#[test]
fn nobody_runs_ahead_of_a_round() {
    const N: usize = 4;
    const ROUNDS: usize = 50;
    let barrier = Arc::new(Barrier::new(N));
    let synced = Arc::new(AtomicUsize::new(0));

    let workers: Vec<Proc> = (0..N)
        .map(|i| {
            let barrier = Arc::clone(&barrier);
            let synced = Arc::clone(&synced);
            proc(format!("worker-{i}"), move || {
                for round in 0..ROUNDS {
                    barrier.sync();
                    let total = synced.fetch_add(1, Ordering::SeqCst) + 1;
                    // after my k-th sync returns, everyone has called sync k
                    // times, and nobody is past round k+1
                    assert!(total > round * N);
                    assert!(total <= (round + 2) * N);
                }
                Ok(())
            })
        })
        .collect();

    par(workers).run().unwrap();
    assert_eq!(synced.load(Ordering::SeqCst), N * ROUNDS);
}

#[test]
fn combining_barrier_folds_each_round_from_identity() {
    const N: usize = 3;
    let barrier = Arc::new(CombiningBarrier::new(N, 0u64, |a, b| a + b));

    for round in 0..5u64 {
        let workers: Vec<Proc> = (0..N as u64)
            .map(|i| {
                let barrier = Arc::clone(&barrier);
                proc(format!("contrib-{i}"), move || {
                    let folded = barrier.sync(round * 10 + i);
                    assert_eq!(folded, (round * 10) * N as u64 + (0 + 1 + 2));
                    Ok(())
                })
            })
            .collect();
        par(workers).run().unwrap();
    }
}
