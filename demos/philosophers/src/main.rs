// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Dining philosophers over cancellable locks.
//!
//! Our philosophers use chopsticks so as to not confuse their forks with
//! `fork()`. Each philosopher grabs two chopsticks in a random order, eats,
//! and puts them back; after a fixed mealtime every chopstick is cancelled,
//! which unsticks anyone mid-grab and lets the table wind down.

use csplib::prelude::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

const N: usize = 20;
const RUN_FOR: Duration = Duration::from_secs(1);

fn run_table() -> Vec<usize> {
    let chopsticks: Arc<Vec<SimpleLock>> = Arc::new(
        (0..N)
            .map(|i| SimpleLock::with_name(Some(&format!("chopstick-{i}"))))
            .collect(),
    );
    let kill = Arc::new(AtomicBool::new(false));
    let times_ate: Arc<Vec<AtomicUsize>> = Arc::new((0..N).map(|_| AtomicUsize::new(0)).collect());

    let handles: Vec<Handle> = (0..N)
        .map(|i| {
            let chopsticks = Arc::clone(&chopsticks);
            let kill = Arc::clone(&kill);
            let times_ate = Arc::clone(&times_ate);
            proc(format!("philosopher-{i}"), move || {
                repeat(|| {
                    if kill.load(Ordering::SeqCst) {
                        return Err(stop());
                    }
                    let (mut l, mut r) = (i, (i + 1) % N);
                    if fastrand::bool() {
                        std::mem::swap(&mut l, &mut r);
                    }
                    chopsticks[l].lock();
                    chopsticks[r].lock();
                    times_ate[i].fetch_add(1, Ordering::SeqCst);
                    chopsticks[r].unlock();
                    chopsticks[l].unlock();
                    Ok(())
                })
            })
            .fork()
        })
        .collect();

    std::thread::sleep(RUN_FOR);

    kill.store(true, Ordering::SeqCst);
    for chopstick in chopsticks.iter() {
        chopstick.cancel();
    }
    for handle in handles {
        let _ = handle.join();
    }

    times_ate.iter().map(|n| n.load(Ordering::SeqCst)).collect()
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".parse().unwrap()),
        )
        .init();

    let bill = run_table();
    println!("Here is the spaghetti bill from the philosophers: {bill:?}");
    println!("Descartes looks like he is still hungry");
}
