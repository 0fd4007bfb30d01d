// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Lossy-link statistics: with a 64% loss probability, the delivered share
//! of a long unit stream lands close to 36%, whichever write variant the
//! producer alternates through.

use csplib::prelude::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

const N: u64 = 100_000;
const PROB_LOSS: f64 = 0.64;

#[test]
fn delivered_share_matches_loss_probability() {
    let c: FaultyOneOne<u64> = FaultyOneOne::new(PROB_LOSS);
    let producer = {
        let c = c.clone();
        proc("lossy-producer", move || {
            for i in 0..N {
                if i % 2 == 0 {
                    c.write(1)?;
                } else {
                    c.write_before(Duration::from_micros(100), 1)?;
                }
            }
            c.close_out();
            Ok(())
        })
    };
    let total = Arc::new(AtomicU64::new(0));
    let consumer = {
        let c = c.clone();
        let total = Arc::clone(&total);
        proc("summing-consumer", move || {
            repeat(|| {
                let v = c.read()?;
                total.fetch_add(v, Ordering::Relaxed);
                Ok(())
            })
        })
    };

    (producer | consumer).run().unwrap();

    let sum = total.load(Ordering::Relaxed);
    let low = (0.35 * N as f64) as u64;
    let high = (0.37 * N as f64) as u64;
    assert!(
        (low..=high).contains(&sum),
        "delivered {sum} of {N}, expected within [{low}, {high}]"
    );
}
