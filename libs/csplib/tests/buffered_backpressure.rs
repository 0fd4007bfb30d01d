// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Back-pressure through a capacity-one buffered channel: the first write
//! parks nobody, the second blocks until a reader drains a slot.

use csplib::prelude::*;
use std::time::Duration;

#[test]
fn producer_blocks_on_full_buffer() {
    let c = one_one_buf(1);
    let producer = {
        let c = c.clone();
        proc("producer", move || {
            c.write(2)?;
            c.write(3)?;
            Ok(())
        })
        .fork()
    };

    std::thread::sleep(Duration::from_millis(100));
    // the first write buffered; the producer is still alive inside the second
    assert!(!producer.terminated());

    assert_eq!(c.read().unwrap(), 2);
    producer.join().unwrap();
    assert!(producer.terminated());
    assert_eq!(c.read().unwrap(), 3);
}

#[test]
fn capacity_bounds_unread_values() {
    let c = one_one_buf(3);
    let producer = {
        let c = c.clone();
        proc("producer", move || {
            for x in 0..10 {
                c.write(x)?;
            }
            c.close_out();
            Ok(())
        })
        .fork()
    };
    std::thread::sleep(Duration::from_millis(100));
    assert_eq!(c.len(), 3);

    let mut drained = Vec::new();
    loop {
        match c.read() {
            Ok(v) => drained.push(v),
            Err(CspError::Closed(_)) => break,
            Err(e) => panic!("unexpected error: {e}"),
        }
    }
    producer.join().unwrap();
    assert_eq!(drained, (0..10).collect::<Vec<_>>());
}
