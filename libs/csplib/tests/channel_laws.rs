// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Channel round-trip laws exercised through the public API: a pipeline of
//! composed processes, the extended-rendezvous identity, and the close
//! state machine.

use csplib::prelude::*;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

#[test]
fn single_producer_consumer_preserves_order() {
    let c = OneOne::new();
    let producer = iter_to_channel(0..100, c.clone());
    let collected = Arc::new(Mutex::new(Vec::new()));
    let consumer = {
        let c = c.clone();
        let collected = Arc::clone(&collected);
        proc("consume", move || {
            repeat(|| {
                let v = c.read()?;
                collected.lock().push(v);
                Ok(())
            })
        })
    };
    (producer | consumer).run().unwrap();
    assert_eq!(*collected.lock(), (0..100).collect::<Vec<_>>());
}

#[test]
fn extended_rendezvous_with_identity_equals_read() {
    let via_read = OneOne::new();
    let via_rendezvous = OneOne::new();
    let writers = {
        let a = via_read.clone();
        let b = via_rendezvous.clone();
        proc("write-both", move || {
            a.write(41)?;
            b.write(41)?;
            Ok(())
        })
    };
    let readers = {
        let a = via_read.clone();
        let b = via_rendezvous.clone();
        proc("read-both", move || {
            let x = a.read()?;
            let y = b.extended_rendezvous(|v| v)?;
            assert_eq!(x, y);
            Ok(())
        })
    };
    (writers | readers).run().unwrap();
}

#[test]
fn pipeline_of_squares_terminates_by_closing() {
    let c1 = OneOne::new();
    let c2 = OneOne::new();
    let source = iter_to_channel(0..500i64, c1.clone());
    let square = {
        let c1 = c1.clone();
        let c2 = c2.clone();
        proc("square", move || {
            attempt(
                || {
                    repeat(|| {
                        let v = c1.read()?;
                        c2.write(v * v)
                    })
                },
                || Ok(()),
            )?;
            c2.close_out();
            Ok(())
        })
    };
    let total = Arc::new(Mutex::new(0i64));
    let sink = {
        let c2 = c2.clone();
        let total = Arc::clone(&total);
        proc("sum", move || {
            repeat(|| {
                let v = c2.read()?;
                *total.lock() += v;
                Ok(())
            })
        })
    };
    (source | square | sink).run().unwrap();
    assert_eq!(*total.lock(), (0..500i64).map(|x| x * x).sum::<i64>());
}

#[test]
fn close_is_final_for_every_operation() {
    let c: OneOne<i32> = OneOne::new();
    c.write_before(Duration::from_millis(10), 1).unwrap();
    c.close();
    c.close();

    assert!(matches!(c.read(), Err(CspError::Closed(_))));
    assert!(matches!(c.write(1), Err(CspError::Closed(_))));
    // timed variants fail with Closed, not with the timeout sentinel
    assert!(matches!(
        c.read_before(Duration::from_millis(5)),
        Err(CspError::Closed(_))
    ));
    assert!(matches!(
        c.write_before(Duration::from_millis(5), 1),
        Err(CspError::Closed(_))
    ));
    assert!(!c.can_input());
    assert!(!c.can_output());
}

#[test]
fn delivered_never_exceeds_written() {
    let c = OneOne::new();
    let producer = iter_to_channel(0..250, c.clone());
    let consumer = {
        let c = c.clone();
        proc("drain", move || {
            repeat(|| c.read().map(|_| ()))
        })
    };
    (producer | consumer).run().unwrap();
    assert!(c.reads() <= c.writes());
    // clean close: every write was delivered
    assert_eq!(c.reads(), 250);
    assert_eq!(c.writes(), 250);
}
