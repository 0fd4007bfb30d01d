// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Shared-channel fan-out/fan-in: five writers and five readers contending
//! on one N2N channel, shut down by a third party while readers are still
//! parked.

use csplib::prelude::*;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

const WRITERS: usize = 5;
const READERS: usize = 5;
const PER_WRITER: usize = 500;

#[test]
fn fan_out_fan_in_with_external_close() {
    let c: N2N<usize> = N2N::new(WRITERS, READERS);
    let per_reader: Vec<Arc<Mutex<Vec<usize>>>> =
        (0..READERS).map(|_| Arc::new(Mutex::new(Vec::new()))).collect();

    let mut procs = Vec::new();
    for i in 0..WRITERS {
        let c = c.clone();
        procs.push(proc(format!("writer-{i}"), move || {
            for j in 0..PER_WRITER {
                c.write(i * 1000 + j)?;
            }
            Ok(())
        }));
    }
    for (i, seen) in per_reader.iter().enumerate() {
        let c = c.clone();
        let seen = Arc::clone(seen);
        procs.push(proc(format!("reader-{i}"), move || {
            repeat(|| {
                let v = c.read()?;
                seen.lock().push(v);
                Ok(())
            })
        }));
    }
    {
        let c = c.clone();
        procs.push(proc("closer", move || {
            std::thread::sleep(Duration::from_secs(1));
            c.close();
            Ok(())
        }));
    }

    par(procs).run().unwrap();

    let counts: Vec<usize> = per_reader.iter().map(|r| r.lock().len()).collect();
    let union: HashSet<usize> = per_reader
        .iter()
        .flat_map(|r| r.lock().clone())
        .collect();

    assert_eq!(union.len(), WRITERS * PER_WRITER);
    assert_eq!(counts.iter().sum::<usize>(), WRITERS * PER_WRITER);
    assert!(counts.iter().all(|&n| n > 0), "a reader was starved: {counts:?}");
    assert!(
        counts.iter().any(|&n| n != PER_WRITER),
        "contended reads split perfectly evenly: {counts:?}"
    );
}
