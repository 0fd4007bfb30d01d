// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Shared synchronous channel
//!
//! Composition, not inheritance: an `N2N` *has* a one-to-one rendezvous core
//! and serialises its shared ports through a pair of FIFO locks, so the
//! core's overtaking assertion can never fire. Closing is by population:
//! `close_out` retires one writer and the channel closes when the last
//! writer (or last reader) is gone.

use crate::channel::one_one::OneOne;
use crate::channel::{Chan, InPort, OutPort, PortState};
use crate::error::Result;
use crate::lock::SimpleLock;
use crate::naming::NameGenerator;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

static N2N_NAMES: NameGenerator = NameGenerator::new("N2N");

pub struct N2N<T> {
    core: Arc<N2NCore<T>>,
}

impl<T> Clone for N2N<T> {
    fn clone(&self) -> Self {
        Self { core: Arc::clone(&self.core) }
    }
}

struct N2NCore<T> {
    name: String,
    inner: OneOne<T>,
    write_lock: SimpleLock,
    read_lock: SimpleLock,
    writers: AtomicI64,
    readers: AtomicI64,
}

impl<T: Send + 'static> N2N<T> {
    pub fn new(writers: usize, readers: usize) -> Self {
        Self::with_name(writers, readers, None)
    }

    pub fn with_name(writers: usize, readers: usize, name: Option<&str>) -> Self {
        let name = N2N_NAMES.generate(name);
        Self {
            core: Arc::new(N2NCore {
                inner: OneOne::with_name(Some(&name)),
                write_lock: SimpleLock::with_name(Some(&format!("{name}.write"))),
                read_lock: SimpleLock::with_name(Some(&format!("{name}.read"))),
                writers: AtomicI64::new(writers as i64),
                readers: AtomicI64::new(readers as i64),
                name,
            }),
        }
    }
}

/// N writers, one reader.
pub fn many_one<T: Send + 'static>(writers: usize) -> N2N<T> {
    N2N::new(writers, 1)
}

/// One writer, N readers.
pub fn one_many<T: Send + 'static>(readers: usize) -> N2N<T> {
    N2N::new(1, readers)
}

/// Any number of writers and readers; port closes never retire the channel
/// by population (counts start unbounded), only `close` does.
pub fn many_many<T: Send + 'static>() -> N2N<T> {
    N2N::new(usize::MAX / 2, usize::MAX / 2)
}

impl<T: Send + 'static> InPort<T> for N2N<T> {
    fn read(&self) -> Result<T> {
        self.core.read_lock.with_lock(|| self.core.inner.read())
    }

    fn read_before(&self, timeout: Duration) -> Result<Option<T>> {
        self.core
            .read_lock
            .with_lock(|| self.core.inner.read_before(timeout))
    }

    fn extended_rendezvous<R>(&self, f: impl FnOnce(T) -> R) -> Result<R> {
        self.core
            .read_lock
            .with_lock(|| self.core.inner.extended_rendezvous(f))
    }

    /// Retire one reader; the channel closes when the last reader is gone.
    fn close_in(&self) {
        if self.core.readers.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.core.inner.close();
        }
    }

    fn can_input(&self) -> bool {
        self.core.inner.can_input()
    }

    fn in_port_state(&self) -> PortState {
        self.core.inner.in_port_state()
    }
}

impl<T: Send + 'static> OutPort<T> for N2N<T> {
    fn write(&self, value: T) -> Result<()> {
        self.core.write_lock.with_lock(|| self.core.inner.write(value))
    }

    fn write_before(&self, timeout: Duration, value: T) -> Result<bool> {
        self.core
            .write_lock
            .with_lock(|| self.core.inner.write_before(timeout, value))
    }

    /// Retire one writer; the channel closes when the last writer is gone.
    fn close_out(&self) {
        if self.core.writers.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.core.inner.close();
        }
    }

    fn can_output(&self) -> bool {
        self.core.inner.can_output()
    }

    fn out_port_state(&self) -> PortState {
        self.core.inner.out_port_state()
    }
}

impl<T: Send + 'static> Chan<T> for N2N<T> {
    fn close(&self) {
        self.core.inner.close();
        // unstick any writers or readers queued on the port locks
        self.core.write_lock.cancel();
        self.core.read_lock.cancel();
    }

    fn name(&self) -> String {
        self.core.name.clone()
    }

    fn reads(&self) -> u64 {
        self.core.inner.reads()
    }

    fn writes(&self) -> u64 {
        self.core.inner.writes()
    }
}
