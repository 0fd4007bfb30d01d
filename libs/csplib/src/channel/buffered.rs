// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Shared buffered channel
//!
//! A bounded queue with separate input-closed and output-closed flags and
//! writer/reader populations. Writers block while the queue is at capacity;
//! readers block while it is empty. When the last writer retires the output
//! closes and readers may drain what remains; when the last reader retires
//! the input closes and buffered values are discarded (values with no reader
//! are dropped).

use crate::channel::{Chan, InPort, OutPort, PortState};
use crate::error::{CspError, Result};
use crate::naming::NameGenerator;
use crate::registry::{self, Debuggable};
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::thread::Thread;
use std::time::Duration;

static N2N_BUF_NAMES: NameGenerator = NameGenerator::new("N2NBuf");

pub struct N2NBuf<T> {
    core: Arc<N2NBufCore<T>>,
}

impl<T> Clone for N2NBuf<T> {
    fn clone(&self) -> Self {
        Self { core: Arc::clone(&self.core) }
    }
}

struct N2NBufCore<T> {
    name: String,
    capacity: usize,
    queue: Mutex<VecDeque<T>>,
    not_full: Condvar,
    not_empty: Condvar,
    in_closed: AtomicBool,
    out_closed: AtomicBool,
    writers: AtomicI64,
    readers: AtomicI64,
    reads: AtomicU64,
    writes: AtomicU64,
    key: AtomicU64,
}

impl<T: Send + 'static> N2NBuf<T> {
    pub fn new(size: usize, writers: usize, readers: usize) -> Self {
        Self::with_name(size, writers, readers, None)
    }

    pub fn with_name(size: usize, writers: usize, readers: usize, name: Option<&str>) -> Self {
        assert!(size >= 1, "a buffered channel needs capacity of at least one");
        let core = Arc::new(N2NBufCore {
            name: N2N_BUF_NAMES.generate(name),
            capacity: size,
            queue: Mutex::new(VecDeque::with_capacity(size)),
            not_full: Condvar::new(),
            not_empty: Condvar::new(),
            in_closed: AtomicBool::new(false),
            out_closed: AtomicBool::new(false),
            writers: AtomicI64::new(writers as i64),
            readers: AtomicI64::new(readers as i64),
            reads: AtomicU64::new(0),
            writes: AtomicU64::new(0),
            key: AtomicU64::new(0),
        });
        let weak: Weak<dyn Debuggable> = Arc::downgrade(&(Arc::clone(&core) as Arc<dyn Debuggable>));
        core.key.store(registry::register(weak), Ordering::SeqCst);
        Self { core }
    }

    pub fn is_empty(&self) -> bool {
        self.core.queue.lock().is_empty()
    }

    pub fn len(&self) -> usize {
        self.core.queue.lock().len()
    }
}

/// One writer, one reader, bounded buffer.
pub fn one_one_buf<T: Send + 'static>(size: usize) -> N2NBuf<T> {
    N2NBuf::new(size, 1, 1)
}

impl<T: Send + 'static> N2NBufCore<T> {
    fn input_closed(&self) -> bool {
        self.in_closed.load(Ordering::SeqCst)
    }

    fn output_closed(&self) -> bool {
        self.out_closed.load(Ordering::SeqCst)
    }

    fn closed_error(&self) -> CspError {
        CspError::Closed(self.name.clone())
    }

    /// Both sides shut, buffered values discarded, everyone woken.
    fn full_close(&self) {
        let was_closed = self.in_closed.swap(true, Ordering::SeqCst)
            & self.out_closed.swap(true, Ordering::SeqCst);
        self.queue.lock().clear();
        self.not_full.notify_all();
        self.not_empty.notify_all();
        if !was_closed {
            tracing::debug!("[{}] closing", self.name);
            registry::unregister(self.key.load(Ordering::SeqCst));
        }
    }

    fn write(&self, value: T) -> Result<()> {
        match self.write_inner(None, value)? {
            true => Ok(()),
            false => unreachable!("untimed write cannot time out"),
        }
    }

    fn write_inner(&self, timeout: Option<Duration>, value: T) -> Result<bool> {
        if self.input_closed() || self.output_closed() {
            return Err(self.closed_error());
        }
        let mut queue = self.queue.lock();
        while queue.len() == self.capacity {
            if self.input_closed() || self.output_closed() {
                return Err(self.closed_error());
            }
            match timeout {
                None => self.not_full.wait(&mut queue),
                Some(t) => {
                    if self.not_full.wait_for(&mut queue, t).timed_out() {
                        return Ok(false);
                    }
                }
            }
        }
        if self.input_closed() || self.output_closed() {
            return Err(self.closed_error());
        }
        queue.push_back(value);
        drop(queue);
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.not_empty.notify_one();
        Ok(true)
    }

    fn read(&self) -> Result<T> {
        match self.read_inner(None)? {
            Some(value) => Ok(value),
            None => unreachable!("untimed read cannot time out"),
        }
    }

    fn read_inner(&self, timeout: Option<Duration>) -> Result<Option<T>> {
        if self.input_closed() {
            return Err(self.closed_error());
        }
        let mut queue = self.queue.lock();
        loop {
            if self.input_closed() {
                return Err(self.closed_error());
            }
            if let Some(value) = queue.pop_front() {
                drop(queue);
                self.reads.fetch_add(1, Ordering::SeqCst);
                self.not_full.notify_one();
                return Ok(Some(value));
            }
            if self.output_closed() {
                // no writers left and nothing buffered: retire fully
                drop(queue);
                self.full_close();
                return Err(self.closed_error());
            }
            match timeout {
                None => self.not_empty.wait(&mut queue),
                Some(t) => {
                    if self.not_empty.wait_for(&mut queue, t).timed_out() {
                        return Ok(None);
                    }
                }
            }
        }
    }

    /// Retire one writer. At zero the output closes; with an empty queue
    /// that is a full close, otherwise readers drain the remainder first.
    fn close_out(&self) {
        if self.writers.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.out_closed.store(true, Ordering::SeqCst);
            let empty = self.queue.lock().is_empty();
            if empty {
                self.full_close();
            } else {
                self.not_empty.notify_all();
                self.not_full.notify_all();
            }
        }
    }

    /// Retire one reader. At zero the input closes and the channel closes
    /// fully, discarding anything still buffered.
    fn close_in(&self) {
        if self.readers.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.full_close();
        }
    }

    fn in_port_state(&self) -> PortState {
        if self.input_closed() {
            PortState::Closed
        } else if !self.queue.lock().is_empty() {
            PortState::Ready
        } else if self.output_closed() {
            PortState::Closed
        } else {
            PortState::Unknown
        }
    }

    fn out_port_state(&self) -> PortState {
        if self.input_closed() || self.output_closed() {
            PortState::Closed
        } else if self.queue.lock().len() < self.capacity {
            PortState::Ready
        } else {
            PortState::Unknown
        }
    }
}

impl<T: Send + 'static> Debuggable for N2NBufCore<T> {
    fn debug_name(&self) -> String {
        self.name.clone()
    }

    fn kind(&self) -> &'static str {
        "channel"
    }

    fn show_state(&self, out: &mut dyn std::fmt::Write) -> std::fmt::Result {
        let closed = if self.input_closed() && self.output_closed() {
            "(CLOSED) "
        } else if self.output_closed() {
            "(OUT CLOSED) "
        } else if self.input_closed() {
            "(IN CLOSED) "
        } else {
            ""
        };
        write!(
            out,
            "CHANNEL {}: N2NBuf {closed}{}/{} buffered (READ {}, WRITTEN {})",
            self.name,
            self.queue.lock().len(),
            self.capacity,
            self.reads.load(Ordering::SeqCst),
            self.writes.load(Ordering::SeqCst)
        )
    }

    fn get_waiting(&self) -> Vec<Thread> {
        // blocked threads sit on the condvars; the dump reports queue depth
        Vec::new()
    }
}

impl<T: Send + 'static> InPort<T> for N2NBuf<T> {
    fn read(&self) -> Result<T> {
        self.core.read()
    }

    fn read_before(&self, timeout: Duration) -> Result<Option<T>> {
        self.core.read_inner(Some(timeout))
    }

    fn extended_rendezvous<R>(&self, f: impl FnOnce(T) -> R) -> Result<R> {
        // buffered channels decouple the writer, so the fold is just a read
        self.core.read().map(f)
    }

    fn close_in(&self) {
        self.core.close_in();
    }

    fn can_input(&self) -> bool {
        !self.core.input_closed()
    }

    fn in_port_state(&self) -> PortState {
        self.core.in_port_state()
    }
}

impl<T: Send + 'static> OutPort<T> for N2NBuf<T> {
    fn write(&self, value: T) -> Result<()> {
        self.core.write(value)
    }

    fn write_before(&self, timeout: Duration, value: T) -> Result<bool> {
        self.core.write_inner(Some(timeout), value)
    }

    fn close_out(&self) {
        self.core.close_out();
    }

    fn can_output(&self) -> bool {
        !self.core.input_closed() && !self.core.output_closed()
    }

    fn out_port_state(&self) -> PortState {
        self.core.out_port_state()
    }
}

impl<T: Send + 'static> Chan<T> for N2NBuf<T> {
    fn close(&self) {
        self.core.full_close();
    }

    fn name(&self) -> String {
        self.core.name.clone()
    }

    fn reads(&self) -> u64 {
        self.core.reads.load(Ordering::SeqCst)
    }

    fn writes(&self) -> u64 {
        self.core.writes.load(Ordering::SeqCst)
    }
}
