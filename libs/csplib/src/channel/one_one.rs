// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Synchronous one-reader/one-writer rendezvous channel
//!
//! The writer publishes into a single buffer slot, flips `full`, wakes the
//! reader and parks; the reader takes the value, runs its rendezvous
//! function while the writer is still parked, flips `full` back and wakes
//! the writer. Each port has a thread slot; a second concurrent reader or
//! writer is overtaking, a usage error detected by the slot swap and
//! answered with a panic rather than silent corruption.
//!
//! A timed writer that gives up retracts its value; the buffer slot is the
//! arbiter, so a retraction and a concurrent read cannot both claim the
//! same value.

use crate::atomic::AtomicCell;
use crate::channel::{Chan, InPort, OutPort, PortState};
use crate::error::{CspError, Result};
use crate::naming::NameGenerator;
use crate::parking;
use crate::registry::{self, Debuggable};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::thread::{self, Thread};
use std::time::{Duration, Instant};

static ONE_ONE_NAMES: NameGenerator = NameGenerator::new("OneOne");

pub struct OneOne<T> {
    core: Arc<OneOneCore<T>>,
}

impl<T> Clone for OneOne<T> {
    fn clone(&self) -> Self {
        Self { core: Arc::clone(&self.core) }
    }
}

pub(crate) struct OneOneCore<T> {
    name: String,
    closed: AtomicBool,
    full: AtomicBool,
    buffer: Mutex<Option<T>>,
    reader: AtomicCell<Option<Thread>>,
    writer: AtomicCell<Option<Thread>>,
    reads: AtomicU64,
    writes: AtomicU64,
    key: AtomicU64,
}

impl<T: Send + 'static> OneOne<T> {
    pub fn new() -> Self {
        Self::with_name(None)
    }

    pub fn with_name(name: Option<&str>) -> Self {
        let core = Arc::new(OneOneCore {
            name: ONE_ONE_NAMES.generate(name),
            closed: AtomicBool::new(false),
            full: AtomicBool::new(false),
            buffer: Mutex::new(None),
            reader: AtomicCell::new(None),
            writer: AtomicCell::new(None),
            reads: AtomicU64::new(0),
            writes: AtomicU64::new(0),
            key: AtomicU64::new(0),
        });
        let weak: Weak<dyn Debuggable> = Arc::downgrade(&(Arc::clone(&core) as Arc<dyn Debuggable>));
        core.key.store(registry::register(weak), Ordering::SeqCst);
        Self { core }
    }
}

impl<T: Send + 'static> Default for OneOne<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send + 'static> OneOneCore<T> {
    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn is_full(&self) -> bool {
        self.full.load(Ordering::SeqCst)
    }

    fn closed_error(&self) -> CspError {
        self.writer.set(None);
        self.reader.set(None);
        CspError::Closed(self.name.clone())
    }

    fn check_open(&self) -> Result<()> {
        if self.is_closed() {
            Err(self.closed_error())
        } else {
            Ok(())
        }
    }

    /// CAS the current thread into `slot`; a non-empty prior occupant is
    /// overtaking.
    fn seat(&self, slot: &AtomicCell<Option<Thread>>, op: &str) -> Thread {
        let me = thread::current();
        let prior = slot.get_and_set(Some(me.clone()));
        if let Some(other) = prior {
            panic!(
                "[{}] {op} overtaking [{}] in {}",
                self.name,
                parking::thread_identity(&other),
                parking::thread_identity(&me),
            );
        }
        me
    }

    fn finished_read(&self) -> u64 {
        self.reads.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn finished_write(&self) -> u64 {
        self.writes.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub(crate) fn write(&self, value: T) -> Result<()> {
        self.check_open()?;
        self.seat(&self.writer, "write");
        *self.buffer.lock() = Some(value);
        self.full.store(true, Ordering::SeqCst);
        if let Some(reader) = self.reader.get() {
            parking::unpark(&reader);
        }
        while !self.is_closed() && self.is_full() {
            parking::park();
        }
        if self.is_full() {
            // woken by close with the value undelivered
            self.buffer.lock().take();
            return Err(self.closed_error());
        }
        self.writer.set(None);
        self.finished_write();
        Ok(())
    }

    pub(crate) fn write_before(&self, timeout: Duration, value: T) -> Result<bool> {
        self.check_open()?;
        self.seat(&self.writer, "write_before");
        *self.buffer.lock() = Some(value);
        self.full.store(true, Ordering::SeqCst);
        if let Some(reader) = self.reader.get() {
            parking::unpark(&reader);
        }
        let deadline = Instant::now() + timeout;
        loop {
            if self.is_closed() {
                return if self.retract() {
                    Err(self.closed_error())
                } else {
                    self.await_reader_done();
                    self.writer.set(None);
                    self.finished_write();
                    Ok(true)
                };
            }
            if !self.is_full() {
                self.writer.set(None);
                self.finished_write();
                return Ok(true);
            }
            let left = deadline.saturating_duration_since(Instant::now());
            if left.is_zero() {
                return if self.retract() {
                    self.writer.set(None);
                    Ok(false)
                } else {
                    // the reader claimed the value as the deadline expired
                    self.await_reader_done();
                    self.writer.set(None);
                    self.finished_write();
                    Ok(true)
                };
            }
            parking::park_for(left);
        }
    }

    /// Pull the published value back out. True iff it was still unclaimed;
    /// false means a reader owns it. `full` is cleared inside the buffer
    /// critical section so a reader never spins on a half-retracted slot.
    fn retract(&self) -> bool {
        let mut buffer = self.buffer.lock();
        if buffer.is_some() {
            buffer.take();
            self.full.store(false, Ordering::SeqCst);
            true
        } else {
            false
        }
    }

    /// The reader owns the value: stay blocked until it finishes its
    /// rendezvous (it clears `full` and unparks this writer).
    fn await_reader_done(&self) {
        while self.is_full() {
            parking::park();
        }
    }

    pub(crate) fn extended_rendezvous<R>(&self, f: impl FnOnce(T) -> R) -> Result<R> {
        self.check_open()?;
        self.seat(&self.reader, "read");
        let value = loop {
            while !self.is_closed() && !self.is_full() {
                parking::park();
            }
            if self.is_closed() {
                return Err(self.closed_error());
            }
            // full observed; the buffer slot arbitrates against retraction
            match self.buffer.lock().take() {
                Some(value) => break value,
                None => continue,
            }
        };
        let result = f(value);
        self.finish_read();
        Ok(result)
    }

    pub(crate) fn read_before(&self, timeout: Duration) -> Result<Option<T>> {
        self.check_open()?;
        self.seat(&self.reader, "read_before");
        let deadline = Instant::now() + timeout;
        let value = loop {
            if self.is_closed() {
                return Err(self.closed_error());
            }
            if self.is_full() {
                if let Some(value) = self.buffer.lock().take() {
                    break value;
                }
            }
            let left = deadline.saturating_duration_since(Instant::now());
            if left.is_zero() {
                self.reader.set(None);
                return Ok(None);
            }
            parking::park_for(left);
        };
        self.finish_read();
        Ok(Some(value))
    }

    fn finish_read(&self) {
        self.full.store(false, Ordering::SeqCst);
        if let Some(writer) = self.writer.get_and_set(None) {
            parking::unpark(&writer);
        }
        self.reader.set(None);
        self.finished_read();
    }

    pub(crate) fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            tracing::debug!("[{}] closing", self.name);
            if let Some(reader) = self.reader.get_and_set(None) {
                parking::unpark(&reader);
            }
            if let Some(writer) = self.writer.get_and_set(None) {
                parking::unpark(&writer);
            }
            registry::unregister(self.key.load(Ordering::SeqCst));
        }
    }

    pub(crate) fn in_port_state(&self) -> PortState {
        if self.is_closed() {
            PortState::Closed
        } else if self.is_full() {
            PortState::Ready
        } else {
            PortState::Unknown
        }
    }

    pub(crate) fn out_port_state(&self) -> PortState {
        if self.is_closed() {
            PortState::Closed
        } else if self.reader.get().is_some() && !self.is_full() {
            PortState::Ready
        } else {
            PortState::Unknown
        }
    }

    fn current_state(&self) -> String {
        let reader = self.reader.get();
        let writer = self.writer.get();
        let state = match (&writer, &reader) {
            (None, None) => "idle".to_string(),
            (Some(w), _) if self.is_full() => {
                format!("! full from {}", parking::thread_identity(w))
            }
            (Some(w), _) => format!("! from {}", parking::thread_identity(w)),
            (None, Some(r)) => format!("? from {}", parking::thread_identity(r)),
        };
        format!(
            "{state} (READ {}, WRITTEN {})",
            self.reads.load(Ordering::SeqCst),
            self.writes.load(Ordering::SeqCst)
        )
    }
}

impl<T: Send + 'static> Debuggable for OneOneCore<T> {
    fn debug_name(&self) -> String {
        self.name.clone()
    }

    fn kind(&self) -> &'static str {
        "channel"
    }

    fn show_state(&self, out: &mut dyn std::fmt::Write) -> std::fmt::Result {
        let closed = if self.is_closed() { "(CLOSED) " } else { "" };
        write!(out, "CHANNEL {}: OneOne {closed}{}", self.name, self.current_state())
    }

    fn get_waiting(&self) -> Vec<Thread> {
        self.reader
            .get()
            .into_iter()
            .chain(self.writer.get())
            .collect()
    }
}

impl<T: Send + 'static> InPort<T> for OneOne<T> {
    fn read(&self) -> Result<T> {
        self.core.extended_rendezvous(|v| v)
    }

    fn read_before(&self, timeout: Duration) -> Result<Option<T>> {
        self.core.read_before(timeout)
    }

    fn extended_rendezvous<R>(&self, f: impl FnOnce(T) -> R) -> Result<R> {
        self.core.extended_rendezvous(f)
    }

    fn close_in(&self) {
        self.core.close();
    }

    fn can_input(&self) -> bool {
        !self.core.is_closed()
    }

    fn in_port_state(&self) -> PortState {
        self.core.in_port_state()
    }
}

impl<T: Send + 'static> OutPort<T> for OneOne<T> {
    fn write(&self, value: T) -> Result<()> {
        self.core.write(value)
    }

    fn write_before(&self, timeout: Duration, value: T) -> Result<bool> {
        self.core.write_before(timeout, value)
    }

    fn close_out(&self) {
        self.core.close();
    }

    fn can_output(&self) -> bool {
        !self.core.is_closed()
    }

    fn out_port_state(&self) -> PortState {
        self.core.out_port_state()
    }
}

impl<T: Send + 'static> Chan<T> for OneOne<T> {
    fn close(&self) {
        self.core.close();
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
