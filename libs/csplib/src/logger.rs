// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Registered ring-buffer loggers
//!
//! A `Logger` retains the most recent `log_size` events (0 means unbounded)
//! and shows them through the debugger like any other registered object.
//! Events carry a category bitmask: an event is retained iff
//! `mask & bits == bits`, so the process-wide `log-mask` selects which
//! categories survive.

use crate::naming::NameGenerator;
use crate::parking;
use crate::registry::{self, Debuggable};
use crate::runtime::runtime;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::{Arc, Weak};
use std::time::{SystemTime, UNIX_EPOCH};

static LOGGER_NAMES: NameGenerator = NameGenerator::new("Logger");

#[derive(Debug, Clone)]
pub struct LogEvent {
    pub timestamp_ns: u128,
    pub thread: String,
    pub text: String,
}

impl std::fmt::Display for LogEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:: {}: {}", self.timestamp_ns, self.thread, self.text)
    }
}

pub struct Logger {
    core: Arc<LoggerCore>,
}

impl Clone for Logger {
    fn clone(&self) -> Self {
        Self { core: Arc::clone(&self.core) }
    }
}

struct LoggerCore {
    name: String,
    log_size: usize,
    mask: u32,
    entries: Mutex<VecDeque<LogEvent>>,
    key: Mutex<registry::StateKey>,
}

impl Logger {
    /// A logger with the process-wide retention and mask.
    pub fn new(name: Option<&str>) -> Self {
        let config = runtime().config();
        Self::with_retention(name, config.log_size, config.log_mask)
    }

    pub fn with_retention(name: Option<&str>, log_size: usize, mask: u32) -> Self {
        let core = Arc::new(LoggerCore {
            name: LOGGER_NAMES.generate(name),
            log_size,
            mask,
            entries: Mutex::new(VecDeque::new()),
            key: Mutex::new(0),
        });
        let weak: Weak<dyn Debuggable> = Arc::downgrade(&(Arc::clone(&core) as Arc<dyn Debuggable>));
        *core.key.lock() = registry::register(weak);
        Self { core }
    }

    pub fn name(&self) -> &str {
        &self.core.name
    }

    /// Record an uncategorised event (always retained).
    pub fn log(&self, text: impl Into<String>) {
        self.log_masked(0, text);
    }

    /// Record an event in the categories named by `bits`; retained iff
    /// every category is selected by the logger's mask.
    pub fn log_masked(&self, bits: u32, text: impl Into<String>) {
        if self.core.mask & bits != bits {
            return;
        }
        let event = LogEvent {
            timestamp_ns: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_nanos())
                .unwrap_or(0),
            thread: parking::thread_identity(&std::thread::current()),
            text: text.into(),
        };
        let mut entries = self.core.entries.lock();
        entries.push_back(event);
        if self.core.log_size > 0 && entries.len() > self.core.log_size {
            entries.pop_front();
        }
    }

    pub fn num_entries(&self) -> usize {
        self.core.entries.lock().len()
    }

    pub fn entries(&self) -> Vec<LogEvent> {
        self.core.entries.lock().iter().cloned().collect()
    }
}

impl Drop for LoggerCore {
    fn drop(&mut self) {
        registry::unregister(*self.key.lock());
    }
}

impl Debuggable for LoggerCore {
    fn debug_name(&self) -> String {
        self.name.clone()
    }

    fn kind(&self) -> &'static str {
        "logger"
    }

    fn show_state(&self, out: &mut dyn std::fmt::Write) -> std::fmt::Result {
        writeln!(out, "{} Log", self.name)?;
        for event in self.entries.lock().iter() {
            writeln!(out, "  {event}")?;
        }
        Ok(())
    }

    fn has_state(&self) -> bool {
        !self.entries.lock().is_empty()
    }
}
