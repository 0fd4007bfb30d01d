// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! csplib - Communicating Sequential Processes for Rust
//!
//! A toolkit for building concurrent programs from a fixed vocabulary of
//! *processes* and *synchronising objects*. Processes are schedulable units
//! of control; channels, barriers, semaphores, flags, locks, monitors and
//! logged counters coordinate them by blocking rendezvous rather than shared
//! memory.
//!
//! ```no_run
//! use csplib::prelude::*;
//!
//! let c = OneOne::new();
//! let producer = iter_to_channel(0..100, c.clone());
//! let consumer = {
//!     let c = c.clone();
//!     proc("sum", move || {
//!         let mut total = 0;
//!         repeat(|| {
//!             total += c.read()?;
//!             Ok(())
//!         })?;
//!         tracing::info!("total = {total}");
//!         Ok(())
//!     })
//! };
//! (producer | consumer).run().unwrap();
//! ```

pub mod atomic;
pub mod barrier;
pub mod channel;
pub mod combinators;
pub mod config;
pub mod debugger;
pub mod error;
pub mod executor;
pub mod flag;
pub mod latch;
pub mod lock;
pub mod logger;
pub mod monitor;
pub mod naming;
pub mod parking;
pub mod process;
pub mod queue;
pub mod registry;
pub mod runtime;
pub mod semaphore;

pub use atomic::{AtomicCell, AtomicCounter};
pub use barrier::{AndBarrier, Barrier, CombiningBarrier, OrBarrier, and_barrier, or_barrier};
pub use channel::{
    Chan, FaultyOneOne, InPort, N2N, N2NBuf, OneOne, OutPort, PortState, many_many, many_one,
    one_many, one_one_buf,
};
pub use combinators::{attempt, repeat, repeat_crashing, repeat_while, stop};
pub use config::{CspConfig, PoolKind};
pub use debugger::Debugger;
pub use error::{CspError, Result};
pub use flag::Flag;
pub use latch::CountDownLatch;
pub use lock::{SimpleLock, SimpleLockGuard};
pub use logger::{LogEvent, Logger};
pub use monitor::Monitor;
pub use process::{Handle, Proc, iter_to_channel, ordered, par, proc, simple, skip};
pub use queue::WaiterQueue;
pub use registry::Debuggable;
pub use runtime::{CspRuntime, runtime};
pub use semaphore::{BooleanSemaphore, CountingSemaphore, Semaphore};

/// The working vocabulary in one import.
pub mod prelude {
    pub use crate::barrier::{Barrier, CombiningBarrier, and_barrier, or_barrier};
    pub use crate::channel::{
        Chan, FaultyOneOne, InPort, N2N, N2NBuf, OneOne, OutPort, many_many, many_one, one_many,
        one_one_buf,
    };
    pub use crate::combinators::{attempt, repeat, repeat_while, stop};
    pub use crate::error::{CspError, Result};
    pub use crate::flag::Flag;
    pub use crate::lock::SimpleLock;
    pub use crate::monitor::Monitor;
    pub use crate::process::{Handle, Proc, iter_to_channel, ordered, par, proc, simple, skip};
    pub use crate::semaphore::{BooleanSemaphore, CountingSemaphore, Semaphore};
}
