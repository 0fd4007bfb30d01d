// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Channel family
//!
//! Single-value rendezvous conduits. `OneOne` is the synchronous
//! one-reader/one-writer core; `N2N` serialises shared ports around it;
//! `N2NBuf` is the bounded buffered variant; `FaultyOneOne` decorates
//! `OneOne` with probabilistic loss.
//!
//! Common contract: `write` fails with `Closed` on a closed channel and
//! otherwise delivers exactly once; `read` fails with `Closed` when the
//! channel is closed and no value remains; `close` is idempotent and wakes
//! any suspended reader or writer; the `reads`/`writes` counters are bumped
//! after the corresponding operation completes. Timed variants return a
//! sentinel (`None` / `false`) on timeout, never an error.

mod buffered;
mod faulty;
mod one_one;
mod shared;

pub use buffered::{N2NBuf, one_one_buf};
pub use faulty::FaultyOneOne;
pub use one_one::OneOne;
pub use shared::{N2N, many_many, many_one, one_many};

use crate::error::Result;
use std::time::Duration;

/// Projection of a port's instantaneous state, for alternation-style
/// readiness checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortState {
    Closed,
    Ready,
    Unknown,
}

impl std::fmt::Display for PortState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PortState::Closed => "CLS",
            PortState::Ready => "RDY",
            PortState::Unknown => "UNK",
        };
        f.write_str(s)
    }
}

/// The reading side of a channel.
pub trait InPort<T> {
    /// Take the next value, blocking until one is available.
    fn read(&self) -> Result<T>;

    /// `read` with a deadline: `Ok(None)` on timeout.
    fn read_before(&self, timeout: Duration) -> Result<Option<T>>;

    /// Read and apply `f` while the writer remains blocked, tying producer
    /// progress to consumer completion.
    fn extended_rendezvous<R>(&self, f: impl FnOnce(T) -> R) -> Result<R>;

    fn close_in(&self);

    fn can_input(&self) -> bool;

    fn in_port_state(&self) -> PortState;
}

/// The writing side of a channel.
pub trait OutPort<T> {
    /// Deliver `value`, blocking until a reader takes it.
    fn write(&self, value: T) -> Result<()>;

    /// `write` with a deadline: `Ok(false)` on timeout, with the value
    /// retracted so the peer never sees it.
    fn write_before(&self, timeout: Duration, value: T) -> Result<bool>;

    fn close_out(&self);

    fn can_output(&self) -> bool;

    fn out_port_state(&self) -> PortState;
}

/// A channel: both ports plus idempotent close.
pub trait Chan<T>: InPort<T> + OutPort<T> {
    fn close(&self);

    fn name(&self) -> String;

    /// Values successfully read so far.
    fn reads(&self) -> u64;

    /// Values successfully written so far.
    fn writes(&self) -> u64;
}
