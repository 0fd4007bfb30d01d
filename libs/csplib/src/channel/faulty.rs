// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Lossy-link decorator over the one-to-one channel
//!
//! With probability `prob_loss` a write returns without transferring
//! anything, which models an unreliable medium for protocol exercises.
//! Everything else delegates to the wrapped channel; a dropped write never
//! reaches the wire, so it does not count towards `writes`.

use crate::channel::one_one::OneOne;
use crate::channel::{Chan, InPort, OutPort, PortState};
use crate::error::Result;
use std::time::Duration;

pub struct FaultyOneOne<T> {
    inner: OneOne<T>,
    prob_loss: f64,
}

impl<T> Clone for FaultyOneOne<T> {
    fn clone(&self) -> Self {
        Self { inner: self.inner.clone(), prob_loss: self.prob_loss }
    }
}

impl<T: Send + 'static> FaultyOneOne<T> {
    pub fn new(prob_loss: f64) -> Self {
        Self::with_name(prob_loss, None)
    }

    pub fn with_name(prob_loss: f64, name: Option<&str>) -> Self {
        assert!(
            (0.0..=1.0).contains(&prob_loss),
            "loss probability must lie in [0, 1]"
        );
        Self { inner: OneOne::with_name(name), prob_loss }
    }

    fn lose(&self) -> bool {
        fastrand::f64() < self.prob_loss
    }
}

impl<T: Send + 'static> InPort<T> for FaultyOneOne<T> {
    fn read(&self) -> Result<T> {
        self.inner.read()
    }

    fn read_before(&self, timeout: Duration) -> Result<Option<T>> {
        self.inner.read_before(timeout)
    }

    fn extended_rendezvous<R>(&self, f: impl FnOnce(T) -> R) -> Result<R> {
        self.inner.extended_rendezvous(f)
    }

    fn close_in(&self) {
        self.inner.close_in();
    }

    fn can_input(&self) -> bool {
        self.inner.can_input()
    }

    fn in_port_state(&self) -> PortState {
        self.inner.in_port_state()
    }
}

impl<T: Send + 'static> OutPort<T> for FaultyOneOne<T> {
    fn write(&self, value: T) -> Result<()> {
        if self.lose() {
            drop(value);
            return Ok(());
        }
        self.inner.write(value)
    }

    fn write_before(&self, timeout: Duration, value: T) -> Result<bool> {
        if self.lose() {
            drop(value);
            return Ok(true);
        }
        self.inner.write_before(timeout, value)
    }

    fn close_out(&self) {
        self.inner.close_out();
    }

    fn can_output(&self) -> bool {
        self.inner.can_output()
    }

    fn out_port_state(&self) -> PortState {
        self.inner.out_port_state()
    }
}

impl<T: Send + 'static> Chan<T> for FaultyOneOne<T> {
    fn close(&self) {
        self.inner.close();
    }

    fn name(&self) -> String {
        Chan::name(&self.inner)
    }

    fn reads(&self) -> u64 {
        self.inner.reads()
    }

    fn writes(&self) -> u64 {
        self.inner.writes()
    }
}
