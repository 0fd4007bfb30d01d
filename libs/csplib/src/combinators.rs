// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Control-flow glue for process bodies
//!
//! Cooperative termination is a value, not an unwind: `stop()` produces the
//! `Stopped` signal, `repeat` loops a body until it returns a stop signal,
//! and `attempt` runs an alternative when the body stops. Real errors pass
//! through all of them untouched.

use crate::error::{CspError, Result};

/// The cooperative termination signal, for `return Err(stop())`.
pub fn stop() -> CspError {
    CspError::Stopped
}

/// Run `body`; on a stop signal run `alt` instead. Other errors propagate.
pub fn attempt(body: impl FnOnce() -> Result<()>, alt: impl FnOnce() -> Result<()>) -> Result<()> {
    match body() {
        Err(e) if e.is_stop() => alt(),
        other => other,
    }
}

/// Run `body` until it returns a stop signal (which ends the loop
/// normally). Other errors propagate.
pub fn repeat(mut body: impl FnMut() -> Result<()>) -> Result<()> {
    loop {
        match body() {
            Ok(()) => {}
            Err(e) if e.is_stop() => return Ok(()),
            Err(e) => return Err(e),
        }
    }
}

/// `repeat` gated by `guard`, checked before every iteration.
pub fn repeat_while(
    mut guard: impl FnMut() -> bool,
    mut body: impl FnMut() -> Result<()>,
) -> Result<()> {
    while guard() {
        match body() {
            Ok(()) => {}
            Err(e) if e.is_stop() => return Ok(()),
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

/// `repeat` that fails with `Crashed` with probability `prob_crash` before
/// each iteration. Exercises partial-failure paths in tests and demos.
pub fn repeat_crashing(prob_crash: f64, mut body: impl FnMut() -> Result<()>) -> Result<()> {
    loop {
        if prob_crash > 0.0 && fastrand::f64() < prob_crash {
            return Err(CspError::Crashed);
        }
        match body() {
            Ok(()) => {}
            Err(e) if e.is_stop() => return Ok(()),
            Err(e) => return Err(e),
        }
    }
}
