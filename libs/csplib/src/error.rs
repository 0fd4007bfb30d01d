// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Error types for csplib
//!
//! `Stopped` and `Closed` are routine termination signals, not failures:
//! a `repeat` body that returns them ends its loop, `attempt` runs its
//! alternative, and `Par` treats them as its weakest outcome. Everything
//! else propagates.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CspError {
    /// A channel operation was attempted after the channel closed.
    #[error("Closed({0})")]
    Closed(String),

    /// Cooperative termination requested via `stop()`.
    #[error("stopped")]
    Stopped,

    /// Simulated failure from a crash-probability repeat loop.
    #[error("crashed")]
    Crashed,

    /// Two or more processes of a parallel composition failed.
    #[error("parallel composition failed: [{}]", format_par(.0))]
    Par(Vec<CspError>),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CspError {
    /// True for the routine termination signals (`Stopped`, `Closed`).
    pub fn is_stop(&self) -> bool {
        matches!(self, CspError::Stopped | CspError::Closed(_))
    }
}

fn format_par(errors: &[CspError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result type that uses CspError
pub type Result<T> = std::result::Result<T, CspError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stop_signals() {
        assert!(CspError::Stopped.is_stop());
        assert!(CspError::Closed("c".into()).is_stop());
        assert!(!CspError::Crashed.is_stop());
        assert!(!CspError::Par(vec![]).is_stop());
        assert!(!CspError::Other(anyhow::anyhow!("boom")).is_stop());
    }

    #[test]
    fn test_closed_display() {
        let e = CspError::Closed("pipe-1".into());
        assert_eq!(e.to_string(), "Closed(pipe-1)");
    }

    #[test]
    fn test_par_display() {
        let e = CspError::Par(vec![CspError::Stopped, CspError::Crashed]);
        assert_eq!(e.to_string(), "parallel composition failed: [stopped, crashed]");
    }
}
