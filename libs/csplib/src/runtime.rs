// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! The process-wide runtime
//!
//! One value owns what would otherwise be hidden globals: the resolved
//! configuration, the executor, the terminal-exception print lock and the
//! debugger. It is initialised on first use; the debugger (and its HTTP
//! listener) only comes up when something asks for it.

use crate::config::CspConfig;
use crate::debugger::Debugger;
use crate::error::CspError;
use crate::executor::{self, CspExecutor};
use crate::parking::{self, DirectoryGuard};
use parking_lot::Mutex;
use std::sync::{Arc, OnceLock};

pub struct CspRuntime {
    config: CspConfig,
    executor: Box<dyn CspExecutor>,
    debugger: OnceLock<Arc<Debugger>>,
    print_lock: Mutex<()>,
    _main_thread: DirectoryGuard,
}

static RUNTIME: OnceLock<CspRuntime> = OnceLock::new();

/// The process-wide runtime, initialised on first use.
pub fn runtime() -> &'static CspRuntime {
    RUNTIME.get_or_init(|| {
        let config = CspConfig::resolve();
        tracing::debug!("runtime starting with {config:?}");
        let executor = executor::from_config(&config);
        CspRuntime {
            executor,
            debugger: OnceLock::new(),
            print_lock: Mutex::new(()),
            _main_thread: parking::register_current("main", false),
            config,
        }
    })
}

impl CspRuntime {
    pub fn config(&self) -> &CspConfig {
        &self.config
    }

    pub fn executor(&self) -> &dyn CspExecutor {
        self.executor.as_ref()
    }

    /// The debugger, starting its HTTP listener on first access (unless
    /// `debug-port` is negative).
    pub fn debugger(&self) -> &Arc<Debugger> {
        self.debugger.get_or_init(|| Debugger::install(&self.config))
    }

    /// Serialised reporting of a terminal process exception, so concurrent
    /// failures never interleave their traces.
    pub fn report_termination(&self, process: &str, error: &CspError) {
        let _guard = self.print_lock.lock();
        tracing::error!("[{process}] terminated by throwing {error}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runtime_is_a_singleton() {
        let a = runtime() as *const CspRuntime;
        let b = runtime() as *const CspRuntime;
        assert_eq!(a, b);
    }

    #[test]
    fn test_main_thread_registered() {
        let _ = runtime();
        assert!(parking::active_threads().iter().any(|t| t.name == "main"));
    }
}
