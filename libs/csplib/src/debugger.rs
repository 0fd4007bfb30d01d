// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Debug dump endpoint
//!
//! Any HTTP request to `localhost:<debug-port>` answers `201` with a plain
//! text dump of the live state: active threads and what each is waiting on,
//! monitored named expressions, and every registered Debuggable. The
//! listener is an axum router on a current-thread tokio runtime confined to
//! one dedicated OS thread; the library itself stays synchronous.
//!
//! The same dump is available programmatically through `show_csp_state`.

use crate::config::CspConfig;
use crate::parking;
use crate::registry;
use axum::Router;
use axum::http::{StatusCode, header};
use parking_lot::Mutex;
use std::net::TcpListener;
use std::sync::Arc;

type MonitoredExpr = Box<dyn Fn() -> String + Send + Sync>;

pub struct Debugger {
    port: Option<u16>,
    suppress: Vec<String>,
    monitors: Mutex<Vec<(String, MonitoredExpr)>>,
}

impl Debugger {
    /// Build the debugger from configuration and, unless `debug-port` is
    /// negative, bind the listener (port 0 asks the OS for an ephemeral
    /// one) and start serving.
    pub fn install(config: &CspConfig) -> Arc<Self> {
        if config.debug_port < 0 {
            tracing::debug!("debug server disabled by configuration");
            return Arc::new(Self::headless(config));
        }
        match TcpListener::bind(("127.0.0.1", config.debug_port as u16)) {
            Ok(listener) => {
                let port = listener.local_addr().map(|a| a.port()).unwrap_or(0);
                let debugger = Arc::new(Self {
                    port: Some(port),
                    suppress: config.suppressed(),
                    monitors: Mutex::new(Vec::new()),
                });
                Self::serve(Arc::clone(&debugger), listener);
                tracing::info!("debug server listening on http://localhost:{port}");
                debugger
            }
            Err(e) => {
                tracing::warn!("failed to bind debug server: {e}");
                Arc::new(Self::headless(config))
            }
        }
    }

    /// A debugger with no HTTP surface, for direct dump inspection.
    pub fn headless(config: &CspConfig) -> Self {
        Self {
            port: None,
            suppress: config.suppressed(),
            monitors: Mutex::new(Vec::new()),
        }
    }

    /// The bound port, when the server is up.
    pub fn port(&self) -> Option<u16> {
        self.port
    }

    /// Register a named expression evaluated into every dump.
    pub fn monitor(&self, name: impl Into<String>, expr: impl Fn() -> String + Send + Sync + 'static) {
        self.monitors.lock().push((name.into(), Box::new(expr)));
    }

    pub fn remove_monitor(&self, name: &str) {
        self.monitors.lock().retain(|(n, _)| n != name);
    }

    fn serve(debugger: Arc<Self>, listener: TcpListener) {
        std::thread::Builder::new()
            .name("csp-debugger".into())
            .spawn(move || {
                let _directory = parking::register_current("csp-debugger", true);
                let runtime = match tokio::runtime::Builder::new_current_thread()
                    .enable_io()
                    .build()
                {
                    Ok(rt) => rt,
                    Err(e) => {
                        tracing::warn!("debug server runtime failed: {e}");
                        return;
                    }
                };
                runtime.block_on(async move {
                    // the fallback matches every method and path
                    let app = Router::new().fallback(move || {
                        let debugger = Arc::clone(&debugger);
                        async move {
                            let mut dump = String::new();
                            let _ = debugger.show_csp_state(&mut dump);
                            (
                                StatusCode::CREATED,
                                [(header::CONTENT_TYPE, "text/plain")],
                                dump,
                            )
                        }
                    });
                    if let Err(e) = listener.set_nonblocking(true) {
                        tracing::warn!("debug server listener setup failed: {e}");
                        return;
                    }
                    let listener = match tokio::net::TcpListener::from_std(listener) {
                        Ok(l) => l,
                        Err(e) => {
                            tracing::warn!("debug server listener setup failed: {e}");
                            return;
                        }
                    };
                    if let Err(e) = axum::serve(listener, app).await {
                        tracing::warn!("debug server stopped: {e}");
                    }
                });
            })
            .expect("failed to spawn debug server thread");
    }

    fn suppressed(&self, d: &dyn registry::Debuggable) -> bool {
        self.suppress
            .iter()
            .any(|s| s == d.kind() || *s == d.debug_name())
    }

    /// Write the full state dump: threads and their waiters, monitored
    /// expressions, then every registered object.
    pub fn show_csp_state(&self, out: &mut dyn std::fmt::Write) -> std::fmt::Result {
        let registered = registry::registered();

        writeln!(out, "== THREADS ==")?;
        for info in parking::active_threads() {
            writeln!(out, "{}", parking::thread_identity(&info.thread))?;
            for d in &registered {
                if self.suppressed(d.as_ref()) {
                    continue;
                }
                let waiting_here = d
                    .get_waiting()
                    .iter()
                    .any(|t| t.id() == info.thread.id());
                if waiting_here {
                    write!(out, "  ")?;
                    d.show_state(out)?;
                    writeln!(out)?;
                }
            }
        }

        let monitors = self.monitors.lock();
        if !monitors.is_empty() {
            writeln!(out, "== MONITORED ==")?;
            for (name, expr) in monitors.iter() {
                writeln!(out, "{name}: {}", expr())?;
            }
        }
        drop(monitors);

        writeln!(out, "== REGISTERED ==")?;
        for d in &registered {
            if self.suppressed(d.as_ref()) || !d.has_state() {
                continue;
            }
            d.show_state(out)?;
            writeln!(out)?;
        }
        Ok(())
    }
}
