// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Process-wide configuration via `csplib.toml`, resolved once at startup.
//!
//! Environment variables (`CSPLIB_*`) override file values; a `.env` file is
//! honoured for development. Missing or unparseable files fall back to
//! defaults with a warning rather than failing the process.

use serde::Deserialize;
use std::path::Path;
use std::str::FromStr;

/// Configuration file name.
pub const FILE_NAME: &str = "csplib.toml";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PoolKind {
    /// Cached pools bucketed by power-of-two stack sizes.
    Sized,
    /// One cached pool whose threads take `pool-stack-bytes`.
    Adaptive,
    /// One cached pool with default stacks.
    Cached,
    /// A fresh thread per process.
    Unpooled,
}

impl FromStr for PoolKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sized" => Ok(PoolKind::Sized),
            "adaptive" => Ok(PoolKind::Adaptive),
            "cached" => Ok(PoolKind::Cached),
            "unpooled" => Ok(PoolKind::Unpooled),
            other => Err(format!(
                "pool-kind should be sized, adaptive, cached or unpooled, not {other}"
            )),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CspConfig {
    /// Debug server port: 0 for ephemeral, negative to disable.
    pub debug_port: i32,

    /// Whitespace/comma separated component names hidden from debug dumps.
    pub suppress: String,

    /// Executor strategy.
    pub pool_kind: PoolKind,

    /// Maximum workers for pooled variants.
    pub pool_max: Option<usize>,

    /// Stack-size hint passed to adaptive pools.
    pub pool_stack_bytes: usize,

    /// Default per-logger retention (0 means unbounded).
    pub log_size: usize,

    /// Bitmask selecting which logger categories are retained.
    pub log_mask: u32,
}

impl Default for CspConfig {
    fn default() -> Self {
        Self {
            debug_port: 0,
            suppress: String::new(),
            pool_kind: PoolKind::Adaptive,
            pool_max: None,
            pool_stack_bytes: 0,
            log_size: 100,
            log_mask: u32::MAX,
        }
    }
}

impl CspConfig {
    /// Resolve the process configuration: `.env`, then `csplib.toml` (or the
    /// file named by `CSPLIB_CONFIG`), then `CSPLIB_*` overrides.
    pub fn resolve() -> Self {
        dotenvy::dotenv().ok();
        let path = std::env::var("CSPLIB_CONFIG").unwrap_or_else(|_| FILE_NAME.to_string());
        let mut config = Self::load_or_default(Path::new(&path));
        config.apply_env_overrides();
        config
    }

    /// Load from `path`, returning defaults if the file is missing or
    /// unparseable.
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            tracing::debug!("no {} found, using defaults", path.display());
            return Self::default();
        }
        match std::fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => {
                    tracing::info!("loaded configuration from {}", path.display());
                    config
                }
                Err(e) => {
                    tracing::warn!("failed to parse {}: {e}, using defaults", path.display());
                    Self::default()
                }
            },
            Err(e) => {
                tracing::warn!("failed to read {}: {e}, using defaults", path.display());
                Self::default()
            }
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Some(v) = env_parse("CSPLIB_DEBUG_PORT") {
            self.debug_port = v;
        }
        if let Ok(v) = std::env::var("CSPLIB_SUPPRESS") {
            self.suppress = v;
        }
        if let Ok(v) = std::env::var("CSPLIB_POOL_KIND") {
            match v.parse() {
                Ok(kind) => self.pool_kind = kind,
                Err(e) => tracing::warn!("{e}"),
            }
        }
        if let Some(v) = env_parse("CSPLIB_POOL_MAX") {
            self.pool_max = Some(v);
        }
        if let Some(v) = env_parse("CSPLIB_POOL_STACK_BYTES") {
            self.pool_stack_bytes = v;
        }
        if let Some(v) = env_parse("CSPLIB_LOG_SIZE") {
            self.log_size = v;
        }
        if let Some(v) = env_parse("CSPLIB_LOG_MASK") {
            self.log_mask = v;
        }
    }

    /// The suppress list as individual component names.
    pub fn suppressed(&self) -> Vec<String> {
        self.suppress
            .split([',', ' '])
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!("ignoring unparseable {key}={raw}");
            None
        }
    }
}
