// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Executor strategies for forked processes
//!
//! Every variant hands each job a registered, identity-carrying thread. The
//! pooled variants keep idle workers parked on a crossbeam channel and grow
//! on demand; the sized variant buckets jobs by their stack-size hint so a
//! deep-stack process never lands on a shallow worker.

use crate::atomic::AtomicCounter;
use crate::config::{CspConfig, PoolKind};
use crate::parking;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

pub type Job = Box<dyn FnOnce() + Send + 'static>;

pub trait CspExecutor: Send + Sync {
    /// Run `job` on some thread, honouring `stack_size` as a hint
    /// (0 means "no preference").
    fn execute(&self, job: Job, stack_size: usize);

    /// Stop accepting jobs and let idle workers drain away.
    fn shutdown(&self);
}

/// Build the executor selected by the configuration.
pub fn from_config(config: &CspConfig) -> Box<dyn CspExecutor> {
    match config.pool_kind {
        PoolKind::Unpooled => Box::new(UnpooledExecutor::new()),
        PoolKind::Cached => Box::new(CachedPool::new("csp-pool", 0, config.pool_max)),
        PoolKind::Adaptive => Box::new(CachedPool::new(
            "csp-pool",
            config.pool_stack_bytes,
            config.pool_max,
        )),
        PoolKind::Sized => Box::new(SizedExecutor::new(config.pool_max)),
    }
}

/// One fresh thread per job.
pub struct UnpooledExecutor {
    thread_count: AtomicCounter,
}

impl UnpooledExecutor {
    pub fn new() -> Self {
        Self { thread_count: AtomicCounter::new() }
    }
}

impl Default for UnpooledExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl CspExecutor for UnpooledExecutor {
    fn execute(&self, job: Job, stack_size: usize) {
        let name = format!("csp-unpooled-{}", self.thread_count.next());
        let mut builder = std::thread::Builder::new().name(name.clone());
        if stack_size > 0 {
            builder = builder.stack_size(stack_size);
        }
        builder
            .spawn(move || {
                let _directory = parking::register_current(name, true);
                job();
            })
            .expect("failed to spawn process thread");
    }

    fn shutdown(&self) {}
}

const WORKER_KEEP_ALIVE: Duration = Duration::from_secs(60);

/// Workers pull jobs off an unbounded channel; a job arriving with no idle
/// worker grows the pool (up to `max`), and workers idle past the
/// keep-alive retire themselves.
pub struct CachedPool {
    prefix: &'static str,
    stack_size: usize,
    max: Option<usize>,
    tx: Mutex<Option<Sender<Job>>>,
    rx: Receiver<Job>,
    idle: Arc<AtomicUsize>,
    live: Arc<AtomicUsize>,
    worker_count: AtomicCounter,
}

impl CachedPool {
    pub fn new(prefix: &'static str, stack_size: usize, max: Option<usize>) -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();
        Self {
            prefix,
            stack_size,
            max,
            tx: Mutex::new(Some(tx)),
            rx,
            idle: Arc::new(AtomicUsize::new(0)),
            live: Arc::new(AtomicUsize::new(0)),
            worker_count: AtomicCounter::new(),
        }
    }

    fn spawn_worker(&self) {
        let name = format!("{}[{}]-{}", self.prefix, self.stack_size, self.worker_count.next());
        let rx = self.rx.clone();
        let idle = Arc::clone(&self.idle);
        let live = Arc::clone(&self.live);
        live.fetch_add(1, Ordering::SeqCst);
        let mut builder = std::thread::Builder::new().name(name.clone());
        if self.stack_size > 0 {
            builder = builder.stack_size(self.stack_size);
        }
        let worker_live = Arc::clone(&live);
        let spawned = builder.spawn(move || {
            let live = worker_live;
            let _directory = parking::register_current(name, true);
            loop {
                idle.fetch_add(1, Ordering::SeqCst);
                let received = rx.recv_timeout(WORKER_KEEP_ALIVE);
                idle.fetch_sub(1, Ordering::SeqCst);
                match received {
                    Ok(job) => job(),
                    Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => break,
                }
            }
            live.fetch_sub(1, Ordering::SeqCst);
        });
        if spawned.is_err() {
            live.fetch_sub(1, Ordering::SeqCst);
            tracing::warn!("[{}] failed to spawn pool worker", self.prefix);
        }
    }
}

impl CspExecutor for CachedPool {
    fn execute(&self, job: Job, _stack_size: usize) {
        let at_cap = self.max.is_some_and(|m| self.live.load(Ordering::SeqCst) >= m);
        if self.idle.load(Ordering::SeqCst) == 0 && !at_cap {
            self.spawn_worker();
        }
        let guard = self.tx.lock();
        match guard.as_ref() {
            Some(tx) => {
                // unbounded channel: send never blocks
                let _ = tx.send(job);
            }
            None => tracing::warn!("[{}] job submitted after shutdown", self.prefix),
        }
    }

    fn shutdown(&self) {
        self.tx.lock().take();
    }
}

const STACK_BUCKETS: [usize; 5] = [
    1024 << 8,  // 256 KiB
    1024 << 10, // 1 MiB
    1024 << 12, // 4 MiB
    1024 << 14, // 16 MiB
    1024 << 16, // 64 MiB
];

/// Cached pools bucketed by stack size: a job is routed to the smallest
/// bucket that satisfies its hint; hintless jobs go to an unsized pool.
pub struct SizedExecutor {
    pools: Vec<CachedPool>,
    other: CachedPool,
}

impl SizedExecutor {
    pub fn new(max: Option<usize>) -> Self {
        Self {
            pools: STACK_BUCKETS
                .iter()
                .map(|&size| CachedPool::new("csp-pool", size, max))
                .collect(),
            other: CachedPool::new("csp-pool", 0, max),
        }
    }
}

impl CspExecutor for SizedExecutor {
    fn execute(&self, job: Job, stack_size: usize) {
        if stack_size == 0 {
            return self.other.execute(job, 0);
        }
        match self.pools.iter().find(|p| stack_size <= p.stack_size) {
            Some(pool) => pool.execute(job, stack_size),
            None => self.other.execute(job, 0),
        }
    }

    fn shutdown(&self) {
        for pool in &self.pools {
            pool.shutdown();
        }
        self.other.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::latch::CountDownLatch;

    fn run_jobs(executor: &dyn CspExecutor, n: i64) {
        let latch = Arc::new(CountDownLatch::new(n));
        for _ in 0..n {
            let latch = Arc::clone(&latch);
            executor.execute(Box::new(move || latch.count_down()), 0);
        }
        latch.wait();
    }

    #[test]
    fn test_unpooled_runs_jobs() {
        run_jobs(&UnpooledExecutor::new(), 16);
    }

    #[test]
    fn test_cached_pool_runs_and_reuses() {
        let pool = CachedPool::new("test-pool", 0, None);
        run_jobs(&pool, 64);
        assert!(pool.live.load(Ordering::SeqCst) <= 64);
        pool.shutdown();
    }

    #[test]
    fn test_cached_pool_respects_max() {
        let pool = CachedPool::new("capped-pool", 0, Some(2));
        run_jobs(&pool, 32);
        assert!(pool.live.load(Ordering::SeqCst) <= 2);
        pool.shutdown();
    }

    #[test]
    fn test_sized_executor_routes_by_hint() {
        let executor = SizedExecutor::new(None);
        let latch = Arc::new(CountDownLatch::new(3));
        for hint in [0, 4096, usize::MAX] {
            let latch = Arc::clone(&latch);
            executor.execute(Box::new(move || latch.count_down()), hint);
        }
        latch.wait();
        executor.shutdown();
    }
}
