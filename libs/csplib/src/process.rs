// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! The process model
//!
//! A `Proc` is a named run-once unit. Composition is by operator: `p | q`
//! runs both in parallel (`skip()` is the identity), `p >> q` runs them in
//! declared order. `run` executes in the caller's thread; `fork` hands the
//! body to the executor and returns a `Handle` whose one-shot latch is the
//! join point.
//!
//! `Par` outcome reduction: all success is success; stop signals alone
//! reduce to `Stopped`; a single real error propagates as itself; two or
//! more aggregate into `CspError::Par`.

use crate::channel::OutPort;
use crate::error::{CspError, Result};
use crate::latch::CountDownLatch;
use crate::naming::NameGenerator;
use crate::runtime::runtime;
use parking_lot::Mutex;
use std::sync::Arc;

static PROC_NAMES: NameGenerator = NameGenerator::new("Proc");
static ITER_NAMES: NameGenerator = NameGenerator::new("IterToChannel");

type ProcFn = Box<dyn FnOnce() -> Result<()> + Send + 'static>;

enum Body {
    Simple(ProcFn),
    Par(Vec<Proc>),
    Ordered(Vec<Proc>),
    Skip,
}

pub struct Proc {
    name: String,
    stack_size: Option<usize>,
    body: Body,
}

/// A named process wrapping a closure.
pub fn proc(name: impl Into<String>, body: impl FnOnce() -> Result<()> + Send + 'static) -> Proc {
    Proc {
        name: name.into(),
        stack_size: None,
        body: Body::Simple(Box::new(body)),
    }
}

/// An anonymous process (`Proc-{n}`).
pub fn simple(body: impl FnOnce() -> Result<()> + Send + 'static) -> Proc {
    proc(PROC_NAMES.generate(None), body)
}

/// The identity of parallel composition: runs, does nothing, succeeds.
pub fn skip() -> Proc {
    Proc { name: "SKIP".into(), stack_size: None, body: Body::Skip }
}

/// Parallel composition of `procs`.
pub fn par(procs: impl IntoIterator<Item = Proc>) -> Proc {
    let flattened = flatten_par(procs);
    Proc {
        name: "Par".into(),
        stack_size: None,
        body: Body::Par(flattened),
    }
}

/// Sequential composition of `procs`; the first error stops the sequence.
pub fn ordered(procs: impl IntoIterator<Item = Proc>) -> Proc {
    Proc {
        name: "Ordered".into(),
        stack_size: None,
        body: Body::Ordered(procs.into_iter().collect()),
    }
}

/// A process that writes `iter`'s values to `out` in order and closes the
/// port on exhaustion (or when the channel closes underneath it).
pub fn iter_to_channel<T, I, C>(iter: I, out: C) -> Proc
where
    T: Send + 'static,
    I: IntoIterator<Item = T> + Send + 'static,
    I::IntoIter: Send,
    C: OutPort<T> + Send + 'static,
{
    proc(ITER_NAMES.generate(None), move || {
        for value in iter {
            match out.write(value) {
                Ok(()) => {}
                Err(CspError::Closed(_)) => break,
                Err(e) => {
                    out.close_out();
                    return Err(e);
                }
            }
        }
        out.close_out();
        Ok(())
    })
}

fn flatten_par(procs: impl IntoIterator<Item = Proc>) -> Vec<Proc> {
    let mut out = Vec::new();
    for p in procs {
        match p.body {
            Body::Skip => {}
            Body::Par(inner) => out.extend(inner),
            _ => out.push(p),
        }
    }
    out
}

impl Proc {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Stack-size hint for the thread this process forks onto.
    pub fn with_stack_size(mut self, bytes: usize) -> Self {
        self.stack_size = Some(bytes);
        self
    }

    /// Run to completion in the calling thread.
    pub fn run(self) -> Result<()> {
        self.run_body()
    }

    fn run_body(self) -> Result<()> {
        match self.body {
            Body::Skip => Ok(()),
            Body::Simple(f) => {
                // thread renaming is cosmetic: the span carries the name
                let span = tracing::debug_span!("process", name = %self.name);
                let _entered = span.enter();
                f()
            }
            Body::Ordered(procs) => {
                for p in procs {
                    p.run_body()?;
                }
                Ok(())
            }
            Body::Par(procs) => par_run(procs),
        }
    }

    /// Spawn on the executor and return the external reference.
    pub fn fork(self) -> Handle {
        let name = self.name.clone();
        let stack_size = self.stack_size.unwrap_or(0);
        let done = Arc::new(CountDownLatch::new(1));
        let outcome: Arc<Mutex<Option<Result<()>>>> = Arc::new(Mutex::new(None));
        {
            let name = name.clone();
            let done = Arc::clone(&done);
            let outcome = Arc::clone(&outcome);
            runtime().executor().execute(
                Box::new(move || {
                    let result = self.run_body();
                    if let Err(e) = &result {
                        if !e.is_stop() {
                            runtime().report_termination(&name, e);
                        }
                    }
                    *outcome.lock() = Some(result);
                    done.count_down();
                }),
                stack_size,
            );
        }
        Handle { name, done, outcome }
    }
}

/// Fork all but the first process, run the first here, await the latch,
/// then reduce the outcomes.
fn par_run(procs: Vec<Proc>) -> Result<()> {
    let n = procs.len();
    if n == 0 {
        return Ok(());
    }
    let latch = Arc::new(CountDownLatch::new((n - 1) as i64));
    let outcomes: Arc<Mutex<Vec<Option<Result<()>>>>> =
        Arc::new(Mutex::new((0..n - 1).map(|_| None).collect()));

    let mut iter = procs.into_iter();
    let first = match iter.next() {
        Some(p) => p,
        None => return Ok(()),
    };
    for (i, p) in iter.enumerate() {
        let latch = Arc::clone(&latch);
        let outcomes = Arc::clone(&outcomes);
        let stack_size = p.stack_size.unwrap_or(0);
        runtime().executor().execute(
            Box::new(move || {
                let result = p.run_body();
                outcomes.lock()[i] = Some(result);
                latch.count_down();
            }),
            stack_size,
        );
    }

    let mut results = vec![first.run_body()];
    latch.wait();
    results.extend(outcomes.lock().drain(..).map(|r| r.unwrap_or(Ok(()))));
    reduce_outcomes(results)
}

fn reduce_outcomes(results: Vec<Result<()>>) -> Result<()> {
    let mut stops = 0usize;
    let mut errors = Vec::new();
    for result in results {
        match result {
            Ok(()) => {}
            Err(e) if e.is_stop() => stops += 1,
            Err(e) => errors.push(e),
        }
    }
    match errors.len() {
        0 if stops == 0 => Ok(()),
        0 => Err(CspError::Stopped),
        1 => Err(errors.remove(0)),
        _ => Err(CspError::Par(errors)),
    }
}

impl std::ops::BitOr for Proc {
    type Output = Proc;

    /// Parallel composition; flattens nested `Par`s and drops `skip()`s.
    fn bitor(self, rhs: Proc) -> Proc {
        par([self, rhs])
    }
}

impl std::ops::Shr for Proc {
    type Output = Proc;

    /// Sequential composition.
    fn shr(self, rhs: Proc) -> Proc {
        match (self.body, rhs.body) {
            (Body::Ordered(mut a), Body::Ordered(b)) => {
                a.extend(b);
                ordered(a)
            }
            (Body::Ordered(mut a), rb) => {
                a.push(Proc { name: rhs.name, stack_size: rhs.stack_size, body: rb });
                ordered(a)
            }
            (lb, Body::Ordered(b)) => {
                let mut a = vec![Proc { name: self.name, stack_size: self.stack_size, body: lb }];
                a.extend(b);
                ordered(a)
            }
            (lb, rb) => ordered([
                Proc { name: self.name, stack_size: self.stack_size, body: lb },
                Proc { name: rhs.name, stack_size: rhs.stack_size, body: rb },
            ]),
        }
    }
}

/// External reference to a forked process: its name, a one-shot termination
/// latch, and the recorded outcome.
pub struct Handle {
    name: String,
    done: Arc<CountDownLatch>,
    outcome: Arc<Mutex<Option<Result<()>>>>,
}

impl Handle {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Block until the process terminates and return its outcome. Later
    /// joins return `Ok(())`.
    pub fn join(&self) -> Result<()> {
        self.done.wait();
        self.outcome.lock().take().unwrap_or(Ok(()))
    }

    pub fn terminated(&self) -> bool {
        self.done.count() <= 0
    }

    /// The recorded failure, if the process has terminated with one.
    /// Non-blocking; consumes the outcome.
    pub fn exception(&self) -> Option<CspError> {
        match self.outcome.lock().take() {
            Some(Err(e)) => Some(e),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{InPort, OneOne};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_simple_runs_in_caller() {
        let hit = Arc::new(AtomicUsize::new(0));
        let h = Arc::clone(&hit);
        proc("pass", move || {
            h.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .run()
        .unwrap();
        assert_eq!(hit.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_parallel_rendezvous() {
        let c = OneOne::new();
        let total = Arc::new(AtomicUsize::new(0));
        let reader = {
            let c = c.clone();
            let total = Arc::clone(&total);
            proc("read", move || {
                total.fetch_add(c.read()?, Ordering::SeqCst);
                total.fetch_add(c.read()?, Ordering::SeqCst);
                Ok(())
            })
        };
        let writer = {
            let c = c.clone();
            proc("write", move || {
                c.write(123)?;
                c.write(111)?;
                Ok(())
            })
        };
        (reader | writer).run().unwrap();
        assert_eq!(total.load(Ordering::SeqCst), 234);
    }

    #[test]
    fn test_skip_is_identity_of_par() {
        let c = OneOne::new();
        let writer = {
            let c = c.clone();
            proc("w", move || c.write(1))
        };
        let reader = {
            let c = c.clone();
            proc("r", move || c.read().map(|_| ()))
        };
        (skip() | writer | skip() | reader | skip()).run().unwrap();
    }

    #[test]
    fn test_ordered_runs_in_declared_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mk = |tag: &'static str, log: &Arc<Mutex<Vec<&'static str>>>| {
            let log = Arc::clone(log);
            proc(tag, move || {
                log.lock().push(tag);
                Ok(())
            })
        };
        (mk("a", &log) >> mk("b", &log) >> mk("c", &log)).run().unwrap();
        assert_eq!(*log.lock(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_ordered_propagates_first_error() {
        let ran_third = Arc::new(AtomicUsize::new(0));
        let r = Arc::clone(&ran_third);
        let result = (proc("ok", || Ok(()))
            >> proc("boom", || Err(anyhow::anyhow!("boom").into()))
            >> proc("after", move || {
                r.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }))
        .run();
        assert!(matches!(result, Err(CspError::Other(_))));
        assert_eq!(ran_third.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_par_reduces_stops_to_stopped() {
        let result = (proc("fine", || Ok(())) | proc("stopping", || Err(CspError::Stopped))).run();
        assert!(matches!(result, Err(CspError::Stopped)));
    }

    #[test]
    fn test_par_single_error_propagates_as_itself() {
        let result = (proc("fine", || Ok(()))
            | proc("stopping", || Err(CspError::Stopped))
            | proc("boom", || Err(anyhow::anyhow!("boom").into())))
        .run();
        assert!(matches!(result, Err(CspError::Other(_))));
    }

    #[test]
    fn test_par_aggregates_multiple_errors() {
        let result = (proc("boom1", || Err(anyhow::anyhow!("one").into()))
            | proc("boom2", || Err(anyhow::anyhow!("two").into())))
        .run();
        match result {
            Err(CspError::Par(errors)) => assert_eq!(errors.len(), 2),
            other => panic!("expected Par error, got {other:?}"),
        }
    }

    #[test]
    fn test_fork_join_and_exception() {
        let handle = proc("fails", || Err(CspError::Crashed)).fork();
        assert!(matches!(handle.join(), Err(CspError::Crashed)));
        assert!(handle.terminated());
        assert!(handle.join().is_ok());
    }

    #[test]
    fn test_iter_to_channel_round_trip() {
        let c = OneOne::new();
        let producer = iter_to_channel(0..100, c.clone());
        let collected = Arc::new(Mutex::new(Vec::new()));
        let consumer = {
            let c = c.clone();
            let collected = Arc::clone(&collected);
            proc("collect", move || {
                loop {
                    match c.read() {
                        Ok(v) => collected.lock().push(v),
                        Err(CspError::Closed(_)) => return Ok(()),
                        Err(e) => return Err(e),
                    }
                }
            })
        };
        (producer | consumer).run().unwrap();
        assert_eq!(*collected.lock(), (0..100).collect::<Vec<_>>());
        assert!(!c.can_input());
    }
}
