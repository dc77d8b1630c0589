//! Batch execution of independent work units.
//!
//! `Pooled(n)` runs units on a dedicated Rayon pool of `n` threads while the
//! caller drains a result channel in completion order. `Inline` runs them one
//! after another on the caller's thread. A failing or panicking unit is logged
//! and recorded in the report; it never affects its siblings.
use serde::Serialize;
use std::fmt::Display;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::mpsc;

/// How a batch is scheduled.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExecutionMode {
    /// Sequentially on the calling thread.
    Inline,
    /// On a fresh pool with this many workers (0 lets Rayon decide).
    Pooled(usize),
}

impl ExecutionMode {
    /// `None` or `Some(0..=1)` → `Inline`, otherwise a pool of that size.
    pub fn from_workers(workers: Option<usize>) -> Self {
        match workers {
            Some(n) if n > 1 => Self::Pooled(n),
            _ => Self::Inline,
        }
    }
}

/// One independent item of work. Consumed by exactly one worker.
#[derive(Debug)]
pub struct WorkUnit<T> {
    pub id: String,
    pub payload: T,
}

impl<T> WorkUnit<T> {
    pub fn new(id: impl Into<String>, payload: T) -> Self {
        Self {
            id: id.into(),
            payload,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct UnitFailure {
    pub id: String,
    pub message: String,
}

/// Results of a batch in completion order plus the failed units.
#[derive(Clone, Debug, Serialize)]
pub struct BatchReport<R> {
    pub completed: Vec<R>,
    pub failures: Vec<UnitFailure>,
}

impl<R> Default for BatchReport<R> {
    fn default() -> Self {
        Self {
            completed: Vec::new(),
            failures: Vec::new(),
        }
    }
}

impl<R> BatchReport<R> {
    pub fn succeeded(&self) -> usize {
        self.completed.len()
    }

    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, R> {
        self.completed.iter()
    }
}

impl<R> IntoIterator for BatchReport<R> {
    type Item = R;
    type IntoIter = std::vec::IntoIter<R>;

    fn into_iter(self) -> Self::IntoIter {
        self.completed.into_iter()
    }
}

impl<'a, R> IntoIterator for &'a BatchReport<R> {
    type Item = &'a R;
    type IntoIter = std::slice::Iter<'a, R>;

    fn into_iter(self) -> Self::IntoIter {
        self.completed.iter()
    }
}

#[derive(Clone, Debug)]
pub struct BatchExecutor {
    mode: ExecutionMode,
}

impl BatchExecutor {
    pub fn new(mode: ExecutionMode) -> Self {
        Self { mode }
    }

    pub fn inline() -> Self {
        Self::new(ExecutionMode::Inline)
    }

    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    /// Run `task` once per unit and collect the outcomes.
    pub fn run<T, R, E, F>(&self, units: Vec<WorkUnit<T>>, task: F) -> BatchReport<R>
    where
        T: Send,
        R: Send,
        E: Display,
        F: Fn(&str, T) -> Result<R, E> + Sync,
    {
        let total = units.len();
        let report = match self.effective_mode() {
            ExecutionMode::Inline => run_inline(units, &task),
            ExecutionMode::Pooled(n) => run_pooled(units, &task, n),
        };
        log::info!(
            "batch finished: {} of {} units succeeded, {} failed",
            report.succeeded(),
            total,
            report.failed()
        );
        report
    }

    fn effective_mode(&self) -> ExecutionMode {
        match self.mode {
            ExecutionMode::Pooled(_) if rayon::current_thread_index().is_some() => {
                log::warn!("pooled execution requested from inside a worker; running inline");
                ExecutionMode::Inline
            }
            mode => mode,
        }
    }
}

fn run_inline<T, R, E, F>(units: Vec<WorkUnit<T>>, task: &F) -> BatchReport<R>
where
    E: Display,
    F: Fn(&str, T) -> Result<R, E>,
{
    let mut report = BatchReport::default();
    for unit in units {
        let outcome = run_unit(task, &unit.id, unit.payload);
        record(&mut report, unit.id, outcome);
    }
    report
}

fn run_pooled<T, R, E, F>(units: Vec<WorkUnit<T>>, task: &F, workers: usize) -> BatchReport<R>
where
    T: Send,
    R: Send,
    E: Display,
    F: Fn(&str, T) -> Result<R, E> + Sync,
{
    let pool = match rayon::ThreadPoolBuilder::new().num_threads(workers).build() {
        Ok(pool) => pool,
        Err(err) => {
            log::warn!("failed to build a pool of {workers} workers ({err}); running inline");
            return run_inline(units, task);
        }
    };

    let (tx, rx) = mpsc::channel::<(String, Result<R, String>)>();
    let mut report = BatchReport::default();
    std::thread::scope(|s| {
        let pool = &pool;
        s.spawn(move || {
            pool.scope(|scope| {
                for unit in units {
                    let tx = tx.clone();
                    scope.spawn(move |_| {
                        let outcome = run_unit(task, &unit.id, unit.payload);
                        // The receiver outlives every sender.
                        let _ = tx.send((unit.id, outcome));
                    });
                }
            });
        });
        for (id, outcome) in rx.iter() {
            record(&mut report, id, outcome);
        }
    });
    report
}

fn run_unit<T, R, E, F>(task: &F, id: &str, payload: T) -> Result<R, String>
where
    E: Display,
    F: Fn(&str, T) -> Result<R, E>,
{
    match catch_unwind(AssertUnwindSafe(|| task(id, payload))) {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(err.to_string()),
        Err(panic) => Err(format!("panicked: {}", panic_message(panic.as_ref()))),
    }
}

fn record<R>(report: &mut BatchReport<R>, id: String, outcome: Result<R, String>) {
    match outcome {
        Ok(value) => report.completed.push(value),
        Err(message) => {
            log::error!("unit {id} failed: {message}");
            report.failures.push(UnitFailure { id, message });
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
