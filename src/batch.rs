//! Parallel fan-out/fan-in for per-file work.
//!
//! # Overview
//!
//! [`BatchExecutor`] runs one fallible operation over a set of independent
//! units, all at once, and completes exactly once after every unit has
//! finished. It is the only place in the crate that spawns work.
//!
//! # Completion rules
//!
//! - An empty batch succeeds immediately.
//! - If every unit succeeds, the batch succeeds once the last one finishes.
//! - If any unit fails, the batch reports the first failure observed. The
//!   remaining units are not cancelled; their failures are logged and dropped.
//!
//! # Example
//!
//! ```
//! use template_dir::batch::BatchExecutor;
//!
//! let executor = BatchExecutor::new();
//! let mut numbers = vec![1, 2, 3];
//! let result: Result<usize, String> = executor.run(numbers.iter_mut(), |n| {
//!     *n *= 10;
//!     Ok(())
//! });
//!
//! assert_eq!(result, Ok(3));
//! assert_eq!(numbers, vec![10, 20, 30]);
//! ```

use std::fmt::Display;
use std::sync::{Mutex, PoisonError};

use rayon::{Scope, ThreadPool};

/// Runs per-unit operations concurrently on a rayon pool.
///
/// By default work goes to rayon's global pool with no cap of its own. A
/// dedicated pool can be requested with [`BatchExecutor::with_threads`].
#[derive(Debug, Default)]
pub struct BatchExecutor {
    pool: Option<ThreadPool>,
}

impl BatchExecutor {
    /// Create an executor backed by the global rayon pool.
    #[must_use]
    pub fn new() -> Self {
        Self { pool: None }
    }

    /// Create an executor backed by a dedicated pool of `threads` workers.
    ///
    /// Falls back to the global pool if the dedicated pool cannot be built.
    #[must_use]
    pub fn with_threads(threads: usize) -> Self {
        match rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|idx| format!("template-io-{idx}"))
            .build()
        {
            Ok(pool) => Self { pool: Some(pool) },
            Err(e) => {
                log::warn!(
                    "Failed to create I/O pool with {} threads, using global pool: {}",
                    threads,
                    e
                );
                Self { pool: None }
            }
        }
    }

    /// Build an executor from an optional thread cap.
    #[must_use]
    pub fn from_threads(threads: Option<usize>) -> Self {
        match threads {
            Some(n) if n > 0 => Self::with_threads(n),
            _ => Self::new(),
        }
    }

    /// Number of threads work can be spread over.
    #[must_use]
    pub fn threads(&self) -> usize {
        self.pool
            .as_ref()
            .map_or_else(rayon::current_num_threads, ThreadPool::current_num_threads)
    }

    /// Run `op` once per unit, concurrently, and wait for all of them.
    ///
    /// Returns the number of units processed, or the first error observed.
    ///
    /// # Errors
    ///
    /// Returns the first error any unit produced. Every unit still runs.
    pub fn run<I, T, E, F>(&self, units: I, op: F) -> Result<usize, E>
    where
        I: IntoIterator<Item = T>,
        T: Send,
        E: Send + Display,
        F: Fn(T) -> Result<(), E> + Sync,
    {
        let units: Vec<T> = units.into_iter().collect();
        let total = units.len();
        if total == 0 {
            return Ok(0);
        }

        let first_error: Mutex<Option<E>> = Mutex::new(None);
        let op = &op;
        let slot = &first_error;

        self.scope(move |s| {
            for unit in units {
                s.spawn(move |_| {
                    if let Err(e) = op(unit) {
                        let mut guard = slot.lock().unwrap_or_else(PoisonError::into_inner);
                        if guard.is_none() {
                            *guard = Some(e);
                        } else {
                            log::warn!("Additional batch failure: {}", e);
                        }
                    }
                });
            }
        });

        match first_error
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
        {
            Some(e) => Err(e),
            None => Ok(total),
        }
    }

    /// Evaluate `pred` once per unit, concurrently, and return the units it
    /// selected.
    ///
    /// Selection is a value, never an error. Order of the result is not
    /// specified.
    pub fn select<I, T, F>(&self, units: I, pred: F) -> Vec<T>
    where
        I: IntoIterator<Item = T>,
        T: Send,
        F: Fn(&T) -> bool + Sync,
    {
        let units: Vec<T> = units.into_iter().collect();
        if units.is_empty() {
            return Vec::new();
        }

        let selected: Mutex<Vec<T>> = Mutex::new(Vec::new());
        let pred = &pred;
        let out = &selected;

        self.scope(move |s| {
            for unit in units {
                s.spawn(move |_| {
                    if pred(&unit) {
                        out.lock()
                            .unwrap_or_else(PoisonError::into_inner)
                            .push(unit);
                    }
                });
            }
        });

        selected.into_inner().unwrap_or_else(PoisonError::into_inner)
    }

    fn scope<'scope, OP>(&self, op: OP)
    where
        OP: FnOnce(&Scope<'scope>) + Send,
    {
        match &self.pool {
            Some(pool) => pool.scope(op),
            None => rayon::scope(op),
        }
    }
}
