//! Polling loop that mirrors a template directory into a JSON snapshot.
//!
//! Each poll runs [`DirectoryIndex::load`] to completion, rewrites the
//! snapshot if anything changed, and only then sleeps. Polls never overlap.
//! A failed poll is logged and the loop carries on with the next one.

use anyhow::Result;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use crate::directory::DirectoryIndex;
use crate::signal::ShutdownHandler;
use crate::snapshot;

/// Granularity at which a sleeping watcher notices a shutdown request.
const SHUTDOWN_CHECK: Duration = Duration::from_millis(50);

/// Why the loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchExit {
    /// The configured number of polls ran.
    Completed,
    /// A shutdown was requested.
    Interrupted,
}

/// Counters for a finished watch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchReport {
    /// Polls started.
    pub polls: usize,
    /// Polls that failed.
    pub failures: usize,
    /// Snapshot writes.
    pub writes: usize,
    /// Why the loop ended.
    pub exit: WatchExit,
}

/// Polls a [`DirectoryIndex`] on a fixed interval.
#[derive(Debug)]
pub struct Watcher {
    output: PathBuf,
    interval: Duration,
    max_polls: Option<usize>,
}

impl Watcher {
    /// Watch into `output`, sleeping `interval` between polls.
    #[must_use]
    pub fn new(output: PathBuf, interval: Duration) -> Self {
        Self {
            output,
            interval,
            max_polls: None,
        }
    }

    /// Stop after `polls` polls.
    #[must_use]
    pub fn with_max_polls(mut self, polls: usize) -> Self {
        self.max_polls = Some(polls);
        self
    }

    /// Run until `max_polls` is reached or `shutdown` is requested.
    ///
    /// # Errors
    ///
    /// Load failures are logged, not returned. Only a failure to write the
    /// snapshot ends the loop with an error.
    pub fn run(&self, index: &mut DirectoryIndex, shutdown: &ShutdownHandler) -> Result<WatchReport> {
        let mut report = WatchReport {
            polls: 0,
            failures: 0,
            writes: 0,
            exit: WatchExit::Completed,
        };
        log::info!(
            "Watching {} every {:?}",
            index.root().display(),
            self.interval
        );

        loop {
            if shutdown.is_shutdown_requested() {
                report.exit = WatchExit::Interrupted;
                break;
            }
            if self.max_polls.is_some_and(|max| report.polls >= max) {
                break;
            }

            report.polls += 1;
            log::debug!("Poll {}", report.polls);
            match index.load() {
                Ok(summary) => {
                    if summary.changed() || report.writes == 0 {
                        snapshot::write_snapshot(&self.output, index.cache())?;
                        report.writes += 1;
                        log::info!("Updated {}", self.output.display());
                    }
                }
                Err(e) => {
                    report.failures += 1;
                    log::warn!("Poll {} failed: {}", report.polls, e);
                }
            }

            if self.max_polls.is_some_and(|max| report.polls >= max) {
                break;
            }
            sleep_unless_shutdown(self.interval, shutdown);
        }

        log::info!(
            "Stopped after {} polls ({} failed, {} snapshot writes)",
            report.polls,
            report.failures,
            report.writes
        );
        Ok(report)
    }
}

fn sleep_unless_shutdown(interval: Duration, shutdown: &ShutdownHandler) {
    let deadline = Instant::now() + interval;
    loop {
        if shutdown.is_shutdown_requested() {
            return;
        }
        let now = Instant::now();
        if now >= deadline {
            return;
        }
        std::thread::sleep((deadline - now).min(SHUTDOWN_CHECK));
    }
}
