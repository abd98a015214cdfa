//! Bounded retry for pipeline stages.
//!
//! A stage reports either a retryable failure (flaky network, flaky build
//! infrastructure) or a fatal one. Retryable failures are re-attempted
//! after a fixed delay up to a fixed budget; exhausting the budget aborts
//! the run. Deterministic failures are retried identically, which wastes
//! attempts but keeps the policy simple.

use anyhow::{bail, Result};
use std::thread;
use std::time::Duration;

/// How a stage failed.
#[derive(Debug)]
pub enum StageError {
    /// Worth re-attempting after a delay.
    Retryable(anyhow::Error),
    /// Abort the run immediately, no retry.
    Fatal(anyhow::Error),
}

/// Shorthand for marking a stage result retryable.
pub fn retryable<T>(result: Result<T>) -> Result<T, StageError> {
    result.map_err(StageError::Retryable)
}

/// Shorthand for marking a stage result fatal. For failures that repeat
/// identically on every attempt, like a required tool missing from PATH.
pub fn fatal<T>(result: Result<T>) -> Result<T, StageError> {
    result.map_err(StageError::Fatal)
}

/// Fixed-budget, fixed-interval retry policy.
#[derive(Debug, Clone)]
pub struct Retrier {
    pub max_retries: u32,
    pub interval: Duration,
}

impl Default for Retrier {
    fn default() -> Self {
        Retrier {
            max_retries: 3,
            interval: Duration::from_secs(10),
        }
    }
}

impl Retrier {
    /// Run `stage` until it succeeds, fails fatally, or the retry budget
    /// is exhausted.
    pub fn run<F>(&self, name: &str, mut stage: F) -> Result<()>
    where
        F: FnMut() -> Result<(), StageError>,
    {
        let mut nb_retries = 0;
        loop {
            match stage() {
                Ok(()) => return Ok(()),
                Err(StageError::Fatal(error)) => {
                    return Err(error.context(format!("{name} failed")));
                }
                Err(StageError::Retryable(error)) => {
                    nb_retries += 1;
                    eprintln!("ERROR: {error:#} Retry {nb_retries}.");
                    if nb_retries > self.max_retries {
                        bail!(
                            "{}: number of retries exceeded ({}). Aborting.",
                            name,
                            self.max_retries
                        );
                    }
                    thread::sleep(self.interval);
                }
            }
        }
    }
}
