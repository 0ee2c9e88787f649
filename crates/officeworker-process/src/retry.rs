//! Bounded polling

use std::time::Duration;

use tokio::time::{sleep, Instant};

use crate::error::{ProcessError, Result};

/// Outcome of a single failed poll attempt
#[derive(Debug)]
pub enum AttemptError {
    /// Condition not met yet; try again after the interval
    Temporary,
    /// Give up immediately and surface the error
    Fatal(ProcessError),
}

impl From<ProcessError> for AttemptError {
    fn from(err: ProcessError) -> Self {
        AttemptError::Fatal(err)
    }
}

/// Interval and timeout governing one poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub interval: Duration,
    pub timeout: Duration,
    /// Wait before the first attempt; counts toward the timeout
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self {
            interval,
            timeout,
            delay: Duration::ZERO,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Run `attempt` until it succeeds, fails fatally, or the timeout elapses
    ///
    /// `attempt` is never invoked once more than `timeout` has passed since
    /// the poll started.
    pub async fn execute<T, F>(&self, mut attempt: F) -> Result<T>
    where
        F: FnMut() -> std::result::Result<T, AttemptError>,
    {
        let start = Instant::now();
        if !self.delay.is_zero() {
            sleep(self.delay).await;
        }

        loop {
            if start.elapsed() > self.timeout {
                return Err(ProcessError::RetryTimeout {
                    elapsed: start.elapsed(),
                });
            }

            match attempt() {
                Ok(value) => return Ok(value),
                Err(AttemptError::Fatal(err)) => return Err(err),
                Err(AttemptError::Temporary) => sleep(self.interval).await,
            }
        }
    }
}
