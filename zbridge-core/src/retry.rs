//! Bounded retry with fixed or exponential backoff.
//!
//! Used to reacquire volatile resources, most importantly messaging sockets
//! that are closed and reopened after a liveness violation. Closing a bound
//! socket can take a moment before the address is free again, so every
//! attempt is preceded by a backoff wait.

use std::fmt;
use std::thread;
use std::time::Duration;

use crate::shutdown::ShutdownSignal;

/// Retry policy: how many attempts, and how long to wait before each one.
///
/// # Example
///
/// ```rust
/// use zbridge_core::retry::RetryPolicy;
/// use std::time::Duration;
///
/// let policy = RetryPolicy::fixed(3, Duration::from_millis(1));
/// let mut calls = 0;
/// let value = policy
///     .retry(|_attempt| {
///         calls += 1;
///         if calls < 2 { Err("busy") } else { Ok(42) }
///     })
///     .unwrap();
/// assert_eq!(value, 42);
/// assert_eq!(calls, 2);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of attempts (at least one attempt is always made)
    pub attempts: u32,
    /// Wait before the first attempt
    pub interval: Duration,
    /// Upper bound for exponential backoff; `Duration::ZERO` means fixed interval
    pub max_interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::fixed(3, Duration::from_millis(1))
    }
}

impl RetryPolicy {
    /// Fixed backoff: the same wait before every attempt.
    pub const fn fixed(attempts: u32, interval: Duration) -> Self {
        Self {
            attempts,
            interval,
            max_interval: Duration::ZERO,
        }
    }

    /// Exponential backoff doubling from `interval` up to `max_interval`.
    pub const fn exponential(attempts: u32, interval: Duration, max_interval: Duration) -> Self {
        Self {
            attempts,
            interval,
            max_interval,
        }
    }

    /// Run `op` until it succeeds or the attempts run out.
    ///
    /// `op` receives the 1-based attempt number.
    pub fn retry<T, E, F>(&self, op: F) -> Result<T, RetryError<E>>
    where
        F: FnMut(u32) -> Result<T, E>,
    {
        self.run(op, |delay| {
            thread::sleep(delay);
            true
        })
    }

    /// Like [`retry`](Self::retry), but every backoff wait is interrupted by
    /// the shutdown broadcast.
    pub fn retry_until<T, E, F>(&self, shutdown: &ShutdownSignal, op: F) -> Result<T, RetryError<E>>
    where
        F: FnMut(u32) -> Result<T, E>,
    {
        self.run(op, |delay| !shutdown.wait_timeout(delay))
    }

    fn run<T, E, F, W>(&self, mut op: F, mut wait: W) -> Result<T, RetryError<E>>
    where
        F: FnMut(u32) -> Result<T, E>,
        W: FnMut(Duration) -> bool,
    {
        let attempts = self.attempts.max(1);
        let mut backoff = Backoff::new(self);
        let mut last = None;

        for attempt in 1..=attempts {
            if !wait(backoff.next_delay()) {
                return Err(RetryError::Cancelled);
            }
            match op(attempt) {
                Ok(value) => return Ok(value),
                Err(e) => last = Some(e),
            }
        }

        match last {
            Some(last) => Err(RetryError::Exhausted { attempts, last }),
            None => Err(RetryError::Cancelled),
        }
    }
}

/// Backoff state tracker for a single retry sequence.
///
/// Tracks the number of attempts and computes the wait before each one.
#[derive(Debug, Clone)]
pub struct Backoff {
    base_interval: Duration,
    max_interval: Duration,
    attempt: u32,
    current_interval: Duration,
}

impl Backoff {
    pub const fn new(policy: &RetryPolicy) -> Self {
        Self {
            base_interval: policy.interval,
            max_interval: policy.max_interval,
            attempt: 0,
            current_interval: policy.interval,
        }
    }

    /// Get the delay for the next attempt.
    ///
    /// With a zero `max_interval` the delay stays fixed; otherwise it doubles
    /// with each attempt until it reaches `max_interval`.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current_interval;
        self.attempt += 1;

        if !self.max_interval.is_zero() {
            self.current_interval = self.base_interval * (1_u32 << self.attempt.min(10));
            if self.current_interval > self.max_interval {
                self.current_interval = self.max_interval;
            }
        }

        delay
    }

    #[inline]
    #[must_use]
    pub const fn attempt(&self) -> u32 {
        self.attempt
    }
}

/// Error type for retry sequences.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryError<E> {
    /// Every attempt failed; carries the last failure
    Exhausted { attempts: u32, last: E },
    /// Shutdown fired during a backoff wait
    Cancelled,
}

impl<E: fmt::Display> fmt::Display for RetryError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exhausted { attempts, last } => {
                write!(f, "gave up after {attempts} attempts: {last}")
            }
            Self::Cancelled => write!(f, "retry cancelled"),
        }
    }
}

impl<E: fmt::Debug + fmt::Display> std::error::Error for RetryError<E> {}
