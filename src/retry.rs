//! Failure handling for disk and parse errors.
//!
//! Each load or save is one attempt. When an attempt fails with a transient
//! error the policy decides between returning it and trying again. Errors
//! that are not transient (bad key paths, wrong container types) always
//! return on the spot.

use crate::error::{Result, StoreError};
use std::thread;
use std::time::Duration;

/// What to do when a load or save fails.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RetryPolicy {
    /// Return the first failure to the caller.
    #[default]
    Propagate,

    /// Retry until an attempt succeeds, with no delay and no cap.
    ///
    /// A filesystem that stays broken keeps the calling thread spinning.
    Unbounded,

    /// Retry up to `max_attempts` attempts in total, sleeping `backoff`
    /// between them, then return the last failure.
    Bounded {
        max_attempts: u32,
        backoff: Duration,
    },
}

impl RetryPolicy {
    /// Whether transient failures are hidden from the caller, at least for
    /// some attempts.
    pub fn suppresses_errors(&self) -> bool {
        !matches!(self, RetryPolicy::Propagate)
    }

    /// Run `attempt` until it succeeds or the policy gives up.
    ///
    /// `attempt` receives the 1-based attempt number.
    pub(crate) fn run<T>(&self, mut attempt: impl FnMut(u32) -> Result<T>) -> Result<T> {
        let mut attempts: u32 = 0;
        loop {
            attempts = attempts.saturating_add(1);
            let err = match attempt(attempts) {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            if !err.is_transient() {
                return Err(err);
            }

            match *self {
                RetryPolicy::Propagate => return Err(err),
                RetryPolicy::Unbounded => {}
                RetryPolicy::Bounded {
                    max_attempts,
                    backoff,
                } => {
                    if attempts >= max_attempts.max(1) {
                        return Err(err);
                    }
                    if !backoff.is_zero() {
                        thread::sleep(backoff);
                    }
                }
            }
        }
    }
}

impl From<bool> for RetryPolicy {
    /// Maps the `disableGetSetErrors` switch onto a policy.
    fn from(suppress: bool) -> Self {
        if suppress {
            RetryPolicy::Unbounded
        } else {
            RetryPolicy::Propagate
        }
    }
}
