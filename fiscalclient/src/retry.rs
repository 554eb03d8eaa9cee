//! Politique de retry HTTP avec backoff exponentiel
//!
//! Seuls les statuts HTTP transitoires sont rejoués. Les erreurs réseau et les
//! autres statuts sont renvoyés immédiatement.

use crate::error::{FiscalError, Result};
use std::thread;
use std::time::Duration;
use tracing::{error, warn};

/// Upper bound of one backoff pause
pub const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// Status and body of one HTTP exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpReply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Retry policy mounted for every host
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total number of attempts, the first one included
    pub max_attempts: u32,
    /// Delay factor in seconds: `factor * 2^(n-1)` after the n-th attempt
    pub backoff_factor: f64,
    pub retryable_statuses: Vec<u16>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_factor: 0.1,
            retryable_statuses: vec![500, 502, 503, 504],
        }
    }
}

impl RetryPolicy {
    pub fn is_retryable(&self, status: u16) -> bool {
        self.retryable_statuses.contains(&status)
    }

    /// Rejects a backoff factor that is negative, NaN or infinite
    pub fn validate(&self) -> Result<()> {
        if !self.backoff_factor.is_finite() || self.backoff_factor < 0.0 {
            return Err(FiscalError::configuration(format!(
                "retry backoff factor must be a finite non-negative number, got {}",
                self.backoff_factor
            )));
        }
        Ok(())
    }

    /// Pause after the `attempt`-th failed attempt (1-based), capped at [`MAX_BACKOFF`]
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16) as i32;
        let secs = self.backoff_factor * 2f64.powi(exponent);
        if secs.is_nan() || secs <= 0.0 {
            return Duration::ZERO;
        }
        Duration::try_from_secs_f64(secs)
            .unwrap_or(MAX_BACKOFF)
            .min(MAX_BACKOFF)
    }

    /// Runs `send` until it returns a non-retryable reply
    ///
    /// `send` receives the 1-based attempt number. Network errors are
    /// returned as is. A non-success reply, retryable or not, ends as
    /// [`FiscalError::HttpStatus`] once no attempt is left.
    pub fn run<F>(&self, url: &str, mut send: F) -> Result<HttpReply>
    where
        F: FnMut(u32) -> Result<HttpReply>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            let reply = send(attempt)?;
            if reply.is_success() {
                return Ok(reply);
            }
            if !self.is_retryable(reply.status) || attempt >= max_attempts {
                error!(
                    url,
                    status = reply.status,
                    attempts = attempt,
                    "❌ HTTP error response: {}",
                    String::from_utf8_lossy(&reply.body)
                );
                return Err(FiscalError::HttpStatus {
                    url: url.to_string(),
                    status: reply.status,
                    attempts: attempt,
                });
            }

            let delay = self.backoff(attempt);
            warn!(
                attempt,
                max_attempts,
                status = reply.status,
                "Fiscal web service answered a transient status, retrying in {delay:?}"
            );
            thread::sleep(delay);
            attempt += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quick() -> RetryPolicy {
        RetryPolicy {
            backoff_factor: 0.0,
            ..RetryPolicy::default()
        }
    }

    fn scripted(statuses: &[u16]) -> impl FnMut(u32) -> Result<HttpReply> + '_ {
        move |attempt| {
            Ok(HttpReply {
                status: statuses[(attempt - 1) as usize],
                body: b"<ok/>".to_vec(),
            })
        }
    }

    #[test]
    fn test_two_transient_failures_then_success() {
        let mut calls = 0;
        let mut send = scripted(&[500, 500, 200]);
        let reply = quick()
            .run("https://sefaz/ws", |attempt| {
                calls += 1;
                send(attempt)
            })
            .unwrap();

        assert_eq!(calls, 3);
        assert_eq!(reply.status, 200);
    }

    #[test]
    fn test_consecutive_failures_exhaust_attempts() {
        let mut calls = 0;
        let mut send = scripted(&[500, 500, 500, 500]);
        let err = quick()
            .run("https://sefaz/ws", |attempt| {
                calls += 1;
                send(attempt)
            })
            .unwrap_err();

        assert_eq!(calls, 3);
        assert!(err.is_transport_error());
        assert!(matches!(
            err,
            FiscalError::HttpStatus {
                status: 500,
                attempts: 3,
                ..
            }
        ));
    }

    #[test]
    fn test_non_retryable_status_fails_at_once() {
        let mut calls = 0;
        let mut send = scripted(&[404, 200]);
        let err = quick()
            .run("https://sefaz/ws", |attempt| {
                calls += 1;
                send(attempt)
            })
            .unwrap_err();

        assert_eq!(calls, 1);
        assert!(matches!(err, FiscalError::HttpStatus { status: 404, .. }));
    }

    #[test]
    fn test_backoff_doubles() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff(1), Duration::from_millis(100));
        assert_eq!(policy.backoff(2), Duration::from_millis(200));
        assert_eq!(policy.backoff(3), Duration::from_millis(400));
    }

    #[test]
    fn test_backoff_is_capped() {
        let huge = RetryPolicy {
            backoff_factor: 1e300,
            ..RetryPolicy::default()
        };
        assert_eq!(huge.backoff(1), MAX_BACKOFF);
        assert_eq!(huge.backoff(u32::MAX), MAX_BACKOFF);

        let negative = RetryPolicy {
            backoff_factor: -1.0,
            ..RetryPolicy::default()
        };
        assert_eq!(negative.backoff(2), Duration::ZERO);
    }

    #[test]
    fn test_invalid_backoff_factor_is_rejected() {
        assert!(RetryPolicy::default().validate().is_ok());
        assert!(quick().validate().is_ok());

        for factor in [-0.5, f64::NAN, f64::INFINITY] {
            let policy = RetryPolicy {
                backoff_factor: factor,
                ..RetryPolicy::default()
            };
            let err = policy.validate().unwrap_err();
            assert!(err.is_configuration_error(), "{factor}");
        }
    }
}
