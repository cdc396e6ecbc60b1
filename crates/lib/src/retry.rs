//! Fixed-delay retry: rerun an async operation until it succeeds or the attempt cap is reached.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

/// Attempt cap and constant pause between attempts (no backoff growth, no jitter).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first; values below 1 are treated as 1.
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            delay: Duration::from_millis(1000),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self { max_attempts, delay }
    }

    /// Run `op` (given the 1-based attempt number) until it returns Ok. Every error is retried;
    /// the last one is returned once attempts are exhausted.
    pub async fn run<T, E, F, Fut>(&self, label: &str, mut op: F) -> Result<T, E>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < max_attempts => {
                    log::warn!(
                        "{}: attempt {}/{} failed: {}; retrying in {:?}",
                        label,
                        attempt,
                        max_attempts,
                        e,
                        self.delay
                    );
                    tokio::time::sleep(self.delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    log::error!("{}: giving up after {} attempt(s): {}", label, attempt, e);
                    return Err(e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn quick(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(max_attempts, Duration::from_millis(1))
    }

    #[tokio::test]
    async fn returns_first_success_without_retrying() {
        let calls = AtomicU32::new(0);
        let out: Result<u32, String> = quick(5)
            .run("ok", |n| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move { Ok(n) }
            })
            .await;
        assert_eq!(out, Ok(1));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_until_success() {
        let out: Result<u32, String> = quick(5)
            .run("flaky", |n| async move {
                if n < 3 {
                    Err(format!("boom {}", n))
                } else {
                    Ok(n)
                }
            })
            .await;
        assert_eq!(out, Ok(3));
    }

    #[tokio::test]
    async fn exhaustion_surfaces_last_error() {
        let calls = AtomicU32::new(0);
        let out: Result<(), String> = quick(5)
            .run("down", |n| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move { Err(format!("boom {}", n)) }
            })
            .await;
        assert_eq!(out, Err("boom 5".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn zero_attempts_still_runs_once() {
        let calls = AtomicU32::new(0);
        let _: Result<(), &str> = quick(0)
            .run("once", |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err("no") }
            })
            .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn waits_between_attempts() {
        let policy = RetryPolicy::new(3, Duration::from_millis(20));
        let start = std::time::Instant::now();
        let _: Result<(), &str> = policy.run("slow", |_| async { Err("no") }).await;
        assert!(start.elapsed() >= Duration::from_millis(40));
    }
}
