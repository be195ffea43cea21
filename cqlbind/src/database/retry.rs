use std::future::Future;
use std::time::Duration;
use tracing::warn;

use crate::errors::SchemaError;
use crate::metrics;
use super::connection::SchemaSession;

pub const DEFAULT_TRIES: u32 = 2;
pub const ELEVATED_TIMEOUT: Duration = Duration::from_secs(100);

/// Bounded retry for schema mutations that time out.
///
/// After a retryable failure the session's default timeout is raised for the
/// remaining attempts. The timeout in force before the first attempt is put
/// back when `execute` returns, whether it succeeded or not. It is not put
/// back between attempts: doing so would undo the raise before the retry
/// runs and the retry would see the old timeout again.
pub struct TimeoutRetry<'a> {
    operation: &'a str,
    tries: u32,
    elevated_timeout: Duration,
    session: Option<&'a dyn SchemaSession>,
    is_retryable: fn(&SchemaError) -> bool,
}

impl<'a> TimeoutRetry<'a> {
    pub fn new(operation: &'a str) -> Self {
        Self {
            operation,
            tries: DEFAULT_TRIES,
            elevated_timeout: ELEVATED_TIMEOUT,
            session: None,
            is_retryable: SchemaError::is_timeout,
        }
    }

    /// Total attempts, including the first. Values below 1 are treated as 1.
    pub fn tries(mut self, tries: u32) -> Self {
        self.tries = tries.max(1);
        self
    }

    pub fn elevated_timeout(mut self, timeout: Duration) -> Self {
        self.elevated_timeout = timeout;
        self
    }

    pub fn session(mut self, session: &'a dyn SchemaSession) -> Self {
        self.session = Some(session);
        self
    }

    pub fn retry_on(mut self, is_retryable: fn(&SchemaError) -> bool) -> Self {
        self.is_retryable = is_retryable;
        self
    }

    pub async fn execute<F, Fut, T>(&self, mut operation: F) -> Result<T, SchemaError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, SchemaError>>,
    {
        let mut guard = self.session.map(TimeoutGuard::capture);
        let mut attempt = 1;

        loop {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(err) if (self.is_retryable)(&err) && attempt < self.tries => {
                    warn!(
                        "{} is taking longer than expected (attempt {}/{}): {}",
                        self.operation, attempt, self.tries, err
                    );
                    metrics::record_timeout_retry(self.operation);
                    if let Some(ref mut guard) = guard {
                        guard.elevate(self.elevated_timeout);
                    }
                    attempt += 1;
                }
                Err(err) => {
                    if (self.is_retryable)(&err) {
                        warn!("{} still timing out after {} attempts: {}", self.operation, self.tries, err);
                    }
                    return Err(err);
                }
            }
        }
    }
}

/// Restores the captured default timeout on drop, if it was ever raised.
struct TimeoutGuard<'a> {
    session: &'a dyn SchemaSession,
    original: Option<Duration>,
    elevated: bool,
}

impl<'a> TimeoutGuard<'a> {
    fn capture(session: &'a dyn SchemaSession) -> Self {
        Self {
            session,
            original: session.default_timeout(),
            elevated: false,
        }
    }

    fn elevate(&mut self, timeout: Duration) {
        self.session.set_default_timeout(Some(timeout));
        self.elevated = true;
    }
}

impl Drop for TimeoutGuard<'_> {
    fn drop(&mut self) {
        if self.elevated {
            self.session.set_default_timeout(self.original);
        }
    }
}
