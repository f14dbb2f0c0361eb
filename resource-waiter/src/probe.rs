//! Contracts between the waiter and the code that actually talks to the remote system.
//!
//! The waiter never builds, signs or sends requests itself. It asks a
//! [`ProbeFactory`] for one [`Probe`] per attempt and inspects the
//! [`ProbeOutcome`] the probe reports.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Boxed error returned by probe factories that could not build an attempt.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A classified service error with a stable code.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{code}: {message}")]
pub struct ServiceError {
    pub code: String,
    #[serde(default)]
    pub message: String,
}

impl ServiceError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

/// What one probe attempt observed: an optional status code plus either a
/// structured response or a classified error.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeOutcome {
    status_code: Option<u16>,
    result: Result<Value, ServiceError>,
}

impl ProbeOutcome {
    pub fn response(status_code: u16, body: Value) -> Self {
        Self {
            status_code: Some(status_code),
            result: Ok(body),
        }
    }

    pub fn error(status_code: Option<u16>, error: ServiceError) -> Self {
        Self {
            status_code,
            result: Err(error),
        }
    }

    pub fn status_code(&self) -> Option<u16> {
        self.status_code
    }

    pub fn body(&self) -> Option<&Value> {
        self.result.as_ref().ok()
    }

    pub fn service_error(&self) -> Option<&ServiceError> {
        self.result.as_ref().err()
    }

    pub fn into_result(self) -> Result<Value, ServiceError> {
        self.result
    }
}

/// Per-attempt options forwarded untouched to the [`ProbeFactory`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProbeOptions {
    /// Extra headers to attach to every probe, in order.
    pub headers: Vec<(String, String)>,
    /// Log level the transport should use for the probe.
    pub log_level: Option<log::LevelFilter>,
    /// Upper bound the transport should apply to a single probe.
    pub timeout: Option<Duration>,
}

impl ProbeOptions {
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_log_level(mut self, level: log::LevelFilter) -> Self {
        self.log_level = Some(level);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// One built probe attempt, ready to be sent.
#[async_trait]
pub trait Probe: Send {
    /// Perform the exchange. Transport failures must be reported as a
    /// classified [`ServiceError`] inside the outcome.
    async fn send(&mut self) -> ProbeOutcome;
}

/// Produces one [`Probe`] per attempt.
pub trait ProbeFactory: Send + Sync {
    type Attempt: Probe;

    /// Build the next attempt. An error here ends the wait.
    fn new_probe(&self, options: &ProbeOptions) -> Result<Self::Attempt, BoxError>;
}

impl<F, P> ProbeFactory for F
where
    F: Fn(&ProbeOptions) -> Result<P, BoxError> + Send + Sync,
    P: Probe,
{
    type Attempt = P;

    fn new_probe(&self, options: &ProbeOptions) -> Result<P, BoxError> {
        self(options)
    }
}
