//! Replay of recorded probe outcomes.
//!
//! A [`ReplayFactory`] hands out one probe per recorded outcome, in order, so a
//! waiter can be exercised without a live service. Recorded outcomes use a small
//! JSON form:
//!
//! ```json
//! [ { "status": 200, "body": { "States": [ { "State": "pending" } ] } },
//!   { "status": 400, "error": { "code": "MockException", "message": "boom" } } ]
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::probe::{BoxError, Probe, ProbeFactory, ProbeOptions, ProbeOutcome, ServiceError};

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("failed to parse recorded outcomes: {0}")]
    Json(#[from] serde_json::Error),

    #[error("recorded outcome {0} has both a body and an error")]
    Ambiguous(usize),

    #[error("all {0} recorded outcomes have been replayed")]
    Exhausted(usize),
}

/// Serialized form of a [`ProbeOutcome`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RecordedOutcome {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ServiceError>,
}

impl RecordedOutcome {
    /// Convert to a probe outcome. A record without an error is a response;
    /// its status defaults to 200 and its body to `null`.
    fn into_outcome(self, index: usize) -> Result<ProbeOutcome, ReplayError> {
        match (self.body, self.error) {
            (Some(_), Some(_)) => Err(ReplayError::Ambiguous(index)),
            (_, Some(error)) => Ok(ProbeOutcome::error(self.status, error)),
            (body, None) => Ok(ProbeOutcome::response(
                self.status.unwrap_or(200),
                body.unwrap_or(Value::Null),
            )),
        }
    }
}

/// A probe that reports a pre-recorded outcome.
#[derive(Debug, Clone)]
pub struct ReplayProbe(ProbeOutcome);

#[async_trait]
impl Probe for ReplayProbe {
    async fn send(&mut self) -> ProbeOutcome {
        self.0.clone()
    }
}

/// Builds one [`ReplayProbe`] per recorded outcome; fails once they run out.
#[derive(Debug, Default)]
pub struct ReplayFactory {
    outcomes: Vec<ProbeOutcome>,
    next: AtomicUsize,
}

impl ReplayFactory {
    pub fn new(outcomes: Vec<ProbeOutcome>) -> Self {
        Self {
            outcomes,
            next: AtomicUsize::new(0),
        }
    }

    pub fn from_recorded(records: Vec<RecordedOutcome>) -> Result<Self, ReplayError> {
        let outcomes = records
            .into_iter()
            .enumerate()
            .map(|(index, record)| record.into_outcome(index))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(outcomes))
    }

    pub fn from_json(json: &str) -> Result<Self, ReplayError> {
        Self::from_recorded(serde_json::from_str(json)?)
    }

    /// Number of probes built so far.
    pub fn built(&self) -> usize {
        self.next.load(Ordering::SeqCst).min(self.outcomes.len())
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }
}

impl ProbeFactory for ReplayFactory {
    type Attempt = ReplayProbe;

    fn new_probe(&self, _options: &ProbeOptions) -> Result<ReplayProbe, BoxError> {
        let index = self.next.fetch_add(1, Ordering::SeqCst);
        self.outcomes
            .get(index)
            .cloned()
            .map(ReplayProbe)
            .ok_or_else(|| ReplayError::Exhausted(self.outcomes.len()).into())
    }
}
