//! Botocore waiter model parser
//!
//! Parses `waiters-2.json` documents into waiter definitions and builds
//! [`Waiter`]s from them. Only the matcher kinds this crate evaluates are
//! accepted; anything else fails to deserialize.

use std::collections::BTreeMap;
use std::io::Read;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::acceptor::Acceptor;
use crate::delay::WaiterDelay;
use crate::path::PathError;
use crate::probe::ProbeFactory;
use crate::waiter::Waiter;

/// Errors raised while loading a waiter model.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("failed to parse waiter model: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported waiter model version {0}, expected 2")]
    UnsupportedVersion(u32),

    #[error("waiter '{name}' is invalid: {reason}")]
    InvalidWaiter { name: String, reason: String },

    #[error("waiter '{0}' not found")]
    UnknownWaiter(String),
}

pub type ModelResult<T> = Result<T, ModelError>;

/// One named waiter from a model document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaiterDefinition {
    /// Operation this waiter polls (PascalCase, e.g., "DescribeInstances").
    pub operation: String,
    /// Seconds between attempts.
    pub delay: u64,
    pub max_attempts: u32,
    pub acceptors: Vec<Acceptor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl WaiterDefinition {
    /// Check the attempt budget and every acceptor argument.
    pub fn validate(&self, name: &str) -> ModelResult<()> {
        let invalid = |reason: String| ModelError::InvalidWaiter {
            name: name.to_string(),
            reason,
        };
        if self.max_attempts == 0 {
            return Err(invalid("maxAttempts must be at least 1".to_string()));
        }
        if self.acceptors.is_empty() {
            return Err(invalid("no acceptors".to_string()));
        }
        for (index, acceptor) in self.acceptors.iter().enumerate() {
            acceptor.compile().map_err(|e: PathError| {
                invalid(format!("acceptor {index} ({acceptor}): {e}"))
            })?;
        }
        Ok(())
    }

    /// Build a validated waiter polling through `factory`.
    pub fn build<F: ProbeFactory>(&self, name: &str, factory: F) -> ModelResult<Waiter<F>> {
        self.validate(name)?;
        Ok(Waiter::new(name, factory)
            .with_max_attempts(self.max_attempts)
            .with_delay(WaiterDelay::constant(Duration::from_secs(self.delay)))
            .with_acceptors(self.acceptors.iter().cloned()))
    }
}

/// Complete waiters description for a service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaitersDescription {
    pub version: u32,
    pub waiters: BTreeMap<String, WaiterDefinition>,
}

impl WaitersDescription {
    pub fn from_json(json: &str) -> ModelResult<Self> {
        Self::checked(serde_json::from_str(json)?)
    }

    pub fn from_reader(reader: impl Read) -> ModelResult<Self> {
        Self::checked(serde_json::from_reader(reader)?)
    }

    fn checked(description: Self) -> ModelResult<Self> {
        if description.version != 2 {
            return Err(ModelError::UnsupportedVersion(description.version));
        }
        Ok(description)
    }

    pub fn get(&self, name: &str) -> ModelResult<&WaiterDefinition> {
        self.waiters
            .get(name)
            .ok_or_else(|| ModelError::UnknownWaiter(name.to_string()))
    }

    /// Validate every waiter, returning one error per invalid waiter.
    pub fn validate(&self) -> Vec<ModelError> {
        self.waiters
            .iter()
            .filter_map(|(name, definition)| definition.validate(name).err())
            .collect()
    }
}
