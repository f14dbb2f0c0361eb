//! Terminal errors returned by a wait.

use thiserror::Error;

use crate::acceptor::Acceptor;
use crate::path::PathError;
use crate::probe::{BoxError, ServiceError};

/// Error code shared by budget exhaustion and failure-state acceptors.
pub const RESOURCE_NOT_READY_CODE: &str = "ResourceNotReady";
/// Error code reported when the wait was cancelled.
pub const CANCELED_CODE: &str = "RequestCanceled";
/// Error code reported when the probe factory could not build an attempt.
pub const PROBE_CONSTRUCTION_CODE: &str = "ProbeConstructionError";
/// Error code reported for configuration rejected before any probe.
pub const INVALID_PARAMETER_CODE: &str = "InvalidParameter";

/// The state a wait ended in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TerminalState {
    Succeeded,
    Failed,
    ResourceNotReady,
    Canceled,
}

impl std::fmt::Display for TerminalState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::ResourceNotReady => "not ready",
            Self::Canceled => "canceled",
        };
        f.write_str(name)
    }
}

/// Every way a wait can end other than success.
#[derive(Debug, Error)]
pub enum WaiterError {
    /// The attempt budget ran out without a success or failure acceptor firing.
    #[error("exceeded {attempts} wait attempts")]
    ResourceNotReady { attempts: u32 },

    /// A failure-state acceptor matched. `cause` holds the service error when
    /// the matched outcome was an error.
    #[error("failed waiting for successful resource state")]
    FailureState {
        attempts: u32,
        acceptor: Acceptor,
        #[source]
        cause: Option<ServiceError>,
    },

    /// The cancellation signal fired while waiting.
    #[error("waiter context canceled{}", .cause.as_deref().map(|c| format!(": {c}")).unwrap_or_default())]
    Canceled { attempts: u32, cause: Option<String> },

    /// The probe factory failed to build an attempt.
    #[error("failed to build probe: {source}")]
    ProbeConstruction {
        attempts: u32,
        #[source]
        source: BoxError,
    },

    /// A probe reported an error no acceptor claimed.
    #[error("{source}")]
    Service {
        attempts: u32,
        #[source]
        source: ServiceError,
    },

    /// The waiter configuration was rejected before any probe was sent.
    #[error("invalid waiter configuration: {0}")]
    InvalidConfig(String),
}

impl WaiterError {
    /// Stable code identifying the error kind. Service errors keep their own code.
    pub fn code(&self) -> &str {
        match self {
            Self::ResourceNotReady { .. } | Self::FailureState { .. } => RESOURCE_NOT_READY_CODE,
            Self::Canceled { .. } => CANCELED_CODE,
            Self::ProbeConstruction { .. } => PROBE_CONSTRUCTION_CODE,
            Self::Service { source, .. } => &source.code,
            Self::InvalidConfig(_) => INVALID_PARAMETER_CODE,
        }
    }

    /// Number of probes performed before the wait ended.
    pub fn attempts(&self) -> u32 {
        match self {
            Self::ResourceNotReady { attempts }
            | Self::FailureState { attempts, .. }
            | Self::Canceled { attempts, .. }
            | Self::ProbeConstruction { attempts, .. }
            | Self::Service { attempts, .. } => *attempts,
            Self::InvalidConfig(_) => 0,
        }
    }

    pub fn terminal_state(&self) -> TerminalState {
        match self {
            Self::ResourceNotReady { .. } => TerminalState::ResourceNotReady,
            Self::Canceled { .. } => TerminalState::Canceled,
            Self::FailureState { .. }
            | Self::ProbeConstruction { .. }
            | Self::Service { .. }
            | Self::InvalidConfig(_) => TerminalState::Failed,
        }
    }
}

impl From<PathError> for WaiterError {
    fn from(err: PathError) -> Self {
        Self::InvalidConfig(format!("invalid acceptor argument: {err}"))
    }
}
