//! Resource-state waiters.
//!
//! This crate repeatedly probes a remote resource and blocks until its state
//! satisfies a declared condition:
//! - Path projection over structured responses (`Reservations[].Instances[].State.Name`)
//! - Ordered acceptors with success, failure and retry directives
//! - Delay strategies and an exact attempt budget
//! - Cooperative cancellation of in-flight probes and delays
//! - Loading waiter definitions from botocore `waiters-2.json` models
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use resource_waiter::{Acceptor, AcceptorState, ReplayFactory, Waiter, WaiterDelay};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let factory = ReplayFactory::from_json(r#"[{"status": 200, "body": {"Status": "ACTIVE"}}]"#)?;
//! let waiter = Waiter::new("TableExists", factory)
//!     .with_max_attempts(25)
//!     .with_delay(WaiterDelay::constant(Duration::from_secs(20)))
//!     .with_acceptors([Acceptor::path(AcceptorState::Success, "Status", "ACTIVE")]);
//!
//! let done = waiter.wait().await?;
//! println!("ready after {} attempts", done.attempts);
//! # Ok(())
//! # }
//! ```

mod acceptor;
mod cancel;
mod delay;
mod error;
mod logger;
pub mod model;
pub mod path;
mod probe;
pub mod replay;
mod waiter;

// Test utilities are available in both unit tests and integration tests
#[cfg(any(test, feature = "integ-test"))]
pub mod test_utils;

pub use acceptor::{Acceptor, AcceptorState, MatcherKind};
pub use cancel::CancelSignal;
pub use delay::WaiterDelay;
pub use error::{
    TerminalState, WaiterError, CANCELED_CODE, INVALID_PARAMETER_CODE, PROBE_CONSTRUCTION_CODE,
    RESOURCE_NOT_READY_CODE,
};
pub use logger::{LogFacade, WaitLogger};
pub use model::{ModelError, WaiterDefinition, WaitersDescription};
pub use probe::{BoxError, Probe, ProbeFactory, ProbeOptions, ProbeOutcome, ServiceError};
pub use replay::{RecordedOutcome, ReplayFactory};
pub use waiter::{WaitOutput, Waiter, WaiterOption, DEFAULT_DELAY, DEFAULT_MAX_ATTEMPTS};
