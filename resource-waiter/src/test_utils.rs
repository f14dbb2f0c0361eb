//! Test utilities and fixtures for waiter testing.

use serde_json::{json, Value};

use crate::probe::ProbeOutcome;

/// Sample waiter models and recorded responses.
pub mod fixtures {
    /// Two EC2-style waiters in botocore `waiters-2.json` form.
    pub const EC2_WAITERS: &str = r#"{
  "version": 2,
  "waiters": {
    "InstanceRunning": {
      "delay": 15,
      "operation": "DescribeInstances",
      "maxAttempts": 40,
      "acceptors": [
        {"expected": "running", "matcher": "pathAll", "state": "success",
         "argument": "Reservations[].Instances[].State.Name"},
        {"expected": "shutting-down", "matcher": "pathAny", "state": "failure",
         "argument": "Reservations[].Instances[].State.Name"},
        {"expected": "terminated", "matcher": "pathAny", "state": "failure",
         "argument": "Reservations[].Instances[].State.Name"},
        {"expected": "InvalidInstanceID.NotFound", "matcher": "error", "state": "retry"}
      ]
    },
    "InstanceStopped": {
      "delay": 15,
      "operation": "DescribeInstances",
      "maxAttempts": 40,
      "acceptors": [
        {"expected": "stopped", "matcher": "pathAll", "state": "success",
         "argument": "Reservations[].Instances[].State.Name"},
        {"expected": "pending", "matcher": "pathAny", "state": "failure",
         "argument": "Reservations[].Instances[].State.Name"},
        {"expected": "terminated", "matcher": "pathAny", "state": "failure",
         "argument": "Reservations[].Instances[].State.Name"}
      ]
    }
  }
}"#;
}

/// A `{"States": [{"State": ...}, ...]}` body.
pub fn states_body(states: &[&str]) -> Value {
    let states: Vec<Value> = states.iter().map(|s| json!({ "State": s })).collect();
    json!({ "States": states })
}

/// A 200 response carrying [`states_body`].
pub fn states_response(states: &[&str]) -> ProbeOutcome {
    ProbeOutcome::response(200, states_body(states))
}

/// A `DescribeInstances`-shaped body with one reservation per state group.
pub fn instances_body(reservations: &[&[&str]]) -> Value {
    let reservations: Vec<Value> = reservations
        .iter()
        .map(|states| {
            let instances: Vec<Value> = states
                .iter()
                .map(|s| json!({ "State": { "Name": s } }))
                .collect();
            json!({ "Instances": instances })
        })
        .collect();
    json!({ "Reservations": reservations })
}
