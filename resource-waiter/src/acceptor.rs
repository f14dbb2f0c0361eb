//! Acceptors: ordered matching rules deciding what each probe outcome means.
//!
//! The serialized form follows the botocore waiter model, so an acceptor read
//! from `waiters-2.json` deserializes directly:
//!
//! ```json
//! { "state": "success", "matcher": "pathAll",
//!   "argument": "Reservations[].Instances[].State.Name", "expected": "running" }
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::path::{values_equal, PathError, PathExpr};
use crate::probe::ProbeOutcome;

/// Directive applied when an acceptor matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AcceptorState {
    Success,
    Failure,
    Retry,
}

impl fmt::Display for AcceptorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Success => "success",
            Self::Failure => "failure",
            Self::Retry => "retry",
        };
        f.write_str(s)
    }
}

/// How an acceptor compares a probe outcome against its expected value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatcherKind {
    /// The status code equals the expected integer.
    #[serde(rename = "status")]
    Status,
    /// The first value at the path equals the expected value.
    #[serde(rename = "path")]
    Path,
    /// Every value at the path equals the expected value (and there is at least one).
    #[serde(rename = "pathAll")]
    PathAll,
    /// At least one value at the path equals the expected value.
    #[serde(rename = "pathAny")]
    PathAny,
    /// The classified error code equals the expected string.
    #[serde(rename = "error")]
    Error,
}

impl fmt::Display for MatcherKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Status => "status",
            Self::Path => "path",
            Self::PathAll => "pathAll",
            Self::PathAny => "pathAny",
            Self::Error => "error",
        };
        f.write_str(s)
    }
}

/// A single waiter rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Acceptor {
    pub state: AcceptorState,
    pub matcher: MatcherKind,
    /// Path expression for the path matchers; ignored by `status` and `error`.
    #[serde(default)]
    pub argument: String,
    pub expected: Value,
}

impl Acceptor {
    pub fn new(
        state: AcceptorState,
        matcher: MatcherKind,
        argument: impl Into<String>,
        expected: impl Into<Value>,
    ) -> Self {
        Self {
            state,
            matcher,
            argument: argument.into(),
            expected: expected.into(),
        }
    }

    pub fn status(state: AcceptorState, expected: u16) -> Self {
        Self::new(state, MatcherKind::Status, "", expected)
    }

    pub fn error(state: AcceptorState, code: impl Into<String>) -> Self {
        Self::new(state, MatcherKind::Error, "", Value::String(code.into()))
    }

    pub fn path(state: AcceptorState, argument: impl Into<String>, expected: impl Into<Value>) -> Self {
        Self::new(state, MatcherKind::Path, argument, expected)
    }

    pub fn path_all(
        state: AcceptorState,
        argument: impl Into<String>,
        expected: impl Into<Value>,
    ) -> Self {
        Self::new(state, MatcherKind::PathAll, argument, expected)
    }

    pub fn path_any(
        state: AcceptorState,
        argument: impl Into<String>,
        expected: impl Into<Value>,
    ) -> Self {
        Self::new(state, MatcherKind::PathAny, argument, expected)
    }

    /// Pre-parse the path argument. Only path matchers look at it.
    pub(crate) fn compile(&self) -> Result<CompiledAcceptor<'_>, PathError> {
        let path = match self.matcher {
            MatcherKind::Path | MatcherKind::PathAll | MatcherKind::PathAny => {
                PathExpr::parse(&self.argument)?
            }
            MatcherKind::Status | MatcherKind::Error => PathExpr::default(),
        };
        Ok(CompiledAcceptor {
            acceptor: self,
            path,
        })
    }
}

impl fmt::Display for Acceptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.state, self.matcher)?;
        if !self.argument.is_empty() {
            write!(f, " {}", self.argument)?;
        }
        write!(f, " == {}", self.expected)
    }
}

/// An acceptor with its path parsed, ready for repeated evaluation.
#[derive(Debug, Clone)]
pub(crate) struct CompiledAcceptor<'a> {
    pub(crate) acceptor: &'a Acceptor,
    path: PathExpr,
}

impl CompiledAcceptor<'_> {
    pub(crate) fn matches(&self, outcome: &ProbeOutcome) -> bool {
        let expected = &self.acceptor.expected;
        match self.acceptor.matcher {
            MatcherKind::Status => match (outcome.status_code(), expected.as_u64()) {
                (Some(status), Some(want)) => u64::from(status) == want,
                _ => false,
            },
            MatcherKind::Error => match (outcome.service_error(), expected.as_str()) {
                (Some(err), Some(code)) => err.code == code,
                _ => false,
            },
            MatcherKind::Path => outcome.body().is_some_and(|body| {
                self.path
                    .resolve(body)
                    .first()
                    .is_some_and(|value| values_equal(value, expected))
            }),
            MatcherKind::PathAll => outcome.body().is_some_and(|body| {
                let values = self.path.resolve(body);
                !values.is_empty() && values.iter().all(|value| values_equal(value, expected))
            }),
            MatcherKind::PathAny => outcome.body().is_some_and(|body| {
                self.path
                    .resolve(body)
                    .iter()
                    .any(|value| values_equal(value, expected))
            }),
        }
    }
}

/// Return the first acceptor matching `outcome`, in declared order.
pub(crate) fn first_match<'a>(
    acceptors: &[CompiledAcceptor<'a>],
    outcome: &ProbeOutcome,
) -> Option<&'a Acceptor> {
    acceptors
        .iter()
        .find(|compiled| compiled.matches(outcome))
        .map(|compiled| compiled.acceptor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::ServiceError;
    use rstest::rstest;
    use serde_json::json;

    fn states(values: &[&str]) -> ProbeOutcome {
        let states: Vec<Value> = values.iter().map(|s| json!({"State": s})).collect();
        ProbeOutcome::response(200, json!({"States": states}))
    }

    fn matches(acceptor: &Acceptor, outcome: &ProbeOutcome) -> bool {
        acceptor.compile().unwrap().matches(outcome)
    }

    #[rstest]
    #[case(&["pending", "pending"], false, false, false)]
    #[case(&["running", "pending"], false, true, true)]
    #[case(&["pending", "running"], false, true, false)]
    #[case(&["running", "running"], true, true, true)]
    #[case(&[], false, false, false)]
    fn test_path_matchers(
        #[case] values: &[&str],
        #[case] all: bool,
        #[case] any: bool,
        #[case] first: bool,
    ) {
        let outcome = states(values);
        let path = "States[].State";
        assert_eq!(
            matches(&Acceptor::path_all(AcceptorState::Success, path, "running"), &outcome),
            all
        );
        assert_eq!(
            matches(&Acceptor::path_any(AcceptorState::Success, path, "running"), &outcome),
            any
        );
        assert_eq!(
            matches(&Acceptor::path(AcceptorState::Success, path, "running"), &outcome),
            first
        );
    }

    #[test]
    fn test_missing_field_never_matches() {
        let outcome = states(&["running"]);
        for acceptor in [
            Acceptor::path(AcceptorState::Success, "Nope[].State", "running"),
            Acceptor::path_all(AcceptorState::Success, "Nope[].State", "running"),
            Acceptor::path_any(AcceptorState::Success, "Nope[].State", "running"),
        ] {
            assert!(!matches(&acceptor, &outcome), "{acceptor}");
        }
    }

    #[test]
    fn test_status_matches_with_or_without_error() {
        let acceptor = Acceptor::status(AcceptorState::Success, 404);
        assert!(!matches(&acceptor, &ProbeOutcome::response(200, json!({}))));
        assert!(matches(&acceptor, &ProbeOutcome::response(404, json!({}))));
        assert!(matches(
            &acceptor,
            &ProbeOutcome::error(Some(404), ServiceError::new("NotFound", "Not Found"))
        ));
        assert!(!matches(
            &acceptor,
            &ProbeOutcome::error(None, ServiceError::new("NotFound", "Not Found"))
        ));
    }

    #[test]
    fn test_status_expected_must_be_integer() {
        let acceptor = Acceptor::new(AcceptorState::Success, MatcherKind::Status, "", "404");
        assert!(!matches(&acceptor, &ProbeOutcome::response(404, json!({}))));
    }

    #[test]
    fn test_error_matcher_only_sees_errors() {
        let acceptor = Acceptor::error(AcceptorState::Retry, "MockException");
        assert!(matches(
            &acceptor,
            &ProbeOutcome::error(Some(400), ServiceError::new("MockException", "boom"))
        ));
        assert!(!matches(
            &acceptor,
            &ProbeOutcome::error(Some(400), ServiceError::new("OtherException", "boom"))
        ));
        // A body that happens to equal the expected code is not an error.
        assert!(!matches(&acceptor, &ProbeOutcome::response(200, json!("MockException"))));
    }

    #[test]
    fn test_path_matchers_ignore_error_outcomes() {
        let acceptor = Acceptor::path_any(AcceptorState::Failure, "", "MockException");
        let outcome = ProbeOutcome::error(Some(400), ServiceError::new("MockException", "boom"));
        assert!(!matches(&acceptor, &outcome));
    }

    #[test]
    fn test_first_match_respects_declared_order() {
        let acceptors = [
            Acceptor::path_any(AcceptorState::Failure, "States[].State", "stopping"),
            Acceptor::path_any(AcceptorState::Success, "States[].State", "running"),
        ];
        let compiled: Vec<_> = acceptors.iter().map(|a| a.compile().unwrap()).collect();

        let hit = first_match(&compiled, &states(&["running", "stopping"])).unwrap();
        assert_eq!(hit.state, AcceptorState::Failure);

        let hit = first_match(&compiled, &states(&["running"])).unwrap();
        assert_eq!(hit.state, AcceptorState::Success);

        assert!(first_match(&compiled, &states(&["pending"])).is_none());
    }

    #[test]
    fn test_compile_rejects_bad_path_only_for_path_matchers() {
        let bad = Acceptor::path(AcceptorState::Success, "a[", "x");
        assert!(bad.compile().is_err());
        let ignored = Acceptor::new(AcceptorState::Success, MatcherKind::Status, "a[", 200);
        assert!(ignored.compile().is_ok());
    }

    #[test]
    fn test_botocore_json_shape() {
        let acceptor: Acceptor = serde_json::from_value(json!({
            "expected": "running",
            "matcher": "pathAll",
            "state": "success",
            "argument": "Reservations[].Instances[].State.Name"
        }))
        .unwrap();
        assert_eq!(acceptor.matcher, MatcherKind::PathAll);
        assert_eq!(acceptor.state, AcceptorState::Success);

        let acceptor: Acceptor = serde_json::from_value(json!({
            "expected": 404, "matcher": "status", "state": "retry"
        }))
        .unwrap();
        assert!(acceptor.argument.is_empty());
        assert_eq!(acceptor.to_string(), "retry status == 404");
    }
}
