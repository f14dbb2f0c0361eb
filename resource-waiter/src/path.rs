//! Path projection over structured probe responses.
//!
//! A path such as `Reservations[].Instances[].State.Name` is parsed once into a
//! list of steps and then resolved against a `serde_json::Value`. Resolution never
//! fails: missing fields, nulls and out-of-range indexes simply contribute no
//! values. Only the subset needed by waiter acceptors is supported; functions,
//! filters and operators are rejected at parse time.
//!
//! Only `[]` flattens. A path that ends on an array field without it, such as
//! `Reservations[0].Instances`, yields the array itself as a single value; use
//! `Reservations[0].Instances[]` to get its elements.

use serde_json::Value;
use thiserror::Error;

/// Errors raised while parsing a path expression.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PathError {
    #[error("empty path segment at offset {0}")]
    EmptySegment(usize),

    #[error("unterminated '[' at offset {0}")]
    UnterminatedBracket(usize),

    #[error("invalid index '{index}' at offset {offset}")]
    InvalidIndex { index: String, offset: usize },

    #[error("unsupported character '{character}' at offset {offset}")]
    UnsupportedCharacter { character: char, offset: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Step {
    Field(String),
    Project,
    Index(usize),
}

/// A pre-parsed path expression.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PathExpr {
    steps: Vec<Step>,
}

impl PathExpr {
    /// Parse a dotted/bracketed path. The empty string selects the whole value.
    pub fn parse(path: &str) -> Result<Self, PathError> {
        let path = path.trim();
        let mut steps = Vec::new();
        if path.is_empty() {
            return Ok(Self { steps });
        }

        let chars: Vec<char> = path.chars().collect();
        let mut pos = 0;
        // A segment may open with a bracket only at the very start or right after
        // another bracket group, e.g. `[]` or `Items[0][]`.
        let mut expect_field = chars[0] != '[';

        while pos < chars.len() {
            if expect_field {
                let start = pos;
                while pos < chars.len() && chars[pos] != '.' && chars[pos] != '[' {
                    let c = chars[pos];
                    if !(c.is_alphanumeric() || c == '_' || c == '-') {
                        return Err(PathError::UnsupportedCharacter {
                            character: c,
                            offset: pos,
                        });
                    }
                    pos += 1;
                }
                if pos == start {
                    return Err(PathError::EmptySegment(start));
                }
                steps.push(Step::Field(chars[start..pos].iter().collect()));
                expect_field = false;
                continue;
            }

            match chars[pos] {
                '[' => {
                    let open = pos;
                    let close = chars[open..]
                        .iter()
                        .position(|&c| c == ']')
                        .map(|offset| open + offset)
                        .ok_or(PathError::UnterminatedBracket(open))?;
                    let inner: String = chars[open + 1..close].iter().collect();
                    let inner = inner.trim();
                    if inner.is_empty() {
                        steps.push(Step::Project);
                    } else {
                        let index = inner.parse::<usize>().map_err(|_| PathError::InvalidIndex {
                            index: inner.to_string(),
                            offset: open,
                        })?;
                        steps.push(Step::Index(index));
                    }
                    pos = close + 1;
                }
                '.' => {
                    pos += 1;
                    expect_field = true;
                    if pos == chars.len() {
                        return Err(PathError::EmptySegment(pos));
                    }
                }
                other => {
                    return Err(PathError::UnsupportedCharacter {
                        character: other,
                        offset: pos,
                    })
                }
            }
        }

        Ok(Self { steps })
    }

    /// True when the path selects the whole value.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Resolve the path against `value`, returning every non-null value reached,
    /// in document order.
    pub fn resolve<'a>(&self, value: &'a Value) -> Vec<&'a Value> {
        let mut out = Vec::new();
        collect(&self.steps, value, &mut out);
        out
    }
}

fn collect<'a>(steps: &[Step], value: &'a Value, out: &mut Vec<&'a Value>) {
    if value.is_null() {
        return;
    }
    let Some((step, rest)) = steps.split_first() else {
        out.push(value);
        return;
    };

    match step {
        Step::Field(name) => {
            if let Some(child) = value.as_object().and_then(|map| map.get(name)) {
                collect(rest, child, out);
            }
        }
        Step::Index(index) => {
            if let Some(child) = value.as_array().and_then(|items| items.get(*index)) {
                collect(rest, child, out);
            }
        }
        Step::Project => {
            if let Some(items) = value.as_array() {
                for item in items {
                    collect(rest, item, out);
                }
            }
        }
    }
}

/// Resolve `path` against `value` in one call. Parse failures yield no values.
pub fn values_at_path<'a>(value: &'a Value, path: &str) -> Vec<&'a Value> {
    PathExpr::parse(path)
        .map(|expr| expr.resolve(value))
        .unwrap_or_default()
}

/// Compare two values by their semantic type. Numbers compare numerically, so
/// `1` equals `1.0`; values of different types never compare equal.
pub fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::String(a), Value::String(b)) => a == b,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Number(a), Value::Number(b)) => {
            if let (Some(a), Some(b)) = (a.as_i64(), b.as_i64()) {
                return a == b;
            }
            if let (Some(a), Some(b)) = (a.as_u64(), b.as_u64()) {
                return a == b;
            }
            match (a.as_f64(), b.as_f64()) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            }
        }
        (Value::Array(a), Value::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| values_equal(x, y))
        }
        (Value::Object(a), Value::Object(b)) => {
            a.len() == b.len()
                && a.iter()
                    .all(|(key, x)| b.get(key).is_some_and(|y| values_equal(x, y)))
        }
        (Value::Null, Value::Null) => true,
        _ => false,
    }
}
