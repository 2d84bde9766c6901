//! JSON persistence for constraint stacks.
//!
//! A stack is an array of tagged records. Decoding is per entry: a record with
//! an unknown `type` (a removed kind, or one from a newer build) or malformed
//! fields is skipped and reported, and the remaining entries still load in order.

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::constraint::Constraint;
use crate::stack::ConstraintStack;

#[derive(Debug, Error)]
pub enum StackError {
    #[error("constraint stack JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("constraint stack must be a JSON array, found {0}")]
    NotAnArray(&'static str),
}

/// One record that could not be turned into a constraint.
#[derive(Clone, Debug, PartialEq)]
pub struct SkippedEntry {
    pub index: usize,
    pub tag: Option<String>,
    pub reason: String,
}

#[derive(Clone, Debug, Default)]
pub struct DecodedStack {
    pub stack: ConstraintStack,
    pub skipped: Vec<SkippedEntry>,
}

/// Decode records in order, skipping (and logging) the ones that fail.
pub fn decode_stack(entries: &[Value]) -> DecodedStack {
    let mut constraints = Vec::with_capacity(entries.len());
    let mut skipped = Vec::new();

    for (index, entry) in entries.iter().enumerate() {
        match Constraint::deserialize(entry) {
            Ok(constraint) => constraints.push(constraint),
            Err(err) => {
                let tag = entry
                    .get("type")
                    .and_then(Value::as_str)
                    .map(str::to_string);
                log::warn!(
                    "skipping constraint #{index} ({}): {err}",
                    tag.as_deref().unwrap_or("untagged")
                );
                skipped.push(SkippedEntry {
                    index,
                    tag,
                    reason: err.to_string(),
                });
            }
        }
    }

    DecodedStack {
        stack: ConstraintStack::from_constraints(constraints),
        skipped,
    }
}

pub fn stack_from_json(src: &str) -> Result<DecodedStack, StackError> {
    match serde_json::from_str::<Value>(src)? {
        Value::Array(entries) => Ok(decode_stack(&entries)),
        other => Err(StackError::NotAnArray(json_kind(&other))),
    }
}

pub fn stack_to_json(stack: &ConstraintStack) -> Result<String, StackError> {
    Ok(serde_json::to_string_pretty(stack)?)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
