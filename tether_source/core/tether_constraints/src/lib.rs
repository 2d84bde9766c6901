//! Transform constraints: per-node stacks of solvers that blend one transform
//! channel from a captured baseline toward a target node each frame.
//!
//! The host drives a [`ConstraintStack`] with three calls: `activate` when the
//! node is enabled, `tick` once per frame, `deactivate` when it is disabled.
//! Targets are [`tether_ids::NodeID`] handles resolved through [`TargetLookup`],
//! so a stack never keeps its targets alive.

pub mod constraint;
pub mod kind;
pub mod persist;
pub mod stack;
pub mod target;

pub use constraint::{Baseline, Constraint, CopyPosition, CopyRotation, CopyScale, LookAt, SolverState};
pub use kind::{Channel, ConstraintKind};
pub use persist::{DecodedStack, SkippedEntry, StackError, decode_stack, stack_from_json, stack_to_json};
pub use stack::{ConstraintStack, RecapturePolicy};
pub use target::TargetLookup;
