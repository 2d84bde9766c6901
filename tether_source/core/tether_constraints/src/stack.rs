use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use tether_ids::NodeID;
use tether_structs::Transform3D;

use crate::constraint::Constraint;
use crate::kind::ConstraintKind;
use crate::target::TargetLookup;

/// When baselines are re-captured besides activation and explicit recapture.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecapturePolicy {
    /// Only on activate / recapture / append.
    #[default]
    Manual,
    /// Also when the stack goes from no active constraint to one active constraint.
    OnReactivate,
}

impl RecapturePolicy {
    pub const fn as_str(self) -> &'static str {
        match self {
            RecapturePolicy::Manual => "manual",
            RecapturePolicy::OnReactivate => "on_reactivate",
        }
    }
}

impl fmt::Display for RecapturePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecapturePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "manual" => Ok(RecapturePolicy::Manual),
            "on_reactivate" => Ok(RecapturePolicy::OnReactivate),
            other => Err(format!(
                "unknown recapture policy `{other}` (expected `manual` or `on_reactivate`)"
            )),
        }
    }
}

/// Ordered constraints attached to one node's transform.
///
/// Constraints apply in order on every tick, each one reading the transform
/// the previous one wrote. Persisted as a plain sequence of constraint records;
/// the enabled flag and policy are runtime state.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ConstraintStack {
    constraints: Vec<Constraint>,
    enabled: bool,
    policy: RecapturePolicy,
}

impl ConstraintStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: RecapturePolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    /// Build a disabled stack from already-configured constraints (baselines kept).
    pub fn from_constraints(constraints: Vec<Constraint>) -> Self {
        Self {
            constraints,
            ..Self::default()
        }
    }

    pub fn policy(&self) -> RecapturePolicy {
        self.policy
    }

    pub fn set_policy(&mut self, policy: RecapturePolicy) {
        self.policy = policy;
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.constraints.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn iter(&self) -> impl Iterator<Item = &Constraint> {
        self.constraints.iter()
    }

    pub fn get(&self, index: usize) -> Option<&Constraint> {
        self.constraints.get(index)
    }

    /// Direct access. Toggling `active` through this skips the recapture policy;
    /// use [`ConstraintStack::set_active`] for that.
    pub fn get_mut(&mut self, index: usize) -> Option<&mut Constraint> {
        self.constraints.get_mut(index)
    }

    pub fn any_active(&self) -> bool {
        self.constraints.iter().any(Constraint::is_active)
    }

    /// Capture every baseline from `t` and enable ticking.
    pub fn activate(&mut self, t: &Transform3D) {
        self.recapture(t);
        self.enabled = true;
        log::debug!("constraint stack activated ({} constraints)", self.len());
    }

    /// Enable ticking with the baselines as they are. Used after loading a saved
    /// stack, whose baselines are already the unconstrained values.
    pub fn resume(&mut self) {
        self.enabled = true;
    }

    /// Overwrite every baseline with `t`. Only meaningful when `t` currently
    /// holds the unconstrained values.
    pub fn recapture(&mut self, t: &Transform3D) {
        for constraint in &mut self.constraints {
            constraint.setup(t);
        }
    }

    /// Run every constraint in order. Does nothing while disabled.
    pub fn tick<L>(&self, t: &mut Transform3D, targets: &L)
    where
        L: TargetLookup + ?Sized,
    {
        if !self.enabled {
            return;
        }
        for constraint in &self.constraints {
            constraint.solve(t, targets);
        }
    }

    /// Cancel every constraint in order and disable ticking.
    pub fn deactivate(&mut self, t: &mut Transform3D) {
        for constraint in &self.constraints {
            constraint.cancel(t);
        }
        self.enabled = false;
        log::debug!("constraint stack deactivated ({} constraints)", self.len());
    }

    /// Append a new constraint. Its baseline comes from the last constraint's
    /// baseline, or from `t` when the stack is empty, so it starts from the
    /// unconstrained reference rather than a partially blended transform.
    pub fn append(
        &mut self,
        kind: ConstraintKind,
        target: Option<NodeID>,
        t: &Transform3D,
    ) -> &mut Constraint {
        let mut constraint = Constraint::new(kind, target);
        match self.constraints.last() {
            Some(previous) => {
                let base = previous.baseline();
                constraint.setup_with(base.position, base.scale, base.rotation);
            }
            None => constraint.setup(t),
        }
        log::debug!("appended {kind} at index {}", self.len());
        self.constraints.push(constraint);
        let last = self.constraints.len() - 1;
        &mut self.constraints[last]
    }

    /// Restore `t` to the last constraint's full baseline and drop it.
    pub fn remove_last(&mut self, t: &mut Transform3D) -> Option<Constraint> {
        let removed = self.constraints.pop()?;
        removed.restore(t);
        log::debug!("removed {} from index {}", removed.kind(), self.len());
        Some(removed)
    }

    /// Toggle one constraint. Under [`RecapturePolicy::OnReactivate`], turning the
    /// first constraint on re-captures all baselines from `t` beforehand.
    /// Returns `false` when `index` is out of range.
    pub fn set_active(&mut self, index: usize, active: bool, t: &Transform3D) -> bool {
        if index >= self.constraints.len() {
            return false;
        }
        if active && self.policy == RecapturePolicy::OnReactivate && !self.any_active() {
            log::debug!("stack reactivated, recapturing baselines");
            self.recapture(t);
        }
        self.constraints[index].set_active(active);
        true
    }

    /// Returns `false` when `index` is out of range.
    pub fn set_fac(&mut self, index: usize, fac: f32) -> bool {
        match self.constraints.get_mut(index) {
            Some(constraint) => {
                constraint.set_fac(fac);
                true
            }
            None => false,
        }
    }
}

impl<'a> IntoIterator for &'a ConstraintStack {
    type Item = &'a Constraint;
    type IntoIter = std::slice::Iter<'a, Constraint>;

    fn into_iter(self) -> Self::IntoIter {
        self.constraints.iter()
    }
}

impl Serialize for ConstraintStack {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_seq(&self.constraints)
    }
}

/// Entries that fail to decode (unknown tag, bad fields) are skipped with a
/// warning instead of failing the whole stack. Use
/// [`crate::persist::decode_stack`] to get the skipped entries back.
impl<'de> Deserialize<'de> for ConstraintStack {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let entries = Vec::<serde_json::Value>::deserialize(deserializer)?;
        Ok(crate::persist::decode_stack(&entries).stack)
    }
}
