use serde::{Deserialize, Deserializer, Serialize};

use tether_ids::NodeID;
use tether_structs::{Quaternion, Transform3D, Vector3};

use crate::kind::{Channel, ConstraintKind};
use crate::target::TargetLookup;

fn default_fac() -> f32 {
    1.0
}
/// Influence is kept in [0, 1]; NaN counts as no influence.
fn clamp_fac(fac: f32) -> f32 {
    if fac.is_nan() { 0.0 } else { fac.clamp(0.0, 1.0) }
}
fn deserialize_fac<'de, D>(deserializer: D) -> Result<f32, D::Error>
where
    D: Deserializer<'de>,
{
    f32::deserialize(deserializer).map(clamp_fac)
}
fn default_active() -> bool {
    true
}
fn is_default_active(active: &bool) -> bool {
    *active
}
fn default_up() -> Vector3 {
    Vector3::UP
}

/// Transform values captured when a constraint is activated: the
/// "unconstrained" reference every blend starts from. Missing fields load as
/// the identity values.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Baseline {
    pub position: Vector3,
    pub scale: Vector3,
    pub rotation: Quaternion,
}

impl Baseline {
    pub fn from_transform(t: &Transform3D) -> Self {
        Self {
            position: t.position,
            scale: t.scale,
            rotation: t.rotation,
        }
    }

    pub fn to_transform(self) -> Transform3D {
        Transform3D::new(self.position, self.rotation, self.scale)
    }
}

impl Default for Baseline {
    fn default() -> Self {
        Self::from_transform(&Transform3D::IDENTITY)
    }
}

/// Fields every constraint carries.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SolverState {
    #[serde(default)]
    pub baseline: Baseline,
    /// Influence in [0, 1].
    #[serde(default = "default_fac", deserialize_with = "deserialize_fac")]
    pub fac: f32,
    #[serde(default = "default_active", skip_serializing_if = "is_default_active")]
    pub active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<NodeID>,
}

impl SolverState {
    fn new(target: Option<NodeID>) -> Self {
        Self {
            baseline: Baseline::default(),
            fac: default_fac(),
            active: default_active(),
            target,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CopyPosition {
    #[serde(flatten)]
    pub state: SolverState,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CopyRotation {
    #[serde(flatten)]
    pub state: SolverState,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CopyScale {
    #[serde(flatten)]
    pub state: SolverState,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LookAt {
    #[serde(flatten)]
    pub state: SolverState,
    /// Axis the look rotation keeps local +Y closest to.
    #[serde(default = "default_up")]
    pub up: Vector3,
}

/// One constraint in a stack. Persisted as `{"type": "<tag>", ...fields}`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Constraint {
    CopyPosition(CopyPosition),
    CopyRotation(CopyRotation),
    CopyScale(CopyScale),
    LookAt(LookAt),
}

impl Constraint {
    /// New constraint at full influence, active, with an identity baseline.
    pub fn new(kind: ConstraintKind, target: Option<NodeID>) -> Self {
        let state = SolverState::new(target);
        match kind {
            ConstraintKind::CopyPosition => Constraint::CopyPosition(CopyPosition { state }),
            ConstraintKind::CopyRotation => Constraint::CopyRotation(CopyRotation { state }),
            ConstraintKind::CopyScale => Constraint::CopyScale(CopyScale { state }),
            ConstraintKind::LookAt => Constraint::LookAt(LookAt {
                state,
                up: default_up(),
            }),
        }
    }

    pub fn kind(&self) -> ConstraintKind {
        match self {
            Constraint::CopyPosition(_) => ConstraintKind::CopyPosition,
            Constraint::CopyRotation(_) => ConstraintKind::CopyRotation,
            Constraint::CopyScale(_) => ConstraintKind::CopyScale,
            Constraint::LookAt(_) => ConstraintKind::LookAt,
        }
    }

    pub fn state(&self) -> &SolverState {
        match self {
            Constraint::CopyPosition(c) => &c.state,
            Constraint::CopyRotation(c) => &c.state,
            Constraint::CopyScale(c) => &c.state,
            Constraint::LookAt(c) => &c.state,
        }
    }

    pub fn state_mut(&mut self) -> &mut SolverState {
        match self {
            Constraint::CopyPosition(c) => &mut c.state,
            Constraint::CopyRotation(c) => &mut c.state,
            Constraint::CopyScale(c) => &mut c.state,
            Constraint::LookAt(c) => &mut c.state,
        }
    }

    pub fn baseline(&self) -> Baseline {
        self.state().baseline
    }

    pub fn target(&self) -> Option<NodeID> {
        self.state().target
    }

    pub fn set_target(&mut self, target: Option<NodeID>) {
        self.state_mut().target = target;
    }

    pub fn fac(&self) -> f32 {
        self.state().fac
    }

    /// Clamped to [0, 1].
    pub fn set_fac(&mut self, fac: f32) {
        self.state_mut().fac = clamp_fac(fac);
    }

    pub fn is_active(&self) -> bool {
        self.state().active
    }

    /// Inactive constraints blend with weight 0 but keep their `fac`.
    pub fn set_active(&mut self, active: bool) {
        self.state_mut().active = active;
    }

    /// Blend weight used this tick.
    pub fn weight(&self) -> f32 {
        let state = self.state();
        if state.active { state.fac } else { 0.0 }
    }

    pub fn setup(&mut self, t: &Transform3D) {
        self.state_mut().baseline = Baseline::from_transform(t);
    }

    pub fn setup_with(&mut self, position: Vector3, scale: Vector3, rotation: Quaternion) {
        self.state_mut().baseline = Baseline {
            position,
            scale,
            rotation,
        };
    }

    /// Blend this constraint's channel from the baseline toward the target.
    /// No-op when the target is unset or no longer resolves, and for a
    /// degenerate look direction.
    pub fn solve<L>(&self, t: &mut Transform3D, targets: &L)
    where
        L: TargetLookup + ?Sized,
    {
        let Some(id) = self.target() else {
            log::trace!("{}: no target, skipping", self.kind());
            return;
        };
        let Some(target) = targets.target_transform(id) else {
            log::trace!("{}: target {id} does not resolve, skipping", self.kind());
            return;
        };

        let weight = self.weight();
        let base = self.baseline();
        match self {
            Constraint::CopyPosition(_) => {
                t.position = base.position.lerp(target.position, weight);
            }
            Constraint::CopyRotation(_) => {
                t.rotation = base.rotation.slerp(target.rotation, weight);
            }
            Constraint::CopyScale(_) => {
                t.scale = base.scale.lerp(target.scale, weight);
            }
            Constraint::LookAt(look) => {
                let Some(desired) =
                    Quaternion::look_rotation(target.position - t.position, look.up)
                else {
                    log::trace!("{}: degenerate look direction toward {id}", self.kind());
                    return;
                };
                t.rotation = base.rotation.slerp(desired, weight);
            }
        }
    }

    /// Write the baseline back to this constraint's own channel.
    pub fn cancel(&self, t: &mut Transform3D) {
        let base = self.baseline();
        match self.kind().channel() {
            Channel::Position => t.position = base.position,
            Channel::Rotation => t.rotation = base.rotation,
            Channel::Scale => t.scale = base.scale,
        }
    }

    /// Write every baseline channel back.
    pub fn restore(&self, t: &mut Transform3D) {
        *t = self.baseline().to_transform();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const EPS: f32 = 1e-4;

    fn approx_vec(a: Vector3, b: Vector3) -> bool {
        a.distance(b) < EPS
    }

    fn target_id() -> NodeID {
        NodeID::from_parts(2, 0)
    }

    fn lookup(target: Transform3D) -> HashMap<NodeID, Transform3D> {
        HashMap::from([(target_id(), target)])
    }

    fn baseline_transform() -> Transform3D {
        Transform3D::new(
            Vector3::new(1.0, 2.0, 3.0),
            Quaternion::from_euler_degrees(10.0, 20.0, 30.0),
            Vector3::new(2.0, 2.0, 2.0),
        )
    }

    fn target_transform() -> Transform3D {
        Transform3D::new(
            Vector3::new(-4.0, 8.0, 1.5),
            Quaternion::from_euler_degrees(-35.0, 70.0, 5.0),
            Vector3::new(0.5, 3.0, 1.0),
        )
    }

    /// Differs from both the baseline and the target in every channel.
    fn scrambled() -> Transform3D {
        Transform3D::new(
            Vector3::new(9.0, -9.0, 9.0),
            Quaternion::from_euler_degrees(80.0, 0.0, 0.0),
            Vector3::new(7.0, 7.0, 7.0),
        )
    }

    fn channel_eq(kind: ConstraintKind, a: &Transform3D, b: &Transform3D) -> bool {
        match kind.channel() {
            Channel::Position => approx_vec(a.position, b.position),
            Channel::Rotation => a.rotation.angle_to(b.rotation) < 1e-3,
            Channel::Scale => approx_vec(a.scale, b.scale),
        }
    }

    fn prepared(kind: ConstraintKind) -> Constraint {
        let mut c = Constraint::new(kind, Some(target_id()));
        c.setup(&baseline_transform());
        c
    }

    #[test]
    fn inactive_yields_baseline_regardless_of_fac() {
        let targets = lookup(target_transform());
        for kind in ConstraintKind::ALL {
            let mut c = prepared(kind);
            c.set_fac(0.8);
            c.set_active(false);
            let mut t = scrambled();
            c.solve(&mut t, &targets);
            assert!(channel_eq(kind, &t, &baseline_transform()), "{kind}");
            assert_eq!(c.fac(), 0.8);
        }
    }

    #[test]
    fn zero_fac_matches_inactive() {
        let targets = lookup(target_transform());
        for kind in ConstraintKind::ALL {
            let mut zero = prepared(kind);
            zero.set_fac(0.0);
            let mut off = prepared(kind);
            off.set_active(false);

            let mut a = scrambled();
            let mut b = scrambled();
            zero.solve(&mut a, &targets);
            off.solve(&mut b, &targets);
            assert_eq!(a, b, "{kind}");
        }
    }

    #[test]
    fn full_influence_copies_target_channel() {
        let target = target_transform();
        let targets = lookup(target);
        for kind in [
            ConstraintKind::CopyPosition,
            ConstraintKind::CopyRotation,
            ConstraintKind::CopyScale,
        ] {
            let c = prepared(kind);
            let mut t = baseline_transform();
            c.solve(&mut t, &targets);
            assert!(channel_eq(kind, &t, &target), "{kind}");
        }
    }

    #[test]
    fn full_influence_look_at_faces_target() {
        let target = target_transform();
        let c = prepared(ConstraintKind::LookAt);
        let mut t = baseline_transform();
        c.solve(&mut t, &lookup(target));
        let expected = (target.position - t.position).try_normalized().unwrap();
        assert!(approx_vec(t.forward(), expected));
    }

    #[test]
    fn solve_only_touches_own_channel() {
        let targets = lookup(target_transform());
        let mut c = prepared(ConstraintKind::CopyPosition);
        c.set_fac(0.5);
        let mut t = baseline_transform();
        c.solve(&mut t, &targets);
        assert_eq!(t.rotation, baseline_transform().rotation);
        assert_eq!(t.scale, baseline_transform().scale);
    }

    #[test]
    fn missing_target_is_bitwise_noop() {
        for kind in ConstraintKind::ALL {
            let mut c = prepared(kind);
            c.set_target(None);
            let before = target_transform();
            let mut t = before;
            c.solve(&mut t, &lookup(target_transform()));
            assert_eq!(t, before, "{kind}");
        }
    }

    #[test]
    fn stale_target_is_bitwise_noop() {
        let c = prepared(ConstraintKind::CopyScale);
        let before = baseline_transform();
        let mut t = before;
        c.solve(&mut t, &HashMap::new());
        assert_eq!(t, before);
    }

    #[test]
    fn copy_position_half_way() {
        let mut c = Constraint::new(ConstraintKind::CopyPosition, Some(target_id()));
        c.setup(&Transform3D::IDENTITY);
        c.set_fac(0.5);
        let targets = lookup(Transform3D::from_position(Vector3::new(10.0, 0.0, 0.0)));
        let mut t = Transform3D::IDENTITY;
        c.solve(&mut t, &targets);
        assert_eq!(t.position, Vector3::new(5.0, 0.0, 0.0));
    }

    #[test]
    fn look_at_forward_target_is_identity() {
        let mut c = Constraint::new(ConstraintKind::LookAt, Some(target_id()));
        c.setup(&Transform3D::IDENTITY);
        let targets = lookup(Transform3D::from_position(Vector3::new(0.0, 0.0, 10.0)));
        let mut t = Transform3D::IDENTITY;
        t.rotation = Quaternion::from_euler_degrees(0.0, 45.0, 0.0);
        c.solve(&mut t, &targets);
        assert!(t.rotation.angle_to(Quaternion::IDENTITY) < 1e-3);
    }

    #[test]
    fn look_at_coincident_target_is_noop() {
        let c = prepared(ConstraintKind::LookAt);
        let before = baseline_transform();
        let mut t = before;
        c.solve(&mut t, &lookup(Transform3D::from_position(before.position)));
        assert_eq!(t, before);
    }

    #[test]
    fn cancel_restores_only_own_channel_and_is_idempotent() {
        let c = prepared(ConstraintKind::CopyRotation);
        let mut t = target_transform();
        c.cancel(&mut t);
        assert_eq!(t.rotation, baseline_transform().rotation);
        assert_eq!(t.position, target_transform().position);
        assert_eq!(t.scale, target_transform().scale);

        let once = t;
        c.cancel(&mut t);
        c.cancel(&mut t);
        assert_eq!(t, once);
    }

    #[test]
    fn restore_writes_all_channels() {
        let c = prepared(ConstraintKind::CopyScale);
        let mut t = target_transform();
        c.restore(&mut t);
        assert_eq!(t, baseline_transform());
    }

    #[test]
    fn set_fac_clamps() {
        let mut c = Constraint::new(ConstraintKind::CopyScale, None);
        c.set_fac(1.5);
        assert_eq!(c.fac(), 1.0);
        c.set_fac(-0.25);
        assert_eq!(c.fac(), 0.0);
    }

    #[test]
    fn setup_with_overwrites_baseline() {
        let mut c = Constraint::new(ConstraintKind::CopyPosition, None);
        let rot = Quaternion::from_euler_degrees(0.0, 90.0, 0.0);
        c.setup_with(Vector3::new(1.0, 1.0, 1.0), Vector3::new(3.0, 3.0, 3.0), rot);
        let b = c.baseline();
        assert_eq!(b.position, Vector3::new(1.0, 1.0, 1.0));
        assert_eq!(b.scale, Vector3::new(3.0, 3.0, 3.0));
        assert_eq!(b.rotation, rot);
    }

    #[test]
    fn record_carries_variant_tag() {
        for kind in ConstraintKind::ALL {
            let value = serde_json::to_value(Constraint::new(kind, Some(target_id()))).unwrap();
            assert_eq!(value["type"], kind.tag());
            assert_eq!(value["target"], "0000000000000002");
        }
    }

    #[test]
    fn record_fills_defaults() {
        let c: Constraint = serde_json::from_str(r#"{"type":"look_at"}"#).unwrap();
        assert_eq!(c.kind(), ConstraintKind::LookAt);
        assert_eq!(c.fac(), 1.0);
        assert!(c.is_active());
        assert_eq!(c.target(), None);
        assert_eq!(c.baseline(), Baseline::default());
        match c {
            Constraint::LookAt(look) => assert_eq!(look.up, Vector3::UP),
            other => panic!("unexpected {other:?}"),
        }
    }
}
