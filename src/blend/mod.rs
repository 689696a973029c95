//! # Transition / Blend Engine
//!
//! Every ornament owns a [`BlendState`]: a scalar `current_mix` that chases the
//! externally supplied mix factor by exponential smoothing. The ornament's
//! pose is derived from it each frame:
//!
//! - **position** and **scale** interpolate linearly between the chaos and
//!   target values,
//! - zoom-compensated kinds get an extra distance-based scale while the
//!   ornament is still (partly) scattered,
//! - **orientation** depends on the kind: facing kinds turn toward the trunk
//!   once assembled and toward the camera while scattered, the rest keep
//!   their rotation seed plus an idle spin.
//!
//! Nothing here is ever assigned directly. The mix, the photo tilt and the
//! orientation are all eased, so toggling the target mid-transition only
//! moves the asymptote.

use std::f32::consts::PI;

use cgmath::{
    Euler, InnerSpace, Matrix3, Matrix4, One, Quaternion, Rad, Rotation3, Vector3, Zero,
};

use crate::config::BlendConfig;
use crate::layout::{OrnamentKind, OrnamentSlot};

/// Speed at which orientation follows its desired value, per second.
const ORIENTATION_RATE: f32 = 6.0;

/// Smoothed mix between the chaotic (0) and assembled (1) states.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlendState {
    current_mix: f32,
}

impl BlendState {
    pub fn new(initial_mix: f32) -> Self {
        Self {
            current_mix: initial_mix.clamp(0.0, 1.0),
        }
    }

    pub fn current(&self) -> f32 {
        self.current_mix
    }

    /// Moves `current_mix` toward `mix_factor`.
    ///
    /// The step fraction `rate * delta` is capped at 1 so a long frame lands
    /// on the target instead of overshooting it.
    pub fn tick(&mut self, mix_factor: f32, rate: f32, delta: f32) -> f32 {
        let target = mix_factor.clamp(0.0, 1.0);
        let step = (rate * delta).clamp(0.0, 1.0);
        self.current_mix = (self.current_mix + (target - self.current_mix) * step).clamp(0.0, 1.0);
        self.current_mix
    }

    pub fn is_settled(&self, mix_factor: f32, epsilon: f32) -> bool {
        (self.current_mix - mix_factor).abs() <= epsilon
    }
}

impl Default for BlendState {
    fn default() -> Self {
        Self::new(1.0)
    }
}

/// Position, scale and orientation of one rendered object.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub position: Vector3<f32>,
    pub scale: Vector3<f32>,
    pub rotation: Quaternion<f32>,
}

impl Pose {
    pub fn new(position: Vector3<f32>, scale: Vector3<f32>, rotation: Quaternion<f32>) -> Self {
        Self {
            position,
            scale,
            rotation,
        }
    }

    pub fn identity() -> Self {
        Self::new(Vector3::zero(), Vector3::new(1.0, 1.0, 1.0), Quaternion::one())
    }

    /// Translation * rotation * scale.
    pub fn to_matrix(&self) -> Matrix4<f32> {
        Matrix4::from_translation(self.position)
            * Matrix4::from(self.rotation)
            * Matrix4::from_nonuniform_scale(self.scale.x, self.scale.y, self.scale.z)
    }

    /// Pose of a child placed at `local` relative to this pose.
    pub fn child(&self, local: &Pose) -> Pose {
        let offset = Vector3::new(
            local.position.x * self.scale.x,
            local.position.y * self.scale.y,
            local.position.z * self.scale.z,
        );
        Pose {
            position: self.position + self.rotation * offset,
            scale: Vector3::new(
                self.scale.x * local.scale.x,
                self.scale.y * local.scale.y,
                self.scale.z * local.scale.z,
            ),
            rotation: self.rotation * local.rotation,
        }
    }
}

/// What the engine needs to know about the viewer this frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewContext {
    pub camera_position: Vector3<f32>,
    /// Narrow viewport; shrinks zoom-compensated kinds
    pub compact: bool,
}

impl ViewContext {
    pub fn new(camera_position: Vector3<f32>) -> Self {
        Self {
            camera_position,
            compact: false,
        }
    }
}

/// One ornament slot with its running blend state.
#[derive(Debug, Clone)]
pub struct OrnamentBlend {
    slot: OrnamentSlot,
    state: BlendState,
    /// Accumulated idle spin, radians
    spin: f32,
    /// Current photo roll, eased toward 0 or the slot's chaos tilt
    tilt: f32,
    orientation: Option<Quaternion<f32>>,
    pose: Pose,
}

impl OrnamentBlend {
    pub fn new(slot: OrnamentSlot, initial_mix: f32) -> Self {
        let state = BlendState::new(initial_mix);
        let t = state.current();
        let pose = Pose::new(
            lerp_vec(slot.chaos_position, slot.target_position, t),
            lerp_vec(slot.chaos_scale, slot.target_scale, t),
            Quaternion::from(slot.rotation_seed),
        );
        let tilt = if t > 0.8 { 0.0 } else { slot.chaos_tilt };
        Self {
            slot,
            state,
            spin: 0.0,
            tilt,
            orientation: None,
            pose,
        }
    }

    pub fn slot(&self) -> &OrnamentSlot {
        &self.slot
    }

    pub fn kind(&self) -> OrnamentKind {
        self.slot.kind
    }

    pub fn current_mix(&self) -> f32 {
        self.state.current()
    }

    /// Pose computed by the last [`tick`](Self::tick).
    pub fn pose(&self) -> &Pose {
        &self.pose
    }

    /// Advances one frame and returns the new pose.
    pub fn tick(
        &mut self,
        mix_factor: f32,
        delta: f32,
        view: &ViewContext,
        config: &BlendConfig,
    ) -> Pose {
        let delta = delta.max(0.0);
        let t = self.state.tick(mix_factor, config.rate, delta);
        let ease = (config.rate * delta).clamp(0.0, 1.0);

        let position = lerp_vec(self.slot.chaos_position, self.slot.target_position, t);
        let scale = self.scale_at(t, position, view, config);

        let assembled = t > config.face_threshold;
        if self.kind() == OrnamentKind::Photo {
            let tilt_target = if assembled { 0.0 } else { self.slot.chaos_tilt };
            self.tilt += (tilt_target - self.tilt) * ease;
        }
        if t < config.spin_threshold && !self.kind().faces_trunk() {
            self.spin += delta * config.spin_rate;
        }

        let desired = self.desired_orientation(position, assembled, view);
        let rotation = match self.orientation {
            Some(current) => ease_rotation(current, desired, (ORIENTATION_RATE * delta).min(1.0)),
            None => desired,
        };
        self.orientation = Some(rotation);

        self.pose = Pose::new(position, scale, rotation);
        self.pose
    }

    fn scale_at(
        &self,
        t: f32,
        position: Vector3<f32>,
        view: &ViewContext,
        config: &BlendConfig,
    ) -> Vector3<f32> {
        let mut scale = lerp_vec(self.slot.chaos_scale, self.slot.target_scale, t);
        if !config.zoom_kinds.contains(&self.kind()) {
            return scale;
        }

        if view.compact {
            scale *= config.compact_scale;
        }
        if t < config.zoom_cutoff {
            let near = if view.compact {
                config.compact_zoom_near
            } else {
                config.zoom_scale.0
            };
            let distance = (position - view.camera_position).magnitude();
            let zoom = zoom_multiplier(distance, config.zoom_distance, (near, config.zoom_scale.1));
            scale *= lerp(1.0, zoom, 1.0 - t);
        }
        scale
    }

    fn desired_orientation(
        &self,
        position: Vector3<f32>,
        assembled: bool,
        view: &ViewContext,
    ) -> Quaternion<f32> {
        let trunk = Vector3::new(0.0, position.y, 0.0);
        match self.kind() {
            OrnamentKind::Photo => {
                let facing = if assembled {
                    look_rotation(position, trunk) * Quaternion::from_angle_y(Rad(PI))
                } else {
                    look_rotation(position, view.camera_position)
                };
                facing * Quaternion::from_angle_z(Rad(self.tilt))
            }
            OrnamentKind::Star if assembled => {
                look_rotation(position, trunk) * Quaternion::from_angle_z(Rad(PI / 2.0))
            }
            OrnamentKind::Crystal if assembled => look_rotation(position, trunk),
            _ => {
                let seed = self.slot.rotation_seed;
                Quaternion::from(Euler::new(
                    seed.x + Rad(self.spin),
                    seed.y + Rad(self.spin),
                    seed.z,
                ))
            }
        }
    }
}

/// Ticks every blend of a group against one shared mix factor.
pub fn tick_all(
    blends: &mut [OrnamentBlend],
    mix_factor: f32,
    delta: f32,
    view: &ViewContext,
    config: &BlendConfig,
) {
    for blend in blends.iter_mut() {
        blend.tick(mix_factor, delta, view, config);
    }
}

pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

pub fn lerp_vec(a: Vector3<f32>, b: Vector3<f32>, t: f32) -> Vector3<f32> {
    a + (b - a) * t
}

/// Maps a camera distance in `distance` onto `scale`, clamped to the range.
pub fn zoom_multiplier(distance: f32, range: (f32, f32), scale: (f32, f32)) -> f32 {
    let (d0, d1) = range;
    let (s0, s1) = scale;
    if (d1 - d0).abs() < f32::EPSILON {
        return s0;
    }
    let mapped = s0 + (distance - d0) * (s1 - s0) / (d1 - d0);
    mapped.clamp(s0.min(s1), s0.max(s1))
}

/// Rotation turning the local +Z axis from `from` toward `target`, keeping +Y up.
pub fn look_rotation(from: Vector3<f32>, target: Vector3<f32>) -> Quaternion<f32> {
    let forward = target - from;
    if forward.magnitude2() < 1e-10 {
        return Quaternion::one();
    }
    let z = forward.normalize();
    let mut x = Vector3::unit_y().cross(z);
    if x.magnitude2() < 1e-10 {
        // Looking straight up or down; any horizontal axis will do.
        x = Vector3::unit_x();
    }
    let x = x.normalize();
    let y = z.cross(x);
    Quaternion::from(Matrix3::from_cols(x, y, z)).normalize()
}

/// Normalised interpolation along the shorter arc.
pub fn ease_rotation(from: Quaternion<f32>, to: Quaternion<f32>, amount: f32) -> Quaternion<f32> {
    let to = if from.dot(to) < 0.0 { -to } else { to };
    from.nlerp(to, amount.clamp(0.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{compute_layout_with, SlotStyle};
    use crate::config::TreeShape;
    use rand::{rngs::StdRng, SeedableRng};

    fn slots(kind: OrnamentKind, count: usize) -> Vec<OrnamentSlot> {
        let mut rng = StdRng::seed_from_u64(42);
        compute_layout_with(count, kind, &TreeShape::default(), &SlotStyle::default(), &mut rng)
    }

    fn view() -> ViewContext {
        ViewContext::new(Vector3::new(0.0, 0.0, 40.0))
    }

    #[test]
    fn test_blend_converges_monotonically() {
        let mut state = BlendState::new(1.0);
        let mut last = state.current();
        for _ in 0..600 {
            let now = state.tick(0.0, 2.0, 1.0 / 60.0);
            assert!(now <= last);
            assert!((0.0..=1.0).contains(&now));
            last = now;
        }
        assert!(state.is_settled(0.0, 1e-3));
    }

    #[test]
    fn test_blend_never_overshoots_on_long_frames() {
        let mut state = BlendState::new(0.0);
        let now = state.tick(1.0, 2.0, 5.0);
        assert_eq!(now, 1.0);
        let now = state.tick(1.0, 2.0, 5.0);
        assert_eq!(now, 1.0);
    }

    #[test]
    fn test_toggle_reverses_smoothly() {
        let mut state = BlendState::new(1.0);
        let dt = 1.0 / 60.0;
        let mut curve = vec![state.current()];
        for frame in 0..90 {
            let target = if (20..45).contains(&frame) { 0.0 } else { 1.0 };
            curve.push(state.tick(target, 2.0, dt));
        }
        // Bounded per-frame change: no jumps.
        for pair in curve.windows(2) {
            assert!((pair[1] - pair[0]).abs() <= 2.0 * dt + 1e-6);
        }
        let lowest = curve.iter().cloned().fold(f32::MAX, f32::min);
        assert!(lowest > 0.0 && lowest < 1.0);
        assert!(*curve.last().unwrap() > lowest);
    }

    #[test]
    fn test_pose_endpoints() {
        let slot = slots(OrnamentKind::Sphere, 5).remove(2);
        let config = BlendConfig::default();

        let mut assembled = OrnamentBlend::new(slot.clone(), 1.0);
        let pose = assembled.tick(1.0, 0.016, &view(), &config);
        assert!((pose.position - slot.target_position).magnitude() < 1e-5);
        assert!((pose.scale - slot.target_scale).magnitude() < 1e-5);

        let mut scattered = OrnamentBlend::new(slot.clone(), 0.0);
        let pose = scattered.tick(0.0, 0.016, &view(), &config);
        assert!((pose.position - slot.chaos_position).magnitude() < 1e-5);
    }

    #[test]
    fn test_zoom_multiplier_is_clamped() {
        assert_eq!(zoom_multiplier(0.0, (10.0, 60.0), (1.6, 0.6)), 1.6);
        assert_eq!(zoom_multiplier(100.0, (10.0, 60.0), (1.6, 0.6)), 0.6);
        assert!((zoom_multiplier(35.0, (10.0, 60.0), (1.6, 0.6)) - 1.1).abs() < 1e-6);
    }

    #[test]
    fn test_photo_zoom_only_while_scattered() {
        let slot = slots(OrnamentKind::Photo, 4).remove(0);
        let config = BlendConfig::default();
        let near_camera = ViewContext::new(slot.chaos_position + Vector3::new(0.0, 0.0, 5.0));

        let mut scattered = OrnamentBlend::new(slot.clone(), 0.0);
        let pose = scattered.tick(0.0, 0.0, &near_camera, &config);
        assert!((pose.scale.x - slot.chaos_scale.x * 1.6).abs() < 1e-4);

        let mut assembled = OrnamentBlend::new(slot.clone(), 1.0);
        let pose = assembled.tick(1.0, 0.0, &near_camera, &config);
        assert!((pose.scale.x - slot.target_scale.x).abs() < 1e-5);
    }

    #[test]
    fn test_compact_view_shrinks_photos() {
        let slot = slots(OrnamentKind::Photo, 4).remove(1);
        let config = BlendConfig::default();
        let mut compact = view();
        compact.compact = true;
        let mut blend = OrnamentBlend::new(slot.clone(), 1.0);
        let pose = blend.tick(1.0, 0.0, &compact, &config);
        assert!((pose.scale.x - slot.target_scale.x * 0.75).abs() < 1e-5);
    }

    #[test]
    fn test_assembled_star_faces_trunk() {
        let slot = slots(OrnamentKind::Star, 10).remove(9);
        let mut blend = OrnamentBlend::new(slot.clone(), 1.0);
        let pose = blend.tick(1.0, 0.016, &view(), &BlendConfig::default());
        let forward = pose.rotation * Vector3::unit_z();
        let to_trunk = (Vector3::new(0.0, slot.target_position.y, 0.0) - slot.target_position)
            .normalize();
        assert!(forward.dot(to_trunk) > 0.999);
    }

    #[test]
    fn test_scattered_photo_faces_camera() {
        let slot = slots(OrnamentKind::Photo, 6).remove(3);
        let mut blend = OrnamentBlend::new(slot.clone(), 0.0);
        let pose = blend.tick(0.0, 0.016, &view(), &BlendConfig::default());
        let forward = pose.rotation * Vector3::unit_z();
        let to_camera = (view().camera_position - pose.position).normalize();
        assert!(forward.dot(to_camera) > 0.999);
    }

    #[test]
    fn test_idle_spin_only_while_scattered() {
        let slot = slots(OrnamentKind::Sphere, 3).remove(0);
        let config = BlendConfig::default();

        let mut assembled = OrnamentBlend::new(slot.clone(), 1.0);
        let first = assembled.tick(1.0, 0.1, &view(), &config).rotation;
        let later = assembled.tick(1.0, 0.1, &view(), &config).rotation;
        assert!(first.dot(later).abs() > 0.9999);

        let mut scattered = OrnamentBlend::new(slot, 0.0);
        let first = scattered.tick(0.0, 0.1, &view(), &config).rotation;
        for _ in 0..10 {
            scattered.tick(0.0, 0.1, &view(), &config);
        }
        let later = scattered.pose().rotation;
        assert!(first.dot(later).abs() < 0.9999);
    }

    #[test]
    fn test_look_rotation_straight_up() {
        let q = look_rotation(Vector3::zero(), Vector3::new(0.0, 5.0, 0.0));
        let forward = q * Vector3::unit_z();
        assert!((forward - Vector3::unit_y()).magnitude() < 1e-4);
    }

    #[test]
    fn test_child_pose_offsets_by_parent_scale() {
        let parent = Pose::new(
            Vector3::new(1.0, 0.0, 0.0),
            Vector3::new(2.0, 2.0, 2.0),
            Quaternion::one(),
        );
        let child = parent.child(&Pose::new(
            Vector3::new(0.0, 0.5, 0.0),
            Vector3::new(1.0, 1.0, 1.0),
            Quaternion::one(),
        ));
        assert!((child.position - Vector3::new(1.0, 1.0, 0.0)).magnitude() < 1e-6);
        assert_eq!(child.scale, Vector3::new(2.0, 2.0, 2.0));
    }

    #[test]
    fn test_empty_group_is_noop() {
        let mut blends: Vec<OrnamentBlend> = Vec::new();
        tick_all(&mut blends, 0.0, 0.016, &view(), &BlendConfig::default());
        assert!(blends.is_empty());
    }
}
