//! # Layout Generator
//!
//! Places ornament slots on the tree. Every slot gets two poses:
//!
//! - a **target** pose on a golden-angle spiral wrapped around a cone, which
//!   is a pure function of `(index, count, kind)`, and
//! - a **chaos** pose sampled in free space, which is random and regenerated
//!   whenever the slot is rebuilt.
//!
//! Square-root spacing along the spiral packs slots more densely toward the
//! base, following the growing circumference of the cone. Each kind starts
//! the spiral at its own angular offset so categories interleave instead of
//! stacking on top of each other.

pub mod rope;

use std::f32::consts::PI;

use cgmath::{Euler, InnerSpace, Rad, Vector3};
use rand::Rng;

use crate::config::{GroupConfig, TreeShape};

/// `π(3 − √5)`, the angle between consecutive spiral slots.
pub const GOLDEN_ANGLE: f32 = PI * 0.763_932_03;

/// Ornament category. Determines geometry, angular offset and behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrnamentKind {
    Sphere,
    Box,
    Star,
    Rod,
    Crystal,
    Photo,
}

impl OrnamentKind {
    pub const ALL: [OrnamentKind; 6] = [
        OrnamentKind::Sphere,
        OrnamentKind::Box,
        OrnamentKind::Star,
        OrnamentKind::Rod,
        OrnamentKind::Crystal,
        OrnamentKind::Photo,
    ];

    /// Position of this kind in the angular offset table.
    pub fn offset_index(self) -> usize {
        match self {
            OrnamentKind::Sphere => 0,
            OrnamentKind::Box => 1,
            OrnamentKind::Star => 2,
            OrnamentKind::Rod => 3,
            OrnamentKind::Crystal => 4,
            OrnamentKind::Photo => 5,
        }
    }

    /// Angle the spiral of this kind starts at.
    pub fn angle_offset(self) -> f32 {
        self.offset_index() as f32 * (2.0 * PI / Self::ALL.len() as f32)
    }

    /// Stars and photos sit slightly outside the silhouette.
    pub fn radial_scale(self) -> f32 {
        match self {
            OrnamentKind::Star | OrnamentKind::Photo => 1.15,
            _ => 1.08,
        }
    }

    /// Kinds that turn toward the trunk once assembled.
    pub fn faces_trunk(self) -> bool {
        matches!(
            self,
            OrnamentKind::Star | OrnamentKind::Crystal | OrnamentKind::Photo
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            OrnamentKind::Sphere => "sphere",
            OrnamentKind::Box => "box",
            OrnamentKind::Star => "star",
            OrnamentKind::Rod => "rod",
            OrnamentKind::Crystal => "crystal",
            OrnamentKind::Photo => "photo",
        }
    }
}

/// One decorative object instance. Immutable for the scene's lifetime.
#[derive(Debug, Clone, PartialEq)]
pub struct OrnamentSlot {
    pub index: usize,
    pub kind: OrnamentKind,
    pub chaos_position: Vector3<f32>,
    pub target_position: Vector3<f32>,
    pub chaos_scale: Vector3<f32>,
    pub target_scale: Vector3<f32>,
    /// Fixed orientation the idle spin starts from
    pub rotation_seed: Euler<Rad<f32>>,
    /// Roll applied to photos while scattered
    pub chaos_tilt: f32,
    pub color: [f32; 4],
    pub caption: Option<String>,
}

/// Per-group inputs that are not part of the spiral itself.
#[derive(Debug, Clone)]
pub struct SlotStyle<'a> {
    pub scale: f32,
    pub palette: &'a [[f32; 4]],
    pub captions: &'a [String],
    pub chaos_radius: f32,
    pub photo_ring: (f32, f32),
}

impl<'a> SlotStyle<'a> {
    pub fn from_group(group: &'a GroupConfig, captions: &'a [String]) -> Self {
        Self {
            scale: group.scale,
            palette: &group.palette,
            captions,
            chaos_radius: 25.0,
            photo_ring: (18.0, 14.0),
        }
    }

    pub fn with_chaos(mut self, radius: f32, photo_ring: (f32, f32)) -> Self {
        self.chaos_radius = radius;
        self.photo_ring = photo_ring;
        self
    }
}

impl Default for SlotStyle<'_> {
    fn default() -> Self {
        Self {
            scale: 1.0,
            palette: &[],
            captions: &[],
            chaos_radius: 25.0,
            photo_ring: (18.0, 14.0),
        }
    }
}

/// Position of slot `index` out of `count` on the assembled tree.
///
/// Deterministic: depends only on its arguments.
pub fn target_position(
    index: usize,
    count: usize,
    kind: OrnamentKind,
    shape: &TreeShape,
) -> Vector3<f32> {
    if count == 0 {
        return Vector3::new(0.0, shape.apex_y, 0.0);
    }
    let progress = ((index + 1) as f32 / count as f32).sqrt() * shape.progress_limit;
    let radius = progress * shape.base_radius;
    let y = shape.apex_y - progress * shape.height;
    let theta = index as f32 * GOLDEN_ANGLE + kind.angle_offset();

    Vector3::new(radius * theta.cos(), y, radius * theta.sin()) * kind.radial_scale()
}

/// All target positions of a group, in slot order.
pub fn target_positions(count: usize, kind: OrnamentKind, shape: &TreeShape) -> Vec<Vector3<f32>> {
    (0..count)
        .map(|i| target_position(i, count, kind, shape))
        .collect()
}

/// Builds `count` slots of `kind` with the default tree shape and ambient
/// randomness for the chaos poses.
pub fn compute_layout(count: usize, kind: OrnamentKind) -> Vec<OrnamentSlot> {
    compute_layout_with(
        count,
        kind,
        &TreeShape::default(),
        &SlotStyle::default(),
        &mut rand::rng(),
    )
}

/// Builds `count` slots of `kind`. Target poses follow the spiral; chaos
/// poses, scale jitter, colours and rotation seeds come from `rng`.
pub fn compute_layout_with<R: Rng>(
    count: usize,
    kind: OrnamentKind,
    shape: &TreeShape,
    style: &SlotStyle<'_>,
    rng: &mut R,
) -> Vec<OrnamentSlot> {
    let mut slots = Vec::with_capacity(count);

    for index in 0..count {
        let target_position = target_position(index, count, kind, shape);

        let (chaos_position, chaos_tilt) = if kind == OrnamentKind::Photo {
            let (ring_radius, ring_height) = style.photo_ring;
            let angle = index as f32 * GOLDEN_ANGLE + rng.random_range(-0.08f32..=0.08);
            let y = (index as f32 / count as f32 - 0.5) * ring_height;
            let tilt = ((index % 5) as f32 - 2.0) * 0.15;
            (
                Vector3::new(ring_radius * angle.cos(), y, ring_radius * angle.sin()),
                tilt,
            )
        } else {
            (random_in_sphere(rng, style.chaos_radius), 0.0)
        };

        let jitter = style.scale * rng.random_range(0.8f32..1.2);
        let mut target_scale = Vector3::new(jitter, jitter, jitter);
        if kind == OrnamentKind::Box {
            target_scale = Vector3::new(
                target_scale.x * 1.1,
                target_scale.y * 0.8,
                target_scale.z * 1.1,
            );
        }
        let chaos_scale = if kind == OrnamentKind::Photo {
            target_scale * 3.5
        } else {
            target_scale
        };

        let color = if style.palette.is_empty() {
            [1.0; 4]
        } else {
            style.palette[rng.random_range(0..style.palette.len())]
        };

        let caption = if style.captions.is_empty() {
            None
        } else {
            Some(style.captions[index % style.captions.len()].clone())
        };

        slots.push(OrnamentSlot {
            index,
            kind,
            chaos_position,
            target_position,
            chaos_scale,
            target_scale,
            rotation_seed: Euler::new(
                Rad(rng.random_range(0.0..PI)),
                Rad(rng.random_range(0.0..PI)),
                Rad(0.0),
            ),
            chaos_tilt,
            color,
            caption,
        });
    }

    slots
}

/// One particle of the tree body.
#[derive(Debug, Clone, PartialEq)]
pub struct FoliageParticle {
    pub chaos_position: Vector3<f32>,
    pub target_position: Vector3<f32>,
    pub scale: f32,
    pub color: [f32; 4],
}

/// Fills the cone volume with `count` particles coloured along a
/// bottom-to-top gradient.
pub fn compute_foliage<R: Rng>(
    count: usize,
    shape: &TreeShape,
    colors: ([f32; 4], [f32; 4]),
    chaos_radius: f32,
    rng: &mut R,
) -> Vec<FoliageParticle> {
    let (bottom, top) = colors;
    (0..count)
        .map(|_| {
            // Height fraction biased toward the base, where the cone is wider.
            let h = 1.0 - rng.random::<f32>().sqrt();
            let y = shape.apex_y - (1.0 - h) * shape.height;
            let max_radius = (1.0 - h) * shape.base_radius;
            let radius = max_radius * rng.random::<f32>().sqrt();
            let theta = rng.random_range(0.0..2.0 * PI);

            let mut color = [0.0; 4];
            for (c, (b, t)) in color.iter_mut().zip(bottom.iter().zip(top.iter())) {
                *c = b + (t - b) * h;
            }

            FoliageParticle {
                chaos_position: random_in_sphere(rng, chaos_radius),
                target_position: Vector3::new(radius * theta.cos(), y, radius * theta.sin()),
                scale: rng.random_range(0.06..0.14),
                color,
            }
        })
        .collect()
}

/// Uniform sample inside a sphere of `radius` around the origin.
pub fn random_in_sphere<R: Rng>(rng: &mut R, radius: f32) -> Vector3<f32> {
    loop {
        let candidate = Vector3::new(
            rng.random_range(-1.0f32..=1.0),
            rng.random_range(-1.0f32..=1.0),
            rng.random_range(-1.0f32..=1.0),
        );
        if candidate.magnitude2() <= 1.0 {
            return candidate * radius;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn test_golden_angle_value() {
        let expected = PI * (3.0 - 5.0f32.sqrt());
        assert!((GOLDEN_ANGLE - expected).abs() < 1e-5);
    }

    #[test]
    fn test_targets_are_deterministic() {
        let shape = TreeShape::default();
        for kind in OrnamentKind::ALL {
            let a = compute_layout(40, kind);
            let b = compute_layout(40, kind);
            let ta: Vec<_> = a.iter().map(|s| s.target_position).collect();
            let tb: Vec<_> = b.iter().map(|s| s.target_position).collect();
            assert_eq!(ta, tb);
            assert_eq!(ta, target_positions(40, kind, &shape));
        }
    }

    #[test]
    fn test_targets_do_not_overlap() {
        let targets = target_positions(200, OrnamentKind::Sphere, &TreeShape::default());
        for i in 0..targets.len() {
            for j in (i + 1)..targets.len() {
                assert!(
                    (targets[i] - targets[j]).magnitude() > 1e-3,
                    "slots {i} and {j} overlap"
                );
            }
        }
    }

    #[test]
    fn test_photo_spiral_descends() {
        let slots = compute_layout(12, OrnamentKind::Photo);
        assert_eq!(slots.len(), 12);
        for pair in slots.windows(2) {
            assert!(pair[1].target_position.y < pair[0].target_position.y);
        }
    }

    #[test]
    fn test_kinds_start_at_different_angles() {
        let shape = TreeShape::default();
        let sphere = target_position(0, 10, OrnamentKind::Sphere, &shape);
        let star = target_position(0, 10, OrnamentKind::Star, &shape);
        assert!((sphere.x - star.x).abs() > 1e-3 || (sphere.z - star.z).abs() > 1e-3);
    }

    #[test]
    fn test_radial_scale_applied() {
        let shape = TreeShape::default();
        let last = target_position(9, 10, OrnamentKind::Photo, &shape);
        let radius = (last.x * last.x + last.z * last.z).sqrt();
        let expected = shape.progress_limit * shape.base_radius * 1.15;
        assert!((radius - expected).abs() < 1e-4);
    }

    #[test]
    fn test_zero_count_is_empty() {
        assert!(compute_layout(0, OrnamentKind::Sphere).is_empty());
    }

    #[test]
    fn test_chaos_positions_within_radius() {
        let mut rng = StdRng::seed_from_u64(7);
        let style = SlotStyle::default();
        let slots = compute_layout_with(
            100,
            OrnamentKind::Crystal,
            &TreeShape::default(),
            &style,
            &mut rng,
        );
        for slot in &slots {
            assert!(slot.chaos_position.magnitude() <= style.chaos_radius + 1e-4);
            assert_eq!(slot.chaos_tilt, 0.0);
        }
    }

    #[test]
    fn test_photo_chaos_ring_and_scale() {
        let mut rng = StdRng::seed_from_u64(11);
        let slots = compute_layout_with(
            10,
            OrnamentKind::Photo,
            &TreeShape::default(),
            &SlotStyle::default(),
            &mut rng,
        );
        for slot in &slots {
            let ring = (slot.chaos_position.x.powi(2) + slot.chaos_position.z.powi(2)).sqrt();
            assert!((ring - 18.0).abs() < 1e-3);
            assert!(slot.chaos_position.y.abs() <= 7.0);
            assert!((slot.chaos_scale.x - slot.target_scale.x * 3.5).abs() < 1e-5);
        }
        assert!((slots[0].chaos_tilt - (-0.3)).abs() < 1e-6);
        assert!((slots[2].chaos_tilt).abs() < 1e-6);
    }

    #[test]
    fn test_box_scale_is_flattened() {
        let mut rng = StdRng::seed_from_u64(3);
        let slots = compute_layout_with(
            5,
            OrnamentKind::Box,
            &TreeShape::default(),
            &SlotStyle::default(),
            &mut rng,
        );
        for slot in &slots {
            assert!(slot.target_scale.y < slot.target_scale.x);
            assert!((slot.target_scale.x - slot.target_scale.z).abs() < 1e-6);
        }
    }

    #[test]
    fn test_captions_assigned_cyclically() {
        let captions = vec!["a".to_string(), "b".to_string()];
        let style = SlotStyle {
            captions: &captions,
            ..SlotStyle::default()
        };
        let mut rng = StdRng::seed_from_u64(1);
        let slots = compute_layout_with(
            5,
            OrnamentKind::Photo,
            &TreeShape::default(),
            &style,
            &mut rng,
        );
        let got: Vec<_> = slots.iter().map(|s| s.caption.clone().unwrap()).collect();
        assert_eq!(got, vec!["a", "b", "a", "b", "a"]);
    }

    #[test]
    fn test_foliage_inside_cone() {
        let shape = TreeShape::default();
        let mut rng = StdRng::seed_from_u64(5);
        let colors = ([0.0, 0.0, 0.0, 1.0], [1.0, 1.0, 1.0, 1.0]);
        for p in compute_foliage(300, &shape, colors, 25.0, &mut rng) {
            let depth = (shape.apex_y - p.target_position.y) / shape.height;
            assert!((0.0..=1.0 + 1e-5).contains(&depth));
            let r = (p.target_position.x.powi(2) + p.target_position.z.powi(2)).sqrt();
            assert!(r <= depth * shape.base_radius + 1e-4);
        }
    }
}
