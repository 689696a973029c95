//! Decorative rope strung across the scene.
//!
//! The rope is a centripetal Catmull-Rom curve through a handful of control
//! points. Items hang from it at even arc-length spacing and sway on their
//! own periodic clocks; they never take part in the chaos/assembled blend.

use cgmath::{Euler, InnerSpace, Rad, Vector3};
use rand::Rng;

/// Control points of the default rope, running from upper left to lower right.
pub const DEFAULT_ROPE: [[f32; 3]; 4] = [
    [-25.0, 18.0, -10.0],
    [-10.0, 5.0, -8.0],
    [5.0, -5.0, -8.0],
    [25.0, -18.0, -10.0],
];

/// Offset from the rope to the item's pivot.
const HANG_OFFSET: [f32; 3] = [0.0, -0.8, 0.1];

/// Resolution of the arc-length lookup table.
const ARC_DIVISIONS: usize = 200;

/// Centripetal Catmull-Rom spline with arc-length parameterisation.
#[derive(Debug, Clone)]
pub struct CatmullRomCurve {
    points: Vec<Vector3<f32>>,
    arc_lengths: Vec<f32>,
}

impl CatmullRomCurve {
    /// Builds the curve. Fewer than two points yields a degenerate curve that
    /// always evaluates to the single point (or the origin).
    pub fn new(points: Vec<Vector3<f32>>) -> Self {
        let mut curve = Self {
            points,
            arc_lengths: Vec::new(),
        };
        curve.arc_lengths = curve.compute_arc_lengths();
        curve
    }

    pub fn control_points(&self) -> &[Vector3<f32>] {
        &self.points
    }

    /// Total length of the curve.
    pub fn length(&self) -> f32 {
        self.arc_lengths.last().copied().unwrap_or(0.0)
    }

    /// Point at curve parameter `t ∈ [0, 1]` (not arc-length uniform).
    pub fn point(&self, t: f32) -> Vector3<f32> {
        let n = self.points.len();
        match n {
            0 => return Vector3::new(0.0, 0.0, 0.0),
            1 => return self.points[0],
            _ => {}
        }

        let p = (n - 1) as f32 * t.clamp(0.0, 1.0);
        let mut segment = p.floor() as usize;
        let mut weight = p - segment as f32;
        if segment >= n - 1 {
            segment = n - 2;
            weight = 1.0;
        }

        let p1 = self.points[segment];
        let p2 = self.points[segment + 1];
        // Endpoints are extrapolated by mirroring their neighbour.
        let p0 = if segment > 0 {
            self.points[segment - 1]
        } else {
            p1 + (p1 - p2)
        };
        let p3 = if segment + 2 < n {
            self.points[segment + 2]
        } else {
            p2 + (p2 - p1)
        };

        let mut dt0 = (p1 - p0).magnitude2().powf(0.25);
        let mut dt1 = (p2 - p1).magnitude2().powf(0.25);
        let mut dt2 = (p3 - p2).magnitude2().powf(0.25);
        if dt1 < 1e-4 {
            dt1 = 1.0;
        }
        if dt0 < 1e-4 {
            dt0 = dt1;
        }
        if dt2 < 1e-4 {
            dt2 = dt1;
        }

        let t1 = ((p1 - p0) / dt0 - (p2 - p0) / (dt0 + dt1) + (p2 - p1) / dt1) * dt1;
        let t2 = ((p2 - p1) / dt1 - (p3 - p1) / (dt1 + dt2) + (p3 - p2) / dt2) * dt1;

        let c2 = p1 * -3.0 + p2 * 3.0 - t1 * 2.0 - t2;
        let c3 = p1 * 2.0 - p2 * 2.0 + t1 + t2;
        let w = weight;
        p1 + t1 * w + c2 * (w * w) + c3 * (w * w * w)
    }

    /// Point at arc-length fraction `u ∈ [0, 1]`.
    pub fn point_at(&self, u: f32) -> Vector3<f32> {
        self.point(self.u_to_t(u))
    }

    /// `count + 1` points evenly spaced along the arc length.
    pub fn spaced_points(&self, count: usize) -> Vec<Vector3<f32>> {
        let count = count.max(1);
        (0..=count)
            .map(|i| self.point_at(i as f32 / count as f32))
            .collect()
    }

    fn compute_arc_lengths(&self) -> Vec<f32> {
        let mut lengths = Vec::with_capacity(ARC_DIVISIONS + 1);
        let mut last = self.point(0.0);
        let mut total = 0.0;
        lengths.push(0.0);
        for i in 1..=ARC_DIVISIONS {
            let current = self.point(i as f32 / ARC_DIVISIONS as f32);
            total += (current - last).magnitude();
            lengths.push(total);
            last = current;
        }
        lengths
    }

    fn u_to_t(&self, u: f32) -> f32 {
        let total = self.length();
        if total <= 0.0 {
            return u.clamp(0.0, 1.0);
        }
        let target = u.clamp(0.0, 1.0) * total;
        let i = self
            .arc_lengths
            .partition_point(|&len| len < target)
            .clamp(1, ARC_DIVISIONS);
        let before = self.arc_lengths[i - 1];
        let after = self.arc_lengths[i];
        let span = after - before;
        let fraction = if span > 0.0 {
            (target - before) / span
        } else {
            0.0
        };
        ((i - 1) as f32 + fraction) / ARC_DIVISIONS as f32
    }
}

/// What hangs from the rope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HangingKind {
    /// A small framed photo; `image` indexes the photo list cyclically
    Photo { image: usize },
    Hat,
    Sock,
}

/// One item hanging from the rope.
#[derive(Debug, Clone, PartialEq)]
pub struct HangingItem {
    pub kind: HangingKind,
    pub position: Vector3<f32>,
    /// Random start of the sway clock
    pub phase: f32,
}

impl HangingItem {
    pub fn scale(&self) -> f32 {
        match self.kind {
            HangingKind::Photo { .. } => 1.0,
            HangingKind::Hat => 0.6,
            HangingKind::Sock => 0.5,
        }
    }

    /// Orientation after `elapsed` seconds of swaying.
    pub fn sway(&self, elapsed: f32) -> Euler<Rad<f32>> {
        let t = self.phase + elapsed;
        match self.kind {
            HangingKind::Photo { .. } => {
                Euler::new(Rad(0.0), Rad((t * 0.8).cos() * 0.05), Rad(t.sin() * 0.1))
            }
            HangingKind::Hat => Euler::new(Rad(0.0), Rad(0.0), Rad((t * 1.2).sin() * 0.15)),
            HangingKind::Sock => Euler::new(Rad(0.0), Rad(0.0), Rad(t.cos() * 0.12)),
        }
    }
}

/// The rope curve plus everything hung from it.
#[derive(Debug, Clone)]
pub struct Rope {
    pub curve: CatmullRomCurve,
    pub items: Vec<HangingItem>,
    /// Polyline used to draw the rope itself
    pub line: Vec<Vector3<f32>>,
}

impl Rope {
    /// Builds the default rope with `item_count` items. Photos are only
    /// chosen when `photo_count > 0`.
    pub fn new<R: Rng>(item_count: usize, photo_count: usize, samples: usize, rng: &mut R) -> Self {
        let points = DEFAULT_ROPE
            .iter()
            .map(|p| Vector3::new(p[0], p[1], p[2]))
            .collect();
        Self::along(CatmullRomCurve::new(points), item_count, photo_count, samples, rng)
    }

    pub fn along<R: Rng>(
        curve: CatmullRomCurve,
        item_count: usize,
        photo_count: usize,
        samples: usize,
        rng: &mut R,
    ) -> Self {
        let offset = Vector3::new(HANG_OFFSET[0], HANG_OFFSET[1], HANG_OFFSET[2]);
        let items = (0..item_count)
            .map(|i| {
                let u = (i as f32 + 0.5) / item_count as f32;
                let roll: f32 = rng.random();
                let kind = if roll > 0.6 && photo_count > 0 {
                    HangingKind::Photo {
                        image: i % photo_count,
                    }
                } else if roll > 0.3 {
                    HangingKind::Hat
                } else {
                    HangingKind::Sock
                };
                HangingItem {
                    kind,
                    position: curve.point_at(u) + offset,
                    phase: rng.random_range(0.0f32..10.0),
                }
            })
            .collect();
        let line = curve.spaced_points(samples);

        Self { curve, items, line }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    fn default_curve() -> CatmullRomCurve {
        CatmullRomCurve::new(
            DEFAULT_ROPE
                .iter()
                .map(|p| Vector3::new(p[0], p[1], p[2]))
                .collect(),
        )
    }

    #[test]
    fn test_curve_passes_through_control_points() {
        let curve = default_curve();
        let n = curve.control_points().len();
        for (i, cp) in curve.control_points().iter().enumerate() {
            let p = curve.point(i as f32 / (n - 1) as f32);
            assert!((p - *cp).magnitude() < 1e-3, "point {i} missed: {p:?}");
        }
    }

    #[test]
    fn test_spaced_points_are_even() {
        let curve = default_curve();
        let points = curve.spaced_points(50);
        let gaps: Vec<f32> = points.windows(2).map(|w| (w[1] - w[0]).magnitude()).collect();
        let mean = gaps.iter().sum::<f32>() / gaps.len() as f32;
        for gap in gaps {
            assert!((gap - mean).abs() / mean < 0.05);
        }
    }

    #[test]
    fn test_items_hang_below_rope() {
        let mut rng = StdRng::seed_from_u64(9);
        let rope = Rope::new(12, 4, 100, &mut rng);
        assert_eq!(rope.items.len(), 12);
        assert_eq!(rope.line.len(), 101);
        for (i, item) in rope.items.iter().enumerate() {
            let on_rope = rope.curve.point_at((i as f32 + 0.5) / 12.0);
            assert!((item.position.y - (on_rope.y - 0.8)).abs() < 1e-4);
        }
    }

    #[test]
    fn test_no_photos_without_images() {
        let mut rng = StdRng::seed_from_u64(2);
        let rope = Rope::new(40, 0, 10, &mut rng);
        assert!(rope
            .items
            .iter()
            .all(|item| !matches!(item.kind, HangingKind::Photo { .. })));
    }

    #[test]
    fn test_sway_is_bounded() {
        let item = HangingItem {
            kind: HangingKind::Hat,
            position: Vector3::new(0.0, 0.0, 0.0),
            phase: 1.3,
        };
        for step in 0..100 {
            let sway = item.sway(step as f32 * 0.1);
            assert!(sway.z.0.abs() <= 0.15 + 1e-6);
        }
    }
}
