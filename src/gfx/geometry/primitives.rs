//! # Primitive Shape Generation
//!
//! All shapes are Y-up and centred on the origin. Curved surfaces get smooth
//! normals, faceted ones (star, icosahedron) flat normals.

use super::GeometryData;
use std::f32::consts::PI;

/// Unit cube from -0.5 to 0.5 on all axes.
pub fn generate_cube() -> GeometryData {
    generate_cuboid(1.0, 1.0, 1.0)
}

/// Axis-aligned box with the given full extents.
pub fn generate_cuboid(width: f32, height: f32, depth: f32) -> GeometryData {
    let (x, y, z) = (width * 0.5, height * 0.5, depth * 0.5);
    let mut data = GeometryData::new();

    #[rustfmt::skip]
    let faces: [([f32; 3], [[f32; 3]; 4]); 6] = [
        ([0.0, 0.0, 1.0],  [[-x, -y,  z], [ x, -y,  z], [ x,  y,  z], [-x,  y,  z]]),
        ([0.0, 0.0, -1.0], [[ x, -y, -z], [-x, -y, -z], [-x,  y, -z], [ x,  y, -z]]),
        ([-1.0, 0.0, 0.0], [[-x, -y, -z], [-x, -y,  z], [-x,  y,  z], [-x,  y, -z]]),
        ([1.0, 0.0, 0.0],  [[ x, -y,  z], [ x, -y, -z], [ x,  y, -z], [ x,  y,  z]]),
        ([0.0, 1.0, 0.0],  [[-x,  y,  z], [ x,  y,  z], [ x,  y, -z], [-x,  y, -z]]),
        ([0.0, -1.0, 0.0], [[-x, -y, -z], [ x, -y, -z], [ x, -y,  z], [-x, -y,  z]]),
    ];

    for (normal, corners) in faces {
        let base = data.vertices.len() as u32;
        data.vertices.extend_from_slice(&corners);
        data.normals.extend_from_slice(&[normal; 4]);
        data.indices
            .extend_from_slice(&[base, base + 1, base + 2, base + 2, base + 3, base]);
    }

    data
}

/// Unit quad in the XY plane facing +Z, from -0.5 to 0.5.
pub fn generate_quad() -> GeometryData {
    let mut data = GeometryData::new();
    data.vertices
        .extend_from_slice(&[[-0.5, -0.5, 0.0], [0.5, -0.5, 0.0], [0.5, 0.5, 0.0], [-0.5, 0.5, 0.0]]);
    data.normals.extend_from_slice(&[[0.0, 0.0, 1.0]; 4]);
    data.indices.extend_from_slice(&[0, 1, 2, 2, 3, 0]);
    data
}

/// UV sphere of radius 1.0.
///
/// # Arguments
/// * `longitude_segments` - Number of vertical segments (longitude lines)
/// * `latitude_segments` - Number of horizontal segments (latitude lines)
pub fn generate_sphere(longitude_segments: u32, latitude_segments: u32) -> GeometryData {
    let mut data = GeometryData::new();

    let long_segs = longitude_segments.max(3);
    let lat_segs = latitude_segments.max(2);

    for lat in 0..=lat_segs {
        let theta = lat as f32 * PI / lat_segs as f32; // 0 to PI
        let sin_theta = theta.sin();
        let cos_theta = theta.cos();

        for long in 0..=long_segs {
            let phi = long as f32 * 2.0 * PI / long_segs as f32; // 0 to 2*PI
            let x = sin_theta * phi.cos();
            let y = cos_theta;
            let z = sin_theta * phi.sin();

            data.vertices.push([x, y, z]);
            data.normals.push([x, y, z]); // Normal is same as position for unit sphere
        }
    }

    for lat in 0..lat_segs {
        for long in 0..long_segs {
            let first = lat * (long_segs + 1) + long;
            let second = first + long_segs + 1;

            data.indices.extend_from_slice(&[first, first + 1, second]);
            data.indices.extend_from_slice(&[second, first + 1, second + 1]);
        }
    }

    data
}

/// Five-pointed star in the XY plane, outer radius 1, inner 0.5, extruded
/// `depth` along Z. The flat faces point along ±Z.
pub fn generate_star(depth: f32) -> GeometryData {
    let mut data = GeometryData::new();
    let half = depth * 0.5;
    let points = 5;

    let outline: Vec<[f32; 2]> = (0..points * 2)
        .map(|i| {
            let r = if i % 2 == 0 { 1.0 } else { 0.5 };
            let a = i as f32 / points as f32 * PI + PI / 2.0;
            [a.cos() * r, a.sin() * r]
        })
        .collect();

    for i in 0..outline.len() {
        let [ax, ay] = outline[i];
        let [bx, by] = outline[(i + 1) % outline.len()];
        // Caps fan out from the centre.
        data.push_flat_triangle([0.0, 0.0, half], [ax, ay, half], [bx, by, half]);
        data.push_flat_triangle([0.0, 0.0, -half], [bx, by, -half], [ax, ay, -half]);
        // Side wall.
        data.push_flat_triangle([ax, ay, -half], [bx, by, -half], [bx, by, half]);
        data.push_flat_triangle([ax, ay, -half], [bx, by, half], [ax, ay, half]);
    }

    data
}

/// Regular icosahedron with circumradius 1.
pub fn generate_icosahedron() -> GeometryData {
    let t = (1.0 + 5.0f32.sqrt()) / 2.0;
    let len = (1.0 + t * t).sqrt();
    let (a, b) = (1.0 / len, t / len);

    #[rustfmt::skip]
    let corners: [[f32; 3]; 12] = [
        [-a,  b, 0.0], [ a,  b, 0.0], [-a, -b, 0.0], [ a, -b, 0.0],
        [0.0, -a,  b], [0.0,  a,  b], [0.0, -a, -b], [0.0,  a, -b],
        [ b, 0.0, -a], [ b, 0.0,  a], [-b, 0.0, -a], [-b, 0.0,  a],
    ];
    #[rustfmt::skip]
    let faces: [[usize; 3]; 20] = [
        [0, 11, 5], [0, 5, 1], [0, 1, 7], [0, 7, 10], [0, 10, 11],
        [1, 5, 9], [5, 11, 4], [11, 10, 2], [10, 7, 6], [7, 1, 8],
        [3, 9, 4], [3, 4, 2], [3, 2, 6], [3, 6, 8], [3, 8, 9],
        [4, 9, 5], [2, 4, 11], [6, 2, 10], [8, 6, 7], [9, 8, 1],
    ];

    let mut data = GeometryData::new();
    for [i, j, k] in faces {
        data.push_flat_triangle(corners[i], corners[j], corners[k]);
    }
    data
}

/// Cone standing on the XZ plane, apex up, centred on its mid-height.
pub fn generate_cone(radius: f32, height: f32, segments: u32) -> GeometryData {
    let mut data = GeometryData::new();
    let segs = segments.max(3);
    let half = height * 0.5;
    let slope = radius / height;

    for i in 0..segs {
        let a0 = i as f32 * 2.0 * PI / segs as f32;
        let a1 = (i + 1) as f32 * 2.0 * PI / segs as f32;
        let p0 = [radius * a0.cos(), -half, radius * a0.sin()];
        let p1 = [radius * a1.cos(), -half, radius * a1.sin()];
        let mid = (a0 + a1) * 0.5;

        // Side with a smooth-ish normal per segment.
        let n = {
            let (x, y, z) = (mid.cos(), slope, mid.sin());
            let len = (x * x + y * y + z * z).sqrt();
            [x / len, y / len, z / len]
        };
        let base = data.vertices.len() as u32;
        data.vertices.extend_from_slice(&[p0, [0.0, half, 0.0], p1]);
        data.normals.extend_from_slice(&[n, n, n]);
        data.indices.extend_from_slice(&[base, base + 1, base + 2]);

        data.push_flat_triangle([0.0, -half, 0.0], p0, p1);
    }

    data
}
