//! Procedural meshes for the 3D scenes.
//!
//! All meshes are indexed triangle lists with counter-clockwise front faces
//! and unit-length vertex normals.

use std::collections::BTreeSet;
use std::f32::consts::{PI, TAU};

use glam::Vec3;

#[derive(Debug, Clone, Default)]
pub struct Mesh {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub indices: Vec<u32>,
}

impl Mesh {
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Unique triangle edges as a line list, for wireframe overlays.
    pub fn line_indices(&self) -> Vec<u32> {
        let mut edges = BTreeSet::new();
        for tri in self.indices.chunks_exact(3) {
            for (a, b) in [(tri[0], tri[1]), (tri[1], tri[2]), (tri[2], tri[0])] {
                if a != b {
                    edges.insert((a.min(b), a.max(b)));
                }
            }
        }
        edges.into_iter().flat_map(|(a, b)| [a, b]).collect()
    }

    /// Interleaved `position, normal` vertices (stride 24 bytes).
    pub fn interleaved(&self) -> Vec<[f32; 6]> {
        self.positions
            .iter()
            .zip(&self.normals)
            .map(|(p, n)| [p[0], p[1], p[2], n[0], n[1], n[2]])
            .collect()
    }

    fn push(&mut self, p: Vec3, n: Vec3) {
        self.positions.push(p.to_array());
        self.normals.push(n.normalize_or_zero().to_array());
    }

    /// Two triangles over a `(rows + 1) x (cols + 1)` vertex grid.
    ///
    /// `flip` reverses winding for parameterizations whose natural order faces inward.
    fn grid_indices(&mut self, rows: u32, cols: u32, flip: bool) {
        let stride = cols + 1;
        for i in 0..rows {
            for j in 0..cols {
                let a = i * stride + j;
                let b = (i + 1) * stride + j;
                let c = (i + 1) * stride + j + 1;
                let d = i * stride + j + 1;
                if flip {
                    self.indices.extend_from_slice(&[a, c, b, a, d, c]);
                } else {
                    self.indices.extend_from_slice(&[a, b, c, a, c, d]);
                }
            }
        }
    }
}

pub fn sphere(radius: f32, segments: u32, rings: u32) -> Mesh {
    let (segments, rings) = (segments.max(3), rings.max(2));
    let mut m = Mesh::default();

    for i in 0..=rings {
        let theta = i as f32 / rings as f32 * PI;
        for j in 0..=segments {
            let phi = j as f32 / segments as f32 * TAU;
            let n = Vec3::new(theta.sin() * phi.cos(), theta.cos(), theta.sin() * phi.sin());
            m.push(n * radius, n);
        }
    }

    m.grid_indices(rings, segments, true);
    m
}

pub fn torus(radius: f32, tube: f32, segments: u32, sides: u32) -> Mesh {
    let (segments, sides) = (segments.max(3), sides.max(3));
    let mut m = Mesh::default();

    for i in 0..=sides {
        let v = i as f32 / sides as f32 * TAU;
        for j in 0..=segments {
            let u = j as f32 / segments as f32 * TAU;
            let n = Vec3::new(v.cos() * u.cos(), v.sin(), v.cos() * u.sin());
            let center = Vec3::new(radius * u.cos(), 0.0, radius * u.sin());
            m.push(center + n * tube, n);
        }
    }

    m.grid_indices(sides, segments, false);
    m
}

/// Axis-aligned cube with 24 vertices so each face has flat normals.
pub fn cube(size: f32) -> Mesh {
    let h = size * 0.5;
    let mut m = Mesh::default();

    for n in [Vec3::X, Vec3::NEG_X, Vec3::Y, Vec3::NEG_Y, Vec3::Z, Vec3::NEG_Z] {
        let v = if n.y.abs() > 0.5 { Vec3::Z } else { Vec3::Y };
        // u x v == n keeps the quad counter-clockwise seen from outside.
        let u = v.cross(n);
        let base = m.positions.len() as u32;
        for (su, sv) in [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
            m.push((n + u * su + v * sv) * h, n);
        }
        m.indices
            .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }
    m
}

/// (p, q) torus knot swept with a circular tube.
pub fn torus_knot(
    radius: f32,
    tube: f32,
    tubular_segments: u32,
    radial_segments: u32,
    p: u32,
    q: u32,
) -> Mesh {
    let (tubular, radial) = (tubular_segments.max(3), radial_segments.max(3));
    let (p, q) = (p.max(1) as f32, q.max(1) as f32);
    let mut m = Mesh::default();

    let curve = |u: f32| {
        let qu_over_p = q / p * u;
        let cs = qu_over_p.cos();
        Vec3::new(
            radius * (2.0 + cs) * 0.5 * u.cos(),
            radius * (2.0 + cs) * 0.5 * u.sin(),
            radius * qu_over_p.sin() * 0.5,
        )
    };

    for j in 0..=tubular {
        let u = j as f32 / tubular as f32 * p * TAU;
        let p1 = curve(u);
        let p2 = curve(u + 0.01);

        let t = p2 - p1;
        let mut n = p2 + p1;
        let b = t.cross(n).normalize();
        n = b.cross(t).normalize();

        for i in 0..=radial {
            let v = i as f32 / radial as f32 * TAU;
            let cx = -tube * v.cos();
            let cy = tube * v.sin();
            let pos = p1 + n * cx + b * cy;
            m.push(pos, pos - p1);
        }
    }

    let stride = radial + 1;
    for j in 1..=tubular {
        for i in 1..=radial {
            let a = stride * (j - 1) + (i - 1);
            let b = stride * j + (i - 1);
            let c = stride * j + i;
            let d = stride * (j - 1) + i;
            m.indices.extend_from_slice(&[a, b, d, b, c, d]);
        }
    }
    m
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Share of non-degenerate triangles whose face normal agrees with the vertex normals.
    fn outward_ratio(m: &Mesh) -> f32 {
        let mut total = 0;
        let mut outward = 0;
        for tri in m.indices.chunks_exact(3) {
            let p = |i: u32| Vec3::from(m.positions[i as usize]);
            let n = |i: u32| Vec3::from(m.normals[i as usize]);
            let face = (p(tri[1]) - p(tri[0])).cross(p(tri[2]) - p(tri[0]));
            if face.length() < 1e-6 {
                continue;
            }
            total += 1;
            if face.dot(n(tri[0]) + n(tri[1]) + n(tri[2])) > 0.0 {
                outward += 1;
            }
        }
        outward as f32 / total.max(1) as f32
    }

    fn indices_in_range(m: &Mesh) -> bool {
        m.indices.iter().all(|&i| (i as usize) < m.vertex_count())
    }

    #[test]
    fn sphere_counts_and_winding() {
        let m = sphere(1.0, 16, 8);
        assert_eq!(m.vertex_count(), 17 * 9);
        assert_eq!(m.indices.len(), 16 * 8 * 6);
        assert!(indices_in_range(&m));
        assert_eq!(outward_ratio(&m), 1.0);
        for p in &m.positions {
            assert!((Vec3::from(*p).length() - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn torus_winding() {
        let m = torus(1.0, 0.3, 24, 12);
        assert!(indices_in_range(&m));
        assert_eq!(outward_ratio(&m), 1.0);
    }

    #[test]
    fn cube_faces_point_outward() {
        let m = cube(2.0);
        assert_eq!(m.vertex_count(), 24);
        assert_eq!(m.indices.len(), 36);
        assert_eq!(outward_ratio(&m), 1.0);
        for p in &m.positions {
            assert!(p.iter().all(|c| (c.abs() - 1.0).abs() < 1e-6));
        }
    }

    #[test]
    fn torus_knot_winding() {
        let m = torus_knot(1.0, 0.3, 64, 8, 2, 3);
        assert_eq!(m.vertex_count(), 65 * 9);
        assert!(indices_in_range(&m));
        assert!(outward_ratio(&m) > 0.99);
    }

    #[test]
    fn normals_are_unit_length() {
        for m in [sphere(2.0, 8, 4), torus(1.0, 0.25, 8, 8), torus_knot(1.0, 0.4, 32, 6, 2, 3)] {
            for n in &m.normals {
                let len = Vec3::from(*n).length();
                assert!(len == 0.0 || (len - 1.0).abs() < 1e-4, "{len}");
            }
        }
    }

    #[test]
    fn cube_wireframe_has_unique_edges() {
        let lines = cube(1.0).line_indices();
        // Faces do not share vertices: 4 sides + 1 diagonal each.
        assert_eq!(lines.len(), 6 * 5 * 2);
    }

    #[test]
    fn interleaved_layout() {
        let m = cube(1.0);
        let v = m.interleaved();
        assert_eq!(v.len(), 24);
        assert_eq!(&v[0][3..], &m.normals[0]);
    }
}
