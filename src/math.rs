//! Geometry and sample helpers for terrain meshes. No ECS access.

use bevy::prelude::Vec3;

/// Area-weighted face normal `(v1 - v0) × (v2 - v0)`, not normalized.
/// Zero for degenerate (collinear) triangles.
pub fn face_normal(v0: Vec3, v1: Vec3, v2: Vec3) -> Vec3 {
    (v1 - v0).cross(v2 - v0)
}

/// Smooth per-vertex normals for an indexed triangle list.
///
/// Face normals are accumulated unnormalized, so larger triangles weigh more.
/// Vertices touched only by degenerate triangles (or by none) get `fallback`
/// instead of a NaN. Triangles referencing out-of-range vertices are skipped.
pub fn vertex_normals(positions: &[Vec3], indices: &[u32], fallback: Vec3) -> Vec<Vec3> {
    let mut acc = vec![Vec3::ZERO; positions.len()];

    for tri in indices.chunks_exact(3) {
        let [a, b, c] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
        if a >= positions.len() || b >= positions.len() || c >= positions.len() {
            continue;
        }
        let face = face_normal(positions[a], positions[b], positions[c]);
        if !face.is_finite() {
            continue;
        }
        acc[a] += face;
        acc[b] += face;
        acc[c] += face;
    }

    acc.into_iter()
        .map(|n| {
            let n = n.normalize_or_zero();
            if n == Vec3::ZERO { fallback } else { n }
        })
        .collect()
}

/// Whether a raw elevation sample is usable.
///
/// Rasters mark missing data with huge sentinels (`3.4e38` for AHN), so
/// anything non-finite or with a magnitude above `limit` is rejected.
pub fn is_plausible_height(sample: f32, limit: f32) -> bool {
    sample.is_finite() && sample.abs() <= limit
}

/// Lowest and highest plausible sample, found by sorting a copy.
///
/// Returns `None` when no sample passes [`is_plausible_height`].
pub fn height_range(samples: &[f32], limit: f32) -> Option<(f32, f32)> {
    let mut sorted: Vec<f32> = samples
        .iter()
        .copied()
        .filter(|&s| is_plausible_height(s, limit))
        .collect();
    sorted.sort_by(f32::total_cmp);
    Some((*sorted.first()?, *sorted.last()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── face_normal ─────────────────────────────────────────────────

    #[test]
    fn face_normal_scales_with_area() {
        let small = face_normal(Vec3::ZERO, Vec3::X, Vec3::NEG_Z);
        let big = face_normal(Vec3::ZERO, Vec3::X * 2.0, Vec3::NEG_Z * 2.0);
        assert_eq!(small, Vec3::Y);
        assert_eq!(big, Vec3::Y * 4.0);
    }

    #[test]
    fn collinear_face_is_zero() {
        assert_eq!(face_normal(Vec3::ZERO, Vec3::X, Vec3::X * 2.0), Vec3::ZERO);
    }

    // ── vertex_normals ──────────────────────────────────────────────

    #[test]
    fn flat_quad_normals_point_up() {
        // Winding as used by tile meshes: +X then -Z.
        let positions = [
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 0.0, -1.0),
            Vec3::new(1.0, 0.0, -1.0),
        ];
        let normals = vertex_normals(&positions, &[0, 1, 2, 1, 3, 2], Vec3::Y);
        for n in normals {
            assert!((n - Vec3::Y).length() < 1e-6, "got {n:?}");
        }
    }

    #[test]
    fn shared_vertex_averages_faces() {
        // Two faces folded along the shared edge 1-2.
        let positions = [
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, -1.0),
            Vec3::new(2.0, 1.0, -1.0),
        ];
        let normals = vertex_normals(&positions, &[0, 1, 2, 1, 3, 2], Vec3::Y);
        let shared = normals[1];
        assert!((shared.length() - 1.0).abs() < 1e-5);
        assert!(shared.x.abs() < 1e-5, "folds cancel on X, got {shared:?}");
        assert!(shared.y > 0.0);
    }

    #[test]
    fn degenerate_faces_fall_back_instead_of_nan() {
        let positions = [Vec3::ZERO, Vec3::ZERO, Vec3::ZERO, Vec3::X];
        let normals = vertex_normals(&positions, &[0, 1, 2], Vec3::Y);
        assert_eq!(normals.len(), 4);
        for n in normals {
            assert!(n.is_finite());
            assert_eq!(n, Vec3::Y);
        }
    }

    #[test]
    fn out_of_range_indices_are_ignored() {
        let positions = [Vec3::ZERO, Vec3::X, Vec3::NEG_Z];
        let normals = vertex_normals(&positions, &[0, 1, 2, 0, 1, 99], Vec3::Y);
        assert_eq!(normals.len(), 3);
        assert!((normals[0] - Vec3::Y).length() < 1e-6);
    }

    // ── height_range ────────────────────────────────────────────────

    #[test]
    fn range_skips_sentinels() {
        let samples = [3.0, 3.4e38, -2.0, 12.5, f32::NAN, -9999.0];
        assert_eq!(height_range(&samples, 1000.0), Some((-2.0, 12.5)));
    }

    #[test]
    fn range_of_only_sentinels_is_none() {
        assert_eq!(height_range(&[3.4e38, 5000.0], 1000.0), None);
        assert_eq!(height_range(&[], 1000.0), None);
    }

    #[test]
    fn limit_is_inclusive() {
        assert!(is_plausible_height(1000.0, 1000.0));
        assert!(is_plausible_height(-1000.0, 1000.0));
        assert!(!is_plausible_height(1000.5, 1000.0));
        assert!(!is_plausible_height(f32::INFINITY, 1000.0));
    }
}
