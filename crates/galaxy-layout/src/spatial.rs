//! 3D layout of the embedding set.
//!
//! Two deterministic passes:
//!
//! 1. Classical MDS on chordal distances between normalized embeddings
//!    (`sqrt(2 - 2 cos)`), top three axes by power iteration. Scaled so the
//!    farthest point sits at `spread` from the center.
//! 2. Stress refinement over a k-nearest-neighbor graph: each edge is pulled
//!    toward its scaled target length, and all pairs are pushed apart to at
//!    least `min_dist`.
//!
//! Points with high cosine similarity end up close together. The
//! neighborhood size is clamped to `n - 1`; a single point maps to the origin.

use std::cmp::Ordering;

use tracing::{debug, instrument};

use galaxy_core::{defaults, Embedding, Error, Result};

use crate::similarity::{check_embeddings, dot, normalized};

/// A 3D coordinate.
pub type Point3 = [f32; 3];

const POWER_ITERATIONS: usize = 500;
const POWER_TOLERANCE: f64 = 1e-10;
const SEPARATION_PASSES: usize = 10;

/// Layout tunables.
#[derive(Debug, Clone)]
pub struct LayoutParams {
    /// Neighborhood size for refinement, clamped to `[1, n - 1]`.
    pub neighbors: usize,
    pub min_dist: f32,
    pub spread: f32,
    pub epochs: usize,
}

impl Default for LayoutParams {
    fn default() -> Self {
        Self {
            neighbors: defaults::LAYOUT_NEIGHBORS,
            min_dist: defaults::LAYOUT_MIN_DIST,
            spread: defaults::LAYOUT_SPREAD,
            epochs: defaults::LAYOUT_EPOCHS,
        }
    }
}

/// Reduce `embeddings` to one 3D point each, in input order.
#[instrument(skip(embeddings, params), fields(subsystem = "layout", component = "spatial", op = "reduce_to_3d", note_count = embeddings.len()))]
pub fn reduce_to_3d(embeddings: &[Embedding], params: &LayoutParams) -> Result<Vec<Point3>> {
    check_embeddings(embeddings)?;
    let n = embeddings.len();
    match n {
        0 => return Ok(Vec::new()),
        1 => return Ok(vec![[0.0; 3]]),
        _ => {}
    }

    let unit: Vec<Vec<f64>> = embeddings.iter().map(|e| normalized(e)).collect();
    let similarity = similarity_matrix(&unit);
    let chordal: Vec<Vec<f64>> = similarity
        .iter()
        .enumerate()
        .map(|(i, row)| {
            row.iter()
                .enumerate()
                .map(|(j, &s)| if i == j { 0.0 } else { (2.0 - 2.0 * s).max(0.0).sqrt() })
                .collect()
        })
        .collect();

    let mut coords = classical_mds(&chordal);

    let radius = coords
        .iter()
        .map(|p| norm3(p))
        .fold(0.0f64, f64::max);
    let scale = if radius > 1e-12 {
        params.spread as f64 / radius
    } else {
        1.0
    };
    for p in coords.iter_mut() {
        for x in p.iter_mut() {
            *x *= scale;
        }
    }

    let k = params.neighbors.clamp(1, n - 1);
    let edges = neighbor_edges(&similarity, &chordal, k, scale);
    refine(&mut coords, &edges, params);
    recenter(&mut coords);

    let points: Vec<Point3> = coords
        .iter()
        .map(|p| [p[0] as f32, p[1] as f32, p[2] as f32])
        .collect();
    if points.iter().flatten().any(|x| !x.is_finite()) {
        return Err(Error::Internal("layout produced non-finite coordinates".to_string()));
    }

    debug!(n, neighbors = k, edges = edges.len(), "3D layout complete");
    Ok(points)
}

// =============================================================================
// Helper Functions
// =============================================================================

fn similarity_matrix(unit: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let n = unit.len();
    let mut sim = vec![vec![0.0f64; n]; n];
    for i in 0..n {
        for j in i..n {
            let s = dot(&unit[i], &unit[j]).clamp(-1.0, 1.0);
            sim[i][j] = s;
            sim[j][i] = s;
        }
    }
    sim
}

#[inline]
fn norm3(p: &[f64; 3]) -> f64 {
    (p[0] * p[0] + p[1] * p[1] + p[2] * p[2]).sqrt()
}

/// Classical MDS: top three eigenvectors of the double-centered squared distance matrix.
fn classical_mds(distances: &[Vec<f64>]) -> Vec<[f64; 3]> {
    let n = distances.len();
    let squared: Vec<Vec<f64>> = distances
        .iter()
        .map(|row| row.iter().map(|d| d * d).collect())
        .collect();

    let row_means: Vec<f64> = squared
        .iter()
        .map(|row| row.iter().sum::<f64>() / n as f64)
        .collect();
    let grand_mean = row_means.iter().sum::<f64>() / n as f64;

    let gram: Vec<Vec<f64>> = (0..n)
        .map(|i| {
            (0..n)
                .map(|j| -0.5 * (squared[i][j] - row_means[i] - row_means[j] + grand_mean))
                .collect()
        })
        .collect();

    // Gershgorin bound; shifting by it makes the largest algebraic eigenvalue dominant.
    let shift = gram
        .iter()
        .map(|row| row.iter().map(|x| x.abs()).sum::<f64>())
        .fold(0.0f64, f64::max);

    // The constant vector is always in the null space of a centered Gram matrix.
    let mut basis: Vec<Vec<f64>> = vec![vec![1.0 / (n as f64).sqrt(); n]];
    let mut coords = vec![[0.0f64; 3]; n];

    for axis in 0..3 {
        let Some((vector, eigenvalue)) = dominant_eigenpair(&gram, shift, &basis, axis) else {
            break;
        };
        let length = eigenvalue.max(0.0).sqrt();
        for (c, v) in coords.iter_mut().zip(vector.iter()) {
            c[axis] = v * length;
        }
        basis.push(vector);
    }

    coords
}

/// Power iteration on `gram + shift * I`, restricted to the complement of `basis`.
///
/// Returns `None` when that complement is numerically empty.
fn dominant_eigenpair(
    gram: &[Vec<f64>],
    shift: f64,
    basis: &[Vec<f64>],
    axis: usize,
) -> Option<(Vec<f64>, f64)> {
    let n = gram.len();
    let mut v: Vec<f64> = (0..n)
        .map(|i| 1.0 + ((i * 7 + axis * 13) % 11) as f64 * 0.1 + i as f64 * 1e-3)
        .collect();
    if !orthonormalize(&mut v, basis) {
        return None;
    }

    let floor = 1e-9 * (shift + 1.0);
    for _ in 0..POWER_ITERATIONS {
        let mut w: Vec<f64> = gram
            .iter()
            .zip(v.iter())
            .map(|(row, &vi)| dot(row, &v) + shift * vi)
            .collect();
        let magnitude = w.iter().map(|x| x * x).sum::<f64>().sqrt();
        if magnitude < floor || !orthonormalize(&mut w, basis) {
            return None;
        }

        let delta = w
            .iter()
            .zip(v.iter())
            .map(|(a, b)| (a - b) * (a - b))
            .sum::<f64>()
            .sqrt();
        v = w;
        if delta < POWER_TOLERANCE {
            break;
        }
    }

    let gv: Vec<f64> = gram.iter().map(|row| dot(row, &v)).collect();
    let eigenvalue = dot(&v, &gv);
    Some((v, eigenvalue))
}

/// Gram-Schmidt `v` against `basis` and normalize. Returns false if nothing is left.
fn orthonormalize(v: &mut [f64], basis: &[Vec<f64>]) -> bool {
    for b in basis {
        let projection = dot(v, b);
        for (x, y) in v.iter_mut().zip(b.iter()) {
            *x -= projection * y;
        }
    }
    let norm = v.iter().map(|x| x * x).sum::<f64>().sqrt();
    if norm < 1e-9 {
        return false;
    }
    for x in v.iter_mut() {
        *x /= norm;
    }
    true
}

/// Symmetric kNN edges `(i, j, target_length)` with `i < j`, sorted.
fn neighbor_edges(
    similarity: &[Vec<f64>],
    chordal: &[Vec<f64>],
    k: usize,
    scale: f64,
) -> Vec<(usize, usize, f64)> {
    let n = similarity.len();
    let mut edges: Vec<(usize, usize)> = Vec::with_capacity(n * k);
    for i in 0..n {
        let mut candidates: Vec<usize> = (0..n).filter(|&j| j != i).collect();
        candidates.sort_by(|&a, &b| {
            similarity[i][b]
                .partial_cmp(&similarity[i][a])
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.cmp(&b))
        });
        for &j in candidates.iter().take(k) {
            edges.push((i.min(j), i.max(j)));
        }
    }
    edges.sort_unstable();
    edges.dedup();
    edges
        .into_iter()
        .map(|(i, j)| (i, j, chordal[i][j] * scale))
        .collect()
}

/// Deterministic push direction for coincident points.
fn fallback_direction(i: usize, j: usize) -> [f64; 3] {
    let mut dir = [0.0; 3];
    dir[(i + j) % 3] = 1.0;
    dir
}

/// Push every pair closer than `min_dist` apart. Returns whether anything moved.
fn separate(coords: &mut [[f64; 3]], min_dist: f64) -> bool {
    let n = coords.len();
    let mut moved = false;
    for i in 0..n {
        for j in (i + 1)..n {
            let diff = [
                coords[j][0] - coords[i][0],
                coords[j][1] - coords[i][1],
                coords[j][2] - coords[i][2],
            ];
            let d = norm3(&diff);
            if d >= min_dist {
                continue;
            }
            let dir = if d < 1e-9 {
                fallback_direction(i, j)
            } else {
                [diff[0] / d, diff[1] / d, diff[2] / d]
            };
            let push = (min_dist - d) * 0.5;
            for a in 0..3 {
                coords[i][a] -= dir[a] * push;
                coords[j][a] += dir[a] * push;
            }
            moved = true;
        }
    }
    moved
}

fn refine(coords: &mut [[f64; 3]], edges: &[(usize, usize, f64)], params: &LayoutParams) {
    let min_dist = params.min_dist.max(0.0) as f64;
    let epochs = params.epochs;

    for epoch in 0..epochs {
        let rate = 0.1 * (1.0 - epoch as f64 / epochs as f64);
        for &(i, j, target) in edges {
            let diff = [
                coords[j][0] - coords[i][0],
                coords[j][1] - coords[i][1],
                coords[j][2] - coords[i][2],
            ];
            let d = norm3(&diff);
            if d < 1e-9 {
                continue;
            }
            let step = rate * 0.5 * (d - target) / d;
            for a in 0..3 {
                coords[i][a] += step * diff[a];
                coords[j][a] -= step * diff[a];
            }
        }
        if min_dist > 0.0 {
            separate(coords, min_dist);
        }
    }

    if min_dist > 0.0 {
        for _ in 0..SEPARATION_PASSES {
            if !separate(coords, min_dist) {
                break;
            }
        }
    }
}

fn recenter(coords: &mut [[f64; 3]]) {
    let n = coords.len() as f64;
    let mut mean = [0.0f64; 3];
    for p in coords.iter() {
        for a in 0..3 {
            mean[a] += p[a] / n;
        }
    }
    for p in coords.iter_mut() {
        for a in 0..3 {
            p[a] -= mean[a];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn distance(a: &Point3, b: &Point3) -> f32 {
        ((a[0] - b[0]).powi(2) + (a[1] - b[1]).powi(2) + (a[2] - b[2]).powi(2)).sqrt()
    }

    fn axis(dim: usize, axis: usize, jitter: f32) -> Embedding {
        let mut v = vec![0.0f32; dim];
        v[axis] = 1.0;
        v[(axis + 1) % dim] = jitter;
        v
    }

    #[test]
    fn test_empty_input() {
        assert!(reduce_to_3d(&[], &LayoutParams::default()).unwrap().is_empty());
    }

    #[test]
    fn test_single_point_is_origin() {
        let points = reduce_to_3d(&[vec![0.3, 0.1, 0.9]], &LayoutParams::default()).unwrap();
        assert_eq!(points, vec![[0.0, 0.0, 0.0]]);
    }

    #[test]
    fn test_two_points_span_the_spread() {
        let params = LayoutParams::default();
        let points = reduce_to_3d(&[vec![1.0, 0.0], vec![0.0, 1.0]], &params).unwrap();
        assert_eq!(points.len(), 2);
        let d = distance(&points[0], &points[1]);
        assert!((d - 2.0 * params.spread).abs() < 1e-2, "distance {d}");
    }

    #[test]
    fn test_neighbors_larger_than_input_is_clamped() {
        let params = LayoutParams {
            neighbors: 50,
            ..LayoutParams::default()
        };
        let embeddings = vec![axis(4, 0, 0.0), axis(4, 1, 0.0), axis(4, 2, 0.0)];
        let points = reduce_to_3d(&embeddings, &params).unwrap();
        assert_eq!(points.len(), 3);
    }

    #[test]
    fn test_similar_embeddings_land_closer() {
        let embeddings = vec![
            axis(8, 0, 0.05),
            axis(8, 0, 0.10),
            axis(8, 0, 0.15),
            axis(8, 4, 0.05),
            axis(8, 4, 0.10),
            axis(8, 4, 0.15),
        ];
        let points = reduce_to_3d(&embeddings, &LayoutParams::default()).unwrap();

        let groups = [[0usize, 1, 2], [3, 4, 5]];
        let mut max_within = 0.0f32;
        for g in &groups {
            for &a in g {
                for &b in g {
                    max_within = max_within.max(distance(&points[a], &points[b]));
                }
            }
        }
        let mut min_between = f32::MAX;
        for &a in &groups[0] {
            for &b in &groups[1] {
                min_between = min_between.min(distance(&points[a], &points[b]));
            }
        }
        assert!(max_within < min_between, "{max_within} >= {min_between}");
    }

    #[test]
    fn test_identical_embeddings_are_separated() {
        let params = LayoutParams::default();
        let points = reduce_to_3d(&vec![vec![1.0, 2.0, 3.0]; 4], &params).unwrap();
        for i in 0..4 {
            for j in (i + 1)..4 {
                assert!(distance(&points[i], &points[j]) > params.min_dist * 0.5);
            }
        }
    }

    #[test]
    fn test_layout_is_centered_and_finite() {
        let embeddings: Vec<Embedding> = (0..12).map(|i| axis(6, i % 6, i as f32 * 0.05)).collect();
        let points = reduce_to_3d(&embeddings, &LayoutParams::default()).unwrap();
        let mut mean = [0.0f32; 3];
        for p in &points {
            assert!(p.iter().all(|x| x.is_finite()));
            for a in 0..3 {
                mean[a] += p[a] / points.len() as f32;
            }
        }
        assert!(mean.iter().all(|m| m.abs() < 1e-3));
    }

    #[test]
    fn test_layout_is_deterministic() {
        let embeddings: Vec<Embedding> = (0..9).map(|i| axis(5, i % 5, i as f32 * 0.1)).collect();
        let a = reduce_to_3d(&embeddings, &LayoutParams::default()).unwrap();
        let b = reduce_to_3d(&embeddings, &LayoutParams::default()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_mixed_dimensions_rejected() {
        let err = reduce_to_3d(&[vec![1.0], vec![1.0, 0.0]], &LayoutParams::default()).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }
}
