//! Topic clustering.
//!
//! Seeded k-means++ over L2-normalized embeddings (so Euclidean distance
//! ranks like cosine distance). Several restarts run with derived seeds and
//! the lowest-inertia run wins. `K` is clamped to `min(K, max(1, n))`.
//!
//! Raw k-means labels are arbitrary, so the winning run is relabeled
//! canonically: clusters are numbered in order of their first member in the
//! input. [`align_to_previous`] can then carry indices over from an earlier
//! run by matching centroids.

use std::cmp::Ordering;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, instrument};

use galaxy_core::{defaults, Embedding, Error, Result};

use crate::similarity::{check_embeddings, cosine_similarity, normalized};

/// Configuration for one clustering call.
#[derive(Debug, Clone)]
pub struct KMeansConfig {
    /// Requested number of clusters (before clamping).
    pub k: usize,
    pub seed: u64,
    /// Independent k-means++ runs; the lowest inertia wins.
    pub restarts: usize,
    pub max_iterations: usize,
}

impl Default for KMeansConfig {
    fn default() -> Self {
        Self {
            k: defaults::CLUSTER_COUNT,
            seed: defaults::SEED,
            restarts: defaults::KMEANS_RESTARTS,
            max_iterations: defaults::KMEANS_MAX_ITERATIONS,
        }
    }
}

/// Result of clustering `n` embeddings.
#[derive(Debug, Clone, PartialEq)]
pub struct Clustering {
    /// Category index per input embedding, in `[0, centroids.len())`.
    pub assignments: Vec<usize>,
    /// Centroid per category in normalized embedding space.
    pub centroids: Vec<Embedding>,
    /// Within-cluster sum of squared distances.
    pub inertia: f64,
}

impl Clustering {
    fn empty() -> Self {
        Self {
            assignments: Vec::new(),
            centroids: Vec::new(),
            inertia: 0.0,
        }
    }

    pub fn num_clusters(&self) -> usize {
        self.centroids.len()
    }
}

/// Number of clusters actually used for `n` inputs.
pub fn effective_k(k: usize, n: usize) -> usize {
    k.max(1).min(n.max(1))
}

/// Cluster `embeddings` into at most `config.k` groups.
///
/// Identical input and config always yield identical output.
#[instrument(skip(embeddings, config), fields(subsystem = "layout", component = "clustering", op = "cluster", note_count = embeddings.len(), k = config.k))]
pub fn cluster(embeddings: &[Embedding], config: &KMeansConfig) -> Result<Clustering> {
    check_embeddings(embeddings)?;
    let n = embeddings.len();
    if n == 0 {
        return Ok(Clustering::empty());
    }

    let k = effective_k(config.k, n);
    let points: Vec<Vec<f64>> = embeddings.iter().map(|e| normalized(e)).collect();

    let mut best: Option<Run> = None;
    for restart in 0..config.restarts.max(1) {
        let mut rng = StdRng::seed_from_u64(config.seed.wrapping_add(restart as u64));
        let run = lloyd(&points, k, config.max_iterations.max(1), &mut rng);
        let better = match &best {
            Some(b) => run.inertia < b.inertia - 1e-12,
            None => true,
        };
        if better {
            best = Some(run);
        }
        // A single cluster has only one possible outcome.
        if k == 1 {
            break;
        }
    }
    let best = best.ok_or_else(|| Error::Internal("k-means produced no run".to_string()))?;

    let clustering = canonicalize(&points, &best.assignments);
    debug!(
        n,
        k,
        clusters = clustering.num_clusters(),
        inertia = clustering.inertia,
        "Clustering complete"
    );
    Ok(clustering)
}

/// Renumber `clustering` so categories keep the index of the previous run's
/// best-matching centroid.
///
/// Pairs are matched greedily by descending centroid cosine similarity, only
/// when it is at least `threshold`. Only previous indices below the current
/// cluster count are eligible, so indices stay in `[0, num_clusters)`.
/// Unmatched clusters take the free indices in canonical order.
pub fn align_to_previous(
    clustering: Clustering,
    previous: &[Embedding],
    threshold: f32,
) -> Clustering {
    let m = clustering.num_clusters();
    if m == 0 || previous.is_empty() {
        return clustering;
    }

    let eligible = previous.len().min(m);
    let mut pairs: Vec<(f32, usize, usize)> = Vec::new();
    for (i, centroid) in clustering.centroids.iter().enumerate() {
        for (j, prev) in previous.iter().take(eligible).enumerate() {
            let score = cosine_similarity(centroid, prev);
            if score >= threshold {
                pairs.push((score, i, j));
            }
        }
    }
    pairs.sort_by(|a, b| {
        b.0.partial_cmp(&a.0)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.1.cmp(&b.1))
            .then_with(|| a.2.cmp(&b.2))
    });

    let mut mapping: Vec<Option<usize>> = vec![None; m];
    let mut taken = vec![false; m];
    for (_, i, j) in pairs {
        if mapping[i].is_none() && !taken[j] {
            mapping[i] = Some(j);
            taken[j] = true;
        }
    }

    let mut free = (0..m).filter(|&j| !taken[j]).collect::<Vec<_>>().into_iter();
    let mapping: Vec<usize> = mapping
        .into_iter()
        .enumerate()
        .map(|(i, target)| target.or_else(|| free.next()).unwrap_or(i))
        .collect();

    let mut centroids = vec![Vec::new(); m];
    for (i, centroid) in clustering.centroids.into_iter().enumerate() {
        centroids[mapping[i]] = centroid;
    }

    Clustering {
        assignments: clustering
            .assignments
            .iter()
            .map(|&c| mapping[c])
            .collect(),
        centroids,
        inertia: clustering.inertia,
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

struct Run {
    assignments: Vec<usize>,
    inertia: f64,
}

#[inline]
fn distance_squared(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// Index of the nearest centroid (lowest index on ties) and its squared distance.
fn nearest(point: &[f64], centroids: &[Vec<f64>]) -> (usize, f64) {
    let mut best = (0, f64::MAX);
    for (j, centroid) in centroids.iter().enumerate() {
        let d = distance_squared(point, centroid);
        if d < best.1 {
            best = (j, d);
        }
    }
    best
}

/// Choose `k` initial centroids with probability proportional to D².
fn kmeans_plus_plus_init(points: &[Vec<f64>], k: usize, rng: &mut StdRng) -> Vec<Vec<f64>> {
    let n = points.len();
    let mut centroids = Vec::with_capacity(k);
    centroids.push(points[rng.gen_range(0..n)].clone());

    let mut min_distances: Vec<f64> = points
        .iter()
        .map(|p| distance_squared(p, &centroids[0]))
        .collect();

    while centroids.len() < k {
        let total: f64 = min_distances.iter().sum();
        let next = if total <= 0.0 {
            // Every point coincides with a centroid.
            rng.gen_range(0..n)
        } else {
            let mut target = rng.gen::<f64>() * total;
            let mut chosen = None;
            let mut last_positive = 0;
            for (i, &d) in min_distances.iter().enumerate() {
                if d <= 0.0 {
                    continue;
                }
                last_positive = i;
                if target < d {
                    chosen = Some(i);
                    break;
                }
                target -= d;
            }
            chosen.unwrap_or(last_positive)
        };

        let centroid = points[next].clone();
        for (i, p) in points.iter().enumerate() {
            let d = distance_squared(p, &centroid);
            if d < min_distances[i] {
                min_distances[i] = d;
            }
        }
        centroids.push(centroid);
    }

    centroids
}

fn compute_centroids(points: &[Vec<f64>], assignments: &[usize], k: usize) -> Vec<Vec<f64>> {
    let dim = points.first().map_or(0, |p| p.len());
    let mut sums = vec![vec![0.0f64; dim]; k];
    let mut counts = vec![0usize; k];

    for (point, &c) in points.iter().zip(assignments.iter()) {
        counts[c] += 1;
        for (s, x) in sums[c].iter_mut().zip(point.iter()) {
            *s += x;
        }
    }

    for (sum, &count) in sums.iter_mut().zip(counts.iter()) {
        if count > 0 {
            for s in sum.iter_mut() {
                *s /= count as f64;
            }
        }
    }
    sums
}

/// Give every empty cluster the point farthest from its own centroid, taken
/// from a cluster with more than one member. Returns whether anything moved.
fn fill_empty_clusters(
    points: &[Vec<f64>],
    assignments: &mut [usize],
    centroids: &[Vec<f64>],
    k: usize,
) -> bool {
    let mut counts = vec![0usize; k];
    for &c in assignments.iter() {
        counts[c] += 1;
    }

    let mut moved = false;
    for empty in 0..k {
        if counts[empty] > 0 {
            continue;
        }
        let donor = points
            .iter()
            .enumerate()
            .filter(|(i, _)| counts[assignments[*i]] > 1)
            .map(|(i, p)| (i, distance_squared(p, &centroids[assignments[i]])))
            .fold(None::<(usize, f64)>, |best, (i, d)| match best {
                Some((_, bd)) if bd >= d => best,
                _ => Some((i, d)),
            });

        if let Some((i, _)) = donor {
            counts[assignments[i]] -= 1;
            assignments[i] = empty;
            counts[empty] += 1;
            moved = true;
        }
    }
    moved
}

fn compute_inertia(points: &[Vec<f64>], assignments: &[usize], centroids: &[Vec<f64>]) -> f64 {
    points
        .iter()
        .zip(assignments.iter())
        .map(|(p, &c)| distance_squared(p, &centroids[c]))
        .sum()
}

/// One seeded k-means run.
fn lloyd(points: &[Vec<f64>], k: usize, max_iterations: usize, rng: &mut StdRng) -> Run {
    let mut centroids = kmeans_plus_plus_init(points, k, rng);
    let mut assignments = vec![usize::MAX; points.len()];

    for _ in 0..max_iterations {
        let mut changed = false;
        for (i, point) in points.iter().enumerate() {
            let (c, _) = nearest(point, &centroids);
            if assignments[i] != c {
                assignments[i] = c;
                changed = true;
            }
        }
        changed |= fill_empty_clusters(points, &mut assignments, &centroids, k);
        centroids = compute_centroids(points, &assignments, k);
        if !changed {
            break;
        }
    }

    let inertia = compute_inertia(points, &assignments, &centroids);
    Run {
        assignments,
        inertia,
    }
}

/// Number clusters by first appearance in the input and drop empty ones.
fn canonicalize(points: &[Vec<f64>], raw: &[usize]) -> Clustering {
    let mut mapping: Vec<Option<usize>> = Vec::new();
    let mut next = 0;
    let assignments: Vec<usize> = raw
        .iter()
        .map(|&c| {
            if c >= mapping.len() {
                mapping.resize(c + 1, None);
            }
            *mapping[c].get_or_insert_with(|| {
                next += 1;
                next - 1
            })
        })
        .collect();

    let centroids = compute_centroids(points, &assignments, next);
    let inertia = compute_inertia(points, &assignments, &centroids);
    Clustering {
        assignments,
        centroids: centroids
            .into_iter()
            .map(|c| c.into_iter().map(|x| x as f32).collect())
            .collect(),
        inertia,
    }
}
