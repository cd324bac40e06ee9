use memoir_core::StoreError;
use rand::Rng;

use super::Metric;

/// Maximum number of iterations for k-means clustering.
const MAX_ITERATIONS: usize = 100;

/// Epsilon for floating-point comparisons.
const EPSILON: f32 = 1e-10;

/// Fit `k` centroids over `vectors` with Lloyd's algorithm, seeded by
/// k-means++. Assignment uses the index metric; centroid updates are
/// plain coordinate means. Callers validate dimensions beforehand.
pub(super) fn fit_centroids(
    vectors: &[Vec<f32>],
    k: usize,
    metric: Metric,
) -> Result<Vec<Vec<f32>>, StoreError> {
    if vectors.is_empty() {
        return Err(StoreError::Config(
            "cannot train on an empty sample".into(),
        ));
    }
    if k == 0 || k > vectors.len() {
        return Err(StoreError::Config(format!(
            "invalid cluster count {k} for a sample of {} vectors",
            vectors.len()
        )));
    }

    let dimension = vectors[0].len();
    let mut centroids = init_kmeans_plus_plus(vectors, k, metric);
    let mut assignments: Vec<usize> = vectors
        .iter()
        .map(|v| nearest_centroid(v, &centroids, metric))
        .collect();

    for _ in 0..MAX_ITERATIONS {
        centroids = update_centroids(vectors, &assignments, k, dimension);
        let new_assignments: Vec<usize> = vectors
            .iter()
            .map(|v| nearest_centroid(v, &centroids, metric))
            .collect();
        if new_assignments == assignments {
            break;
        }
        assignments = new_assignments;
    }

    Ok(centroids)
}

/// Index of the centroid that ranks best for `vector` under `metric`.
pub(super) fn nearest_centroid(vector: &[f32], centroids: &[Vec<f32>], metric: Metric) -> usize {
    let mut best = 0;
    let mut best_value = metric.measure(vector, &centroids[0]);
    for (i, centroid) in centroids.iter().enumerate().skip(1) {
        let value = metric.measure(vector, centroid);
        if metric.compare(value, best_value).is_lt() {
            best = i;
            best_value = value;
        }
    }
    best
}

/// Seeding distance for k-means++: a non-negative "how far from this
/// centroid" value under either metric.
fn seed_distance(vector: &[f32], centroid: &[f32], metric: Metric) -> f32 {
    match metric {
        Metric::L2 => metric.measure(vector, centroid),
        Metric::InnerProduct => (1.0 - metric.measure(vector, centroid)).max(0.0),
    }
}

/// K-means++ initialization: pick the first centroid at random, then each
/// subsequent one with probability proportional to its squared distance
/// from the nearest chosen centroid.
fn init_kmeans_plus_plus(vectors: &[Vec<f32>], k: usize, metric: Metric) -> Vec<Vec<f32>> {
    let mut rng = rand::rng();
    let mut centroids = Vec::with_capacity(k);

    let first = rng.random_range(0..vectors.len());
    centroids.push(vectors[first].clone());

    while centroids.len() < k {
        let mut distances = vec![0.0f32; vectors.len()];
        let mut total = 0.0f32;

        for (i, vector) in vectors.iter().enumerate() {
            let mut min_distance = f32::MAX;
            for centroid in &centroids {
                min_distance = min_distance.min(seed_distance(vector, centroid, metric));
            }
            distances[i] = min_distance * min_distance;
            total += distances[i];
        }

        if total < EPSILON {
            // All remaining points coincide with chosen centroids; pad by
            // repeating existing points so the centroid count stays k.
            let idx = rng.random_range(0..vectors.len());
            centroids.push(vectors[idx].clone());
            continue;
        }

        let target = rng.random::<f32>() * total;
        let mut cumulative = 0.0;
        let mut chosen = vectors.len() - 1;
        for (i, &distance) in distances.iter().enumerate() {
            cumulative += distance;
            if cumulative >= target {
                chosen = i;
                break;
            }
        }
        centroids.push(vectors[chosen].clone());
    }

    centroids
}

/// Recompute each centroid as the mean of its assigned vectors. An empty
/// cluster is reseeded from a random input vector.
fn update_centroids(
    vectors: &[Vec<f32>],
    assignments: &[usize],
    k: usize,
    dimension: usize,
) -> Vec<Vec<f32>> {
    let mut centroids = vec![vec![0.0f32; dimension]; k];
    let mut sizes = vec![0usize; k];

    for (vector, &cluster) in vectors.iter().zip(assignments.iter()) {
        for (acc, &value) in centroids[cluster].iter_mut().zip(vector.iter()) {
            *acc += value;
        }
        sizes[cluster] += 1;
    }

    for (centroid, &size) in centroids.iter_mut().zip(sizes.iter()) {
        if size == 0 {
            let idx = rand::rng().random_range(0..vectors.len());
            *centroid = vectors[idx].clone();
        } else {
            for value in centroid.iter_mut() {
                *value /= size as f32;
            }
        }
    }

    centroids
}
