//! Lloyd's K-Means with k-means++ seeding and the silhouette coefficient.
//!
//! Rows are plain `Vec<f64>` points of equal dimension. Runs are reproducible:
//! all randomness comes from a single `StdRng` seeded by the caller.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::{Result, TrailError};

#[derive(Debug, Clone)]
pub struct KMeansResult {
    /// Cluster index per input row.
    pub labels: Vec<usize>,
    pub centroids: Vec<Vec<f64>>,
    /// Sum of squared distances to the assigned centroid.
    pub inertia: f64,
    pub iterations: usize,
}

/// Best of `n_init` independent runs.
///
/// `k` must be at least 1 and at most the number of rows.
pub fn kmeans(data: &[Vec<f64>], k: usize, n_init: usize, max_iter: usize, seed: u64) -> Result<KMeansResult> {
    if k == 0 {
        return Err(TrailError::UnsupportedClusterCount(k));
    }
    if k > data.len() {
        return Err(TrailError::InsufficientTrails {
            trails: data.len(),
            clusters: k,
        });
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut best = lloyd(data, init_plus_plus(data, k, &mut rng), max_iter);

    for _ in 1..n_init {
        let run = lloyd(data, init_plus_plus(data, k, &mut rng), max_iter);
        if run.inertia < best.inertia {
            best = run;
        }
    }

    Ok(best)
}

fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y).powi(2)).sum()
}

fn nearest(point: &[f64], centroids: &[Vec<f64>]) -> (usize, f64) {
    centroids
        .iter()
        .enumerate()
        .map(|(i, c)| (i, squared_distance(point, c)))
        .fold((0, f64::INFINITY), |best, cur| if cur.1 < best.1 { cur } else { best })
}

/// k-means++: each new center is drawn with probability proportional to the
/// squared distance from the closest center already chosen.
fn init_plus_plus(data: &[Vec<f64>], k: usize, rng: &mut StdRng) -> Vec<Vec<f64>> {
    let mut centroids = vec![data[rng.gen_range(0..data.len())].clone()];

    while centroids.len() < k {
        let weights: Vec<f64> = data.iter().map(|p| nearest(p, &centroids).1).collect();
        let total: f64 = weights.iter().sum();

        let index = if total > 0.0 {
            let mut target = rng.gen::<f64>() * total;
            let mut chosen = data.len() - 1;
            for (i, w) in weights.iter().enumerate() {
                if target < *w {
                    chosen = i;
                    break;
                }
                target -= w;
            }
            chosen
        } else {
            rng.gen_range(0..data.len())
        };

        centroids.push(data[index].clone());
    }

    centroids
}

fn lloyd(data: &[Vec<f64>], mut centroids: Vec<Vec<f64>>, max_iter: usize) -> KMeansResult {
    let k = centroids.len();
    let dim = data[0].len();
    let mut labels = vec![usize::MAX; data.len()];
    let mut iterations = 0;

    for iter in 0..max_iter {
        iterations = iter + 1;

        let mut changed = false;
        for (i, point) in data.iter().enumerate() {
            let (cluster, _) = nearest(point, &centroids);
            if labels[i] != cluster {
                labels[i] = cluster;
                changed = true;
            }
        }
        if !changed {
            break;
        }

        let mut sums = vec![vec![0.0; dim]; k];
        let mut counts = vec![0usize; k];
        for (point, &label) in data.iter().zip(&labels) {
            counts[label] += 1;
            for (s, v) in sums[label].iter_mut().zip(point) {
                *s += v;
            }
        }

        for c in 0..k {
            if counts[c] > 0 {
                centroids[c] = sums[c].iter().map(|s| s / counts[c] as f64).collect();
            } else {
                // Empty cluster takes over the point farthest from its centroid
                let far = data
                    .iter()
                    .enumerate()
                    .map(|(i, p)| (i, squared_distance(p, &centroids[labels[i]])))
                    .fold((0, -1.0), |best, cur| if cur.1 > best.1 { cur } else { best })
                    .0;
                centroids[c] = data[far].clone();
                labels[far] = c;
            }
        }
    }

    let inertia = data
        .iter()
        .zip(&labels)
        .map(|(p, &l)| squared_distance(p, &centroids[l]))
        .sum();

    KMeansResult {
        labels,
        centroids,
        inertia,
        iterations,
    }
}

/// Mean silhouette coefficient. `None` unless there are at least two
/// populated clusters and fewer clusters than rows.
pub fn silhouette_score(data: &[Vec<f64>], labels: &[usize]) -> Option<f64> {
    let n = data.len();
    let cluster_count = labels.iter().max().map_or(0, |m| m + 1);
    let mut sizes = vec![0usize; cluster_count];
    for &l in labels {
        sizes[l] += 1;
    }
    let populated = sizes.iter().filter(|&&s| s > 0).count();
    if populated < 2 || populated >= n {
        return None;
    }

    let mut total = 0.0;
    for i in 0..n {
        let own = labels[i];
        if sizes[own] == 1 {
            // Singleton clusters score zero
            continue;
        }

        let mut sums = vec![0.0; cluster_count];
        for j in 0..n {
            if i != j {
                sums[labels[j]] += squared_distance(&data[i], &data[j]).sqrt();
            }
        }

        let a = sums[own] / (sizes[own] - 1) as f64;
        let b = (0..cluster_count)
            .filter(|&c| c != own && sizes[c] > 0)
            .map(|c| sums[c] / sizes[c] as f64)
            .fold(f64::INFINITY, f64::min);

        let denom = a.max(b);
        if denom > 0.0 {
            total += (b - a) / denom;
        }
    }

    Some(total / n as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blobs() -> Vec<Vec<f64>> {
        vec![
            vec![0.0, 0.0],
            vec![0.1, -0.1],
            vec![-0.1, 0.1],
            vec![10.0, 10.0],
            vec![10.1, 9.9],
            vec![9.9, 10.1],
            vec![-10.0, 10.0],
            vec![-10.1, 10.1],
        ]
    }

    #[test]
    fn test_separates_obvious_blobs() {
        let data = blobs();
        let result = kmeans(&data, 3, 10, 300, 42).unwrap();

        assert_eq!(result.labels[0], result.labels[1]);
        assert_eq!(result.labels[0], result.labels[2]);
        assert_eq!(result.labels[3], result.labels[4]);
        assert_eq!(result.labels[3], result.labels[5]);
        assert_eq!(result.labels[6], result.labels[7]);
        assert_ne!(result.labels[0], result.labels[3]);
        assert_ne!(result.labels[0], result.labels[6]);
        assert_ne!(result.labels[3], result.labels[6]);
        assert!(result.inertia < 0.2);
    }

    #[test]
    fn test_same_seed_same_result() {
        let data = blobs();
        let a = kmeans(&data, 2, 5, 300, 7).unwrap();
        let b = kmeans(&data, 2, 5, 300, 7).unwrap();
        assert_eq!(a.labels, b.labels);
        assert_eq!(a.inertia, b.inertia);
    }

    #[test]
    fn test_identical_points() {
        let data = vec![vec![1.0, 1.0]; 4];
        let result = kmeans(&data, 2, 3, 50, 1).unwrap();
        assert_eq!(result.inertia, 0.0);
        assert_eq!(result.labels.len(), 4);
    }

    #[test]
    fn test_rejects_more_clusters_than_rows() {
        let data = vec![vec![0.0], vec![1.0]];
        assert!(matches!(
            kmeans(&data, 3, 5, 100, 42),
            Err(TrailError::InsufficientTrails { trails: 2, clusters: 3 })
        ));
        assert!(matches!(
            kmeans(&data, 0, 5, 100, 42),
            Err(TrailError::UnsupportedClusterCount(0))
        ));
    }

    #[test]
    fn test_zero_restarts_still_runs_once() {
        let data = blobs();
        let result = kmeans(&data, 3, 0, 300, 42).unwrap();
        assert_eq!(result.labels.len(), data.len());
    }

    #[test]
    fn test_silhouette_well_separated() {
        let data = blobs();
        let result = kmeans(&data, 3, 10, 300, 42).unwrap();
        let score = silhouette_score(&data, &result.labels).unwrap();
        assert!(score > 0.9, "got {score}");
    }

    #[test]
    fn test_silhouette_degenerate() {
        let data = blobs();
        assert_eq!(silhouette_score(&data, &vec![0; data.len()]), None);
        let each_own: Vec<usize> = (0..data.len()).collect();
        assert_eq!(silhouette_score(&data, &each_own), None);
    }

    #[test]
    fn test_silhouette_known_value() {
        // Two clusters on a line: {0, 1} and {4}
        let data = vec![vec![0.0], vec![1.0], vec![4.0]];
        let score = silhouette_score(&data, &[0, 0, 1]).unwrap();
        // s0 = (4 - 1) / 4, s1 = (3 - 1) / 3, singleton scores 0
        let expected = (0.75 + 2.0 / 3.0) / 3.0;
        assert!((score - expected).abs() < 1e-12);
    }
}
