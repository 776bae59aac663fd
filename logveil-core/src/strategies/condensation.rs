//! condensation.rs - k-member clustering for condensation strategies.
//!
//! Values are grouped by a deterministic one-dimensional k-means and then
//! rebalanced so every cluster holds at least `k` members. Callers replace
//! each value by its cluster mean plus noise, so no released value is tied
//! to fewer than `k` originals.
//!
//! The cluster count is `min(k, n / k)` (at least one). With `n >= k` that
//! makes the balancing always satisfiable: while some cluster is short, the
//! others together hold more than their minimum, so a donor exists.

use logveil_stats::statistics::mean;

/// Upper bound on Lloyd iterations.
pub const MAX_LLOYD_ITERATIONS: usize = 50;

/// Result of one condensation call.
#[derive(Debug, Clone, PartialEq)]
pub enum CondensationOutcome {
    /// Every cluster has at least `k` members.
    Balanced {
        /// Cluster id per input value.
        assignment: Vec<usize>,
        /// Mean of the members of each cluster.
        means: Vec<f64>,
    },
    /// Fewer than `k` values: nothing can be released safely.
    Underflow { records: usize, k: usize },
}

impl CondensationOutcome {
    pub fn cluster_sizes(&self) -> Vec<usize> {
        match self {
            CondensationOutcome::Balanced { assignment, means } => {
                let mut sizes = vec![0; means.len()];
                for &cluster in assignment {
                    sizes[cluster] += 1;
                }
                sizes
            }
            CondensationOutcome::Underflow { .. } => Vec::new(),
        }
    }
}

/// Clusters `values` into groups of at least `k` members.
pub fn condense(values: &[f64], k: usize) -> CondensationOutcome {
    let k = k.max(1);
    let n = values.len();
    if n < k || n == 0 {
        return CondensationOutcome::Underflow { records: n, k };
    }

    let clusters = (n / k).min(k).max(1);
    let (mut assignment, centers) = kmeans_1d(values, clusters);
    rebalance(values, &mut assignment, &centers, k);

    let means = (0..clusters)
        .map(|cluster| {
            let members: Vec<f64> = assignment
                .iter()
                .zip(values)
                .filter(|&(&c, _)| c == cluster)
                .map(|(_, &v)| v)
                .collect();
            mean(&members)
        })
        .collect();

    CondensationOutcome::Balanced { assignment, means }
}

fn nearest(centers: &[f64], value: f64) -> usize {
    let mut best = 0;
    for (idx, center) in centers.iter().enumerate() {
        if (value - center).abs() < (value - centers[best]).abs() {
            best = idx;
        }
    }
    best
}

/// Lloyd's algorithm with quantile seeding; deterministic for a given input.
fn kmeans_1d(values: &[f64], clusters: usize) -> (Vec<usize>, Vec<f64>) {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let n = sorted.len();
    let mut centers: Vec<f64> = (0..clusters)
        .map(|j| sorted[((2 * j + 1) * n / (2 * clusters)).min(n - 1)])
        .collect();

    let mut assignment: Vec<usize> = values.iter().map(|&v| nearest(&centers, v)).collect();
    for _ in 0..MAX_LLOYD_ITERATIONS {
        for (cluster, center) in centers.iter_mut().enumerate() {
            let members: Vec<f64> = assignment
                .iter()
                .zip(values)
                .filter(|&(&c, _)| c == cluster)
                .map(|(_, &v)| v)
                .collect();
            // An empty cluster keeps its seed.
            if !members.is_empty() {
                *center = mean(&members);
            }
        }
        let next: Vec<usize> = values.iter().map(|&v| nearest(&centers, v)).collect();
        if next == assignment {
            break;
        }
        assignment = next;
    }
    (assignment, centers)
}

/// Moves the nearest members of oversized clusters into undersized ones,
/// smallest cluster first. Donors never drop below `k`.
fn rebalance(values: &[f64], assignment: &mut [usize], centers: &[f64], k: usize) {
    let mut sizes = vec![0usize; centers.len()];
    for &cluster in assignment.iter() {
        sizes[cluster] += 1;
    }

    // One ordered pass suffices; the bound only guards against regressions.
    for _ in 0..centers.len() {
        if sizes.iter().all(|&s| s >= k) {
            break;
        }
        let mut order: Vec<usize> = (0..centers.len()).collect();
        order.sort_by_key(|&c| sizes[c]);

        for target in order {
            if sizes[target] >= k {
                continue;
            }
            let mut candidates: Vec<usize> = (0..values.len()).collect();
            candidates.sort_by(|&a, &b| {
                let da = (values[a] - centers[target]).abs();
                let db = (values[b] - centers[target]).abs();
                da.total_cmp(&db).then(a.cmp(&b))
            });
            for idx in candidates {
                let donor = assignment[idx];
                if donor != target && sizes[donor] > k {
                    sizes[donor] -= 1;
                    sizes[target] += 1;
                    assignment[idx] = target;
                    if sizes[target] >= k {
                        break;
                    }
                }
            }
        }
    }
}
