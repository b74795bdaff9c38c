use rand::Rng;
use rand::rngs::StdRng;

/// Linear recency weights over labeled row index: the oldest row gets
/// `floor`, the newest gets 1.0. Recent regimes dominate fitting.
pub fn linear_weights(n: usize, floor: f64) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![1.0],
        _ => (0..n)
            .map(|i| floor + (1.0 - floor) * i as f64 / (n - 1) as f64)
            .collect(),
    }
}

/// Draw `weights.len()` indices with replacement, probability proportional
/// to weight. Tree fits in this crate take no per-sample weight argument, so
/// recency weighting is realized by resampling the training set instead.
pub fn weighted_bootstrap(rng: &mut StdRng, weights: &[f64]) -> Vec<usize> {
    let mut cumulative = Vec::with_capacity(weights.len());
    let mut total = 0.0;
    for w in weights {
        total += w.max(0.0);
        cumulative.push(total);
    }
    if total <= 0.0 {
        return (0..weights.len()).collect();
    }

    (0..weights.len())
        .map(|_| {
            let u = rng.random_range(0.0..total);
            cumulative.partition_point(|c| *c <= u).min(weights.len() - 1)
        })
        .collect()
}

/// Project `rows` through bootstrap `indices`.
pub fn select_rows<T: Clone>(rows: &[T], indices: &[usize]) -> Vec<T> {
    indices.iter().map(|i| rows[*i].clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_linear_weights_span_floor_to_one() {
        let w = linear_weights(10, 0.1);
        assert_eq!(w.len(), 10);
        assert!((w[0] - 0.1).abs() < 1e-12);
        assert!((w[9] - 1.0).abs() < 1e-12);
        assert!(w.windows(2).all(|p| p[1] >= p[0]));
    }

    #[test]
    fn test_linear_weights_degenerate_sizes() {
        assert!(linear_weights(0, 0.1).is_empty());
        assert_eq!(linear_weights(1, 0.1), vec![1.0]);
    }

    #[test]
    fn test_bootstrap_is_seeded_and_in_range() {
        let weights = linear_weights(50, 0.1);
        let a = weighted_bootstrap(&mut StdRng::seed_from_u64(7), &weights);
        let b = weighted_bootstrap(&mut StdRng::seed_from_u64(7), &weights);
        assert_eq!(a, b);
        assert_eq!(a.len(), 50);
        assert!(a.iter().all(|i| *i < 50));
    }

    #[test]
    fn test_bootstrap_biases_toward_heavy_rows() {
        // Weight mass is concentrated on the last index; it must dominate.
        let mut weights = vec![0.01; 100];
        weights[99] = 100.0;
        let draws = weighted_bootstrap(&mut StdRng::seed_from_u64(1), &weights);
        let heavy = draws.iter().filter(|i| **i == 99).count();
        assert!(heavy > 50, "expected heavy row to dominate, got {}", heavy);
    }
}
