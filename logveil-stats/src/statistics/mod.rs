/// Summary statistics of a numeric sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleStats {
    /// The arithmetic mean.
    pub mean: f64,
    /// Smallest observed value (0 for an empty sample).
    pub min: f64,
    /// Largest observed value (0 for an empty sample).
    pub max: f64,
}

impl SampleStats {
    /// Width of the observed range, `max - min`.
    pub fn range(&self) -> f64 {
        self.max - self.min
    }
}

/// Calculates mean and range for a slice of values.
pub fn compute_stats(values: &[f64]) -> SampleStats {
    if values.is_empty() {
        return SampleStats { mean: 0.0, min: 0.0, max: 0.0 };
    }

    let mean = mean(values);
    let (min, max) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (if v < lo { v } else { lo }, if v > hi { v } else { hi })
        });

    SampleStats { mean, min, max }
}

/// Arithmetic mean; 0 for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    extern crate alloc;
    use alloc::vec;

    const EPSILON: f64 = 1e-10;

    #[test]
    fn test_compute_stats_empty() {
        let stats = compute_stats(&[]);
        assert_eq!(stats.mean, 0.0);
        assert_eq!(stats.range(), 0.0);
    }

    #[test]
    fn test_compute_stats_single_value() {
        let stats = compute_stats(&[5.0]);
        assert_eq!(stats.mean, 5.0);
        assert_eq!(stats.range(), 0.0);
        assert_eq!(stats.min, 5.0);
        assert_eq!(stats.max, 5.0);
    }

    #[test]
    fn test_compute_stats_simple_range() {
        // Values: 2, 4, 4, 4, 5, 5, 7, 9
        let values = vec![2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let stats = compute_stats(&values);

        assert!((stats.mean - 5.0).abs() < EPSILON);
        assert!((stats.range() - 7.0).abs() < EPSILON);
    }
}
