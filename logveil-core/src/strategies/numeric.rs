//! numeric.rs - Strategies for generic numeric columns.
//!
//! License: MIT OR APACHE 2.0

use log::debug;
use logveil_stats::statistics::compute_stats;
use rand::Rng;

use crate::errors::{InvalidValue, ValueKind};
use crate::strategies::condensation::{condense, CondensationOutcome};
use crate::strategies::noise::laplace;
use crate::strategies::ColumnOutcome;

fn parse_column(inputs: &[&str]) -> (Vec<(usize, f64)>, Vec<(usize, InvalidValue)>) {
    let mut parsed = Vec::new();
    let mut invalid = Vec::new();
    for (idx, value) in inputs.iter().enumerate() {
        match value.trim().parse::<f64>() {
            Ok(n) if n.is_finite() => parsed.push((idx, n)),
            _ => invalid.push((idx, InvalidValue::new(ValueKind::Numeric, *value))),
        }
    }
    (parsed, invalid)
}

fn render(value: f64, integral: bool) -> String {
    if integral {
        format!("{}", value.round() as i64)
    } else {
        format!("{value}")
    }
}

/// Adds Laplace noise scaled by the column's observed range over `epsilon`.
///
/// The range is computed once for the whole column. Integer-looking columns
/// stay integers.
pub fn add_noise<R: Rng + ?Sized>(inputs: &[&str], epsilon: f64, rng: &mut R) -> ColumnOutcome {
    let (parsed, invalid) = parse_column(inputs);
    let mut outcome = ColumnOutcome::unchanged(inputs);
    outcome.invalid = invalid;

    let numbers: Vec<f64> = parsed.iter().map(|(_, n)| *n).collect();
    let sensitivity = compute_stats(&numbers).range();
    let scale = sensitivity / epsilon;
    let integral = parsed.iter().all(|(idx, _)| !inputs[*idx].contains('.'));
    debug!("Differential noise: {} value(s), scale {:.4}", numbers.len(), scale);

    for (idx, n) in parsed {
        outcome.values[idx] = render(n + laplace(rng, scale), integral);
    }
    outcome
}

/// Replaces each value by its cluster mean plus Laplace(`1 / epsilon`) noise.
pub fn condense_numeric<R: Rng + ?Sized>(
    inputs: &[&str],
    k: usize,
    epsilon: f64,
    rng: &mut R,
) -> (ColumnOutcome, CondensationOutcome) {
    let (parsed, invalid) = parse_column(inputs);
    let mut outcome = ColumnOutcome::unchanged(inputs);
    outcome.invalid = invalid;

    let numbers: Vec<f64> = parsed.iter().map(|(_, n)| *n).collect();
    let condensation = condense(&numbers, k);
    if let CondensationOutcome::Balanced { assignment, means } = &condensation {
        let integral = parsed.iter().all(|(idx, _)| !inputs[*idx].contains('.'));
        let scale = 1.0 / epsilon;
        for (pos, (idx, _)) in parsed.iter().enumerate() {
            let noisy = means[assignment[pos]] + laplace(rng, scale);
            outcome.values[*idx] = render(noisy, integral);
        }
    }
    (outcome, condensation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn constant_column_gets_no_noise() {
        let mut rng = StdRng::seed_from_u64(1);
        let outcome = add_noise(&["5", "5", "5"], 1.0, &mut rng);
        assert_eq!(outcome.values, vec!["5", "5", "5"]);
    }

    #[test]
    fn noise_keeps_integers_integral_and_skips_garbage() {
        let mut rng = StdRng::seed_from_u64(9);
        let outcome = add_noise(&["10", "20", "n/a", "30"], 0.5, &mut rng);
        assert_eq!(outcome.values[2], "n/a");
        assert_eq!(outcome.invalid.len(), 1);
        for value in [&outcome.values[0], &outcome.values[1], &outcome.values[3]] {
            assert!(value.parse::<i64>().is_ok(), "{value}");
        }
    }

    #[test]
    fn condensation_releases_only_noisy_means() {
        let mut rng = StdRng::seed_from_u64(4);
        let inputs = ["1", "2", "3", "4", "5", "6", "7", "8", "9", "10"];
        let (outcome, condensation) = condense_numeric(&inputs, 3, 1.0, &mut rng);
        let sizes = condensation.cluster_sizes();
        assert!(sizes.iter().all(|&s| s >= 3));
        assert_eq!(outcome.values.len(), inputs.len());
        assert!(outcome.invalid.is_empty());
    }
}
