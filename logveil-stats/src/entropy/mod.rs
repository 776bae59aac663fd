use libm::log2;

use crate::Bits;

/// Shannon entropy (bits) of a histogram given as raw occurrence counts.
///
/// Zero counts are ignored. An empty or all-zero histogram has entropy 0.
pub fn entropy_of_counts(counts: &[usize]) -> Bits {
    let total: usize = counts.iter().sum();
    if total == 0 {
        return 0.0;
    }

    let total = total as f64;
    let mut entropy = 0.0;
    for &count in counts {
        if count > 0 {
            let p = count as f64 / total;
            entropy -= p * log2(p);
        }
    }

    entropy
}
