use libm::fabs;

/// Earth-mover's distance between two distributions over the same ordered
/// set of `m` categories, using unit ground distance between neighbours.
///
/// Both slices hold non-negative weights indexed by category rank; each is
/// normalised to sum to 1 before comparison. The result is divided by
/// `m - 1` so it lies in `[0, 1]`. Mismatched lengths, fewer than two
/// categories, or an all-zero side yield 0.
pub fn ordered_emd(p: &[f64], q: &[f64]) -> f64 {
    if p.len() != q.len() || p.len() < 2 {
        return 0.0;
    }

    let p_total: f64 = p.iter().sum();
    let q_total: f64 = q.iter().sum();
    if p_total <= 0.0 || q_total <= 0.0 {
        return 0.0;
    }

    let mut carried = 0.0;
    let mut work = 0.0;
    // The last category never carries mass further.
    for (pi, qi) in p.iter().zip(q.iter()).take(p.len() - 1) {
        carried += pi / p_total - qi / q_total;
        work += fabs(carried);
    }

    work / (p.len() - 1) as f64
}
