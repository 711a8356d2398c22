//! Distance functions.
use ndarray::prelude::*;

/// L2 norm of a single vector.
///
/// # Examples
///
/// ```
/// use dblsh_rs::dist::l2_norm;
/// let a = vec![3., 4.];
/// assert!((l2_norm(&a) - 5.).abs() < 1e-12);
/// ```
pub fn l2_norm(x: &[f64]) -> f64 {
    let x = aview1(x);
    x.dot(&x).sqrt()
}

/// Euclidean distance between two vectors.
///
/// # Panics
///
/// Panics if `a.len() != b.len()`.
///
/// # Examples
///
/// ```
/// use dblsh_rs::dist::l2_dist;
/// let a = vec![1., -1.];
/// let b = vec![1., 1.];
/// assert!((l2_dist(&a, &b) - 2.).abs() < 1e-12);
/// ```
pub fn l2_dist(a: &[f64], b: &[f64]) -> f64 {
    assert_eq!(a.len(), b.len());
    a.iter()
        .zip(b)
        .map(|(ai, bi)| {
            let d = ai - bi;
            d * d
        })
        .sum::<f64>()
        .sqrt()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_l2_dist_zero() {
        let a = vec![0.3, -1.2, 4.5];
        assert_eq!(l2_dist(&a, &a), 0.0);
    }

    #[test]
    fn test_l2_dist_matches_norm_of_difference() {
        let a = vec![1., 2., 3.];
        let b = vec![-1., 0.5, 2.];
        let diff: Vec<f64> = a.iter().zip(&b).map(|(x, y)| x - y).collect();
        assert!((l2_dist(&a, &b) - l2_norm(&diff)).abs() < 1e-12);
    }
}
