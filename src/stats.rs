//! Parameter estimation for window based LSH.
//!
//! For a query q and a point o at distance `s`, each Gaussian projection of
//! the offset `o - q` is N(0, s^2). These helpers estimate how likely o is to
//! fall inside a search window, which is what drives the choice of `K` and
//! `L` for a target recall.
use statrs::distribution::{ContinuousCDF, Normal};

/// Probability that one projection coordinate of a point at distance `s`
/// lands inside a window of full width `w` centered on the projected query.
///
/// P(|X| <= w / 2) with X ~ N(0, s^2), i.e. 1 - 2 Phi(-w / (2 s)).
pub fn window_collision_prob(w: f64, s: f64) -> f64 {
    let norm = Normal::new(0., 1.).unwrap();
    1. - 2. * norm.cdf(-w / (2. * s))
}

/// Probability that a point at distance `s` survives all `k` coordinates of
/// one table's window.
pub fn table_success_prob(w: f64, s: f64, k: usize) -> f64 {
    window_collision_prob(w, s).powi(k as i32)
}

/// Number of tables needed to miss a near point with probability at most
/// `delta`, given per-coordinate collision probability `p1` and `k`
/// projections per table.
///
/// # Arguments
/// * `delta` - Prob. the near point is found in no table.
/// * `p1` - Per-coordinate collision probability.
/// * `k` - Number of projections per table.
pub fn estimate_n_tables(delta: f64, p1: f64, k: usize) -> usize {
    (delta.ln() / (1. - p1.powf(k as f64)).ln()).round() as usize
}
