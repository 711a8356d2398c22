use rand::Rng;
use rand_distr::StandardNormal;
use rand_mt::Mt19937GenRand32;

/// Create the seeded MT19937 generator that drives the projection draws.
///
/// # Arguments
/// * `seed` - Seed for the RNG. If 0, the RNG is seeded randomly.
pub fn create_rng(seed: u32) -> Mt19937GenRand32 {
    if seed == 0 {
        Mt19937GenRand32::new(rand::random())
    } else {
        Mt19937GenRand32::new(seed)
    }
}

/// Gaussian random vector. Handy for generating synthetic data sets.
pub fn rand_gaussian_vec<R: Rng>(size: usize, rng: R) -> Vec<f64> {
    rng.sample_iter(StandardNormal).take(size).collect()
}
