//! Gaussian projection families.
use crate::error::{Error, Result};
use crate::utils::create_rng;
use ndarray::prelude::*;
use rand::distributions::Uniform;
use rand::Rng;

/// Samples standard normal deviates with the Marsaglia polar method.
///
/// Pairs are derived from uniforms on (-1, 1); the second deviate of each
/// accepted pair is kept for the next call, so the sequence of draws is a
/// fixed function of the underlying generator state.
pub(crate) struct PolarNormal {
    unit: Uniform<f64>,
    spare: Option<f64>,
}

impl PolarNormal {
    pub(crate) fn new() -> Self {
        PolarNormal {
            unit: Uniform::new(-1.0, 1.0),
            spare: None,
        }
    }

    pub(crate) fn sample<R: Rng>(&mut self, rng: &mut R) -> f64 {
        if let Some(z) = self.spare.take() {
            return z;
        }
        loop {
            let u = rng.sample(self.unit);
            let v = rng.sample(self.unit);
            let s = u * u + v * v;
            if s > 0.0 && s < 1.0 {
                let m = (-2.0 * s.ln() / s).sqrt();
                self.spare = Some(v * m);
                return u * m;
            }
        }
    }
}

/// A family of Gaussian random projections, one `K x D` matrix per hash table.
///
/// Rows are not normalized to unit length; the window-width constant of the
/// search already absorbs the scale of the projections.
#[derive(Debug, Clone)]
pub struct GaussianProjections {
    tables: Vec<Array2<f64>>,
    n_projections: usize,
    dim: usize,
}

impl GaussianProjections {
    /// Draw a fresh family from a seeded MT19937 stream.
    ///
    /// Matrices are filled in table-major, row-major order, so identical
    /// `(seed, dim, n_projections, n_hash_tables)` reproduce the family bit
    /// for bit across builds.
    ///
    /// # Arguments
    /// * `n_projections` - Rows per matrix. `K` in literature.
    /// * `n_hash_tables` - Number of matrices. `L` in literature.
    /// * `dim` - Columns per matrix, the dimension of the data points.
    /// * `seed` - Seed for the RNG. If 0, the RNG is seeded randomly.
    pub fn from_seed(n_projections: usize, n_hash_tables: usize, dim: usize, seed: u32) -> Self {
        let mut rng = create_rng(seed);
        let mut normal = PolarNormal::new();
        let mut tables = Vec::with_capacity(n_hash_tables);
        for _ in 0..n_hash_tables {
            let mut coeffs = Vec::with_capacity(n_projections * dim);
            for _ in 0..n_projections * dim {
                coeffs.push(normal.sample(&mut rng));
            }
            let a = Array2::from_shape_vec((n_projections, dim), coeffs)
                .expect("coefficient count matches matrix shape");
            tables.push(a);
        }
        GaussianProjections {
            tables,
            n_projections,
            dim,
        }
    }

    /// Build a family from caller supplied matrices, e.g. learned or
    /// precomputed projections. All matrices must share one `K x D` shape.
    pub fn from_matrices(tables: Vec<Array2<f64>>) -> Result<Self> {
        let first = tables.first().ok_or_else(|| {
            Error::InvalidParam("at least one projection matrix is required".to_string())
        })?;
        let (n_projections, dim) = first.dim();
        if n_projections < 1 || dim < 1 {
            return Err(Error::InvalidParam(
                "projection matrices may not be empty".to_string(),
            ));
        }
        if tables.iter().any(|a| a.dim() != (n_projections, dim)) {
            return Err(Error::InvalidParam(
                "projection matrices must share one shape".to_string(),
            ));
        }
        Ok(GaussianProjections {
            tables,
            n_projections,
            dim,
        })
    }

    pub fn n_tables(&self) -> usize {
        self.tables.len()
    }

    pub fn n_projections(&self) -> usize {
        self.n_projections
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Project `v` into the K-dimensional space of table `table`.
    pub fn project(&self, table: usize, v: &[f64]) -> Array1<f64> {
        debug_assert_eq!(v.len(), self.dim);
        self.tables[table].dot(&aview1(v))
    }
}
