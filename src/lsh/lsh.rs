use crate::constants::RADIUS_CEILING_FACTOR;
use crate::dist::l2_dist;
use crate::error::{Error, Result};
use crate::hash::GaussianProjections;
use crate::rtree::{Entry, RTree, TreeStats};
use crate::table::{DataPoint, DataPointSlice, VecStore};
use fnv::FnvHashSet;
use itertools::Itertools;
use ndarray::Array2;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, trace};

/// A single search result: the id assigned at build time, the original
/// vector, and its exact Euclidean distance to the query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Neighbor {
    pub id: u32,
    pub point: DataPoint,
    pub distance: f64,
}

/// Index wide statistics.
#[derive(Debug, Clone, Serialize)]
pub struct EngineStats {
    pub n_points: usize,
    pub dim: usize,
    pub n_projections: usize,
    pub n_hash_tables: usize,
    pub trees: Vec<TreeStats>,
}

/// Outcome of one budgeted (r,c)-NN pass.
pub(crate) struct RoundScan {
    pub(crate) neighbors: Vec<Neighbor>,
    /// Distinct candidates whose exact distance was computed.
    pub(crate) scanned: usize,
}

/// Configures and builds a [`DbLsh`] index.
///
/// # Example
///
/// ```
/// use dblsh_rs::prelude::*;
/// let points = vec![vec![0., 0.], vec![1., 1.], vec![4., 4.]];
/// let index = DbLshBuilder::new(2, 3, 2)
///     .seed(1)
///     .approximation_ratio(2.0)
///     .budget_factor(4)
///     .build(points)
///     .unwrap();
/// assert_eq!(index.stats().n_points, 3);
/// ```
pub struct DbLshBuilder {
    n_projections: usize,
    n_hash_tables: usize,
    dim: usize,
    approximation_ratio: f64,
    budget_factor: usize,
    initial_radius: f64,
    ceiling_factor: f64,
    seed: u32,
    matrices: Option<Vec<Array2<f64>>>,
}

impl DbLshBuilder {
    /// # Arguments
    ///
    /// * `n_projections` - Projected dimension per table. `K` in literature.
    /// * `n_hash_tables` - Number of independent tables. Increases the chance
    ///   of finding the closest but has a performance and space cost. `L` in
    ///   literature.
    /// * `dim` - Dimensions of the data points.
    pub fn new(n_projections: usize, n_hash_tables: usize, dim: usize) -> Self {
        DbLshBuilder {
            n_projections,
            n_hash_tables,
            dim,
            approximation_ratio: 1.5,
            budget_factor: 1,
            initial_radius: 1.0,
            ceiling_factor: RADIUS_CEILING_FACTOR,
            seed: 0,
            matrices: None,
        }
    }

    /// Seed for the projection family.
    ///
    /// # Arguments
    /// * `seed` - Seed for the RNG. If 0, the RNG is seeded randomly.
    pub fn seed(&mut self, seed: u32) -> &mut Self {
        self.seed = seed;
        self
    }

    /// Approximation ratio `c`. Must exceed 1.
    pub fn approximation_ratio(&mut self, c: f64) -> &mut Self {
        self.approximation_ratio = c;
        self
    }

    /// Budget multiplier `t`. One search round computes at most
    /// `2 * t * L + k` exact distances.
    pub fn budget_factor(&mut self, t: usize) -> &mut Self {
        self.budget_factor = t;
        self
    }

    /// Initial search radius of the c-ANN driver.
    pub fn initial_radius(&mut self, r_min: f64) -> &mut Self {
        self.initial_radius = r_min;
        self
    }

    /// Give up a c-ANN search once the radius would exceed
    /// `factor * initial_radius`.
    pub fn radius_ceiling_factor(&mut self, factor: f64) -> &mut Self {
        self.ceiling_factor = factor;
        self
    }

    /// Inject projection matrices instead of drawing them from the seed.
    ///
    /// Supports learned or precomputed projections and makes results portable
    /// across implementations. The matrices must match the configured
    /// `(n_projections, dim)` shape and their number must equal
    /// `n_hash_tables`.
    pub fn projection_matrices(&mut self, matrices: Vec<Array2<f64>>) -> &mut Self {
        self.matrices = Some(matrices);
        self
    }

    fn validate(&self) -> Result<()> {
        if self.dim < 1 {
            return Err(Error::InvalidParam("dim must be at least 1".to_string()));
        }
        if self.n_projections < 1 {
            return Err(Error::InvalidParam(
                "n_projections must be at least 1".to_string(),
            ));
        }
        if self.n_hash_tables < 1 {
            return Err(Error::InvalidParam(
                "n_hash_tables must be at least 1".to_string(),
            ));
        }
        if !(self.approximation_ratio > 1.0) {
            return Err(Error::InvalidParam(
                "approximation ratio must exceed 1".to_string(),
            ));
        }
        if self.budget_factor < 1 {
            return Err(Error::InvalidParam(
                "budget factor must be at least 1".to_string(),
            ));
        }
        if !(self.initial_radius > 0.0) {
            return Err(Error::InvalidParam(
                "initial radius must be positive".to_string(),
            ));
        }
        if !(self.ceiling_factor >= 1.0) {
            return Err(Error::InvalidParam(
                "radius ceiling factor must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Consume the configuration and build a search ready index.
    ///
    /// Points are stored by value; ids are assigned by insertion position.
    /// The projection family is drawn first, then the `L` trees are bulk
    /// loaded, in parallel, from each table's projected entries.
    pub fn build(&mut self, points: Vec<DataPoint>) -> Result<DbLsh> {
        self.validate()?;
        for p in &points {
            if p.len() != self.dim {
                return Err(Error::DimensionMismatch {
                    expected: self.dim,
                    got: p.len(),
                });
            }
        }
        let projections = match self.matrices.take() {
            Some(matrices) => {
                let proj = GaussianProjections::from_matrices(matrices)?;
                if proj.n_tables() != self.n_hash_tables
                    || proj.n_projections() != self.n_projections
                    || proj.dim() != self.dim
                {
                    return Err(Error::InvalidParam(
                        "projection matrices do not match the configured shape".to_string(),
                    ));
                }
                proj
            }
            None => GaussianProjections::from_seed(
                self.n_projections,
                self.n_hash_tables,
                self.dim,
                self.seed,
            ),
        };

        let n_projections = self.n_projections;
        let vec_store = VecStore::from_points(points);
        let trees: Vec<RTree> = (0..self.n_hash_tables)
            .into_par_iter()
            .map(|table| {
                let entries: Vec<Entry> = vec_store
                    .map
                    .iter()
                    .enumerate()
                    .map(|(id, p)| Entry {
                        key: projections.project(table, p).to_vec(),
                        id: id as u32,
                    })
                    .collect();
                let tree = RTree::bulk_load(n_projections, entries);
                debug!(table, entries = tree.len(), "bulk loaded hash table");
                tree
            })
            .collect();

        let c = self.approximation_ratio;
        let window_base = 4.0 * c * c * self.initial_radius;
        info!(
            n_points = vec_store.len(),
            n_projections = self.n_projections,
            n_hash_tables = self.n_hash_tables,
            "built DB-LSH index"
        );
        Ok(DbLsh {
            n_hash_tables: self.n_hash_tables,
            n_projections: self.n_projections,
            dim: self.dim,
            approximation_ratio: c,
            budget_factor: self.budget_factor,
            initial_radius: self.initial_radius,
            window_base,
            radius_ceiling: self.ceiling_factor * self.initial_radius,
            projections,
            trees,
            vec_store,
        })
    }
}

/// DB-LSH index: `L` Gaussian projection tables, each indexed by an R*-tree
/// over the projected points, queried through expanding window searches.
///
/// The index is built once from a static point set and is read-only
/// afterwards, so concurrent queries need no locking.
#[derive(Debug)]
pub struct DbLsh {
    /// Number of hash tables. `L` in literature.
    pub n_hash_tables: usize,
    /// Number of projections per table. `K` in literature.
    pub n_projections: usize,
    /// Dimensions of the indexed points.
    pub dim: usize,
    approximation_ratio: f64,
    budget_factor: usize,
    initial_radius: f64,
    /// Base window width, `4 c^2 R_min`.
    window_base: f64,
    radius_ceiling: f64,
    projections: GaussianProjections,
    trees: Vec<RTree>,
    vec_store: VecStore,
}

impl DbLsh {
    pub(crate) fn validate_vec(&self, v: &DataPointSlice) -> Result<()> {
        if v.len() != self.dim {
            return Err(Error::DimensionMismatch {
                expected: self.dim,
                got: v.len(),
            });
        }
        Ok(())
    }

    /// One (r,c)-NN pass over all tables at a fixed radius.
    ///
    /// Returns up to `k` points within `c * radius` of `q`, computing at most
    /// `budget` exact distances. Candidates are deduplicated by id across
    /// tables before they count against the budget.
    ///
    /// # Arguments
    /// * `q` - Query vector.
    /// * `radius` - Search radius `r`; the admission threshold is `c * r`.
    /// * `k` - Return as soon as this many points are admitted.
    /// * `budget` - Cap on exact distance computations in this pass.
    pub fn query_rc_nn(
        &self,
        q: &DataPointSlice,
        radius: f64,
        k: usize,
        budget: usize,
    ) -> Result<Vec<Neighbor>> {
        self.validate_vec(q)?;
        if k < 1 {
            return Err(Error::InvalidParam("k must be at least 1".to_string()));
        }
        if !(radius > 0.0) {
            return Err(Error::InvalidParam("radius must be positive".to_string()));
        }
        if budget < 1 {
            return Err(Error::InvalidParam("budget must be at least 1".to_string()));
        }
        Ok(self.rc_nn(q, radius, k, budget).neighbors)
    }

    pub(crate) fn rc_nn(
        &self,
        q: &DataPointSlice,
        radius: f64,
        k: usize,
        budget: usize,
    ) -> RoundScan {
        let c = self.approximation_ratio;
        let half_width = self.window_base * radius / 2.0;
        let mut seen: FnvHashSet<u32> = FnvHashSet::default();
        let mut neighbors = Vec::new();
        let mut cnt = 0usize;

        for (table, tree) in self.trees.iter().enumerate() {
            let h = self.projections.project(table, q);
            let mins: Vec<f64> = h.iter().map(|x| x - half_width).collect();
            let maxs: Vec<f64> = h.iter().map(|x| x + half_width).collect();

            for entry in tree.window_query(&mins, &maxs) {
                // Dedup before the budget: the same id met through another
                // table must not consume distance work twice.
                if !seen.insert(entry.id) {
                    continue;
                }
                cnt += 1;
                let point = self.vec_store.get(entry.id);
                let distance = l2_dist(q, point);
                if distance <= c * radius {
                    neighbors.push(Neighbor {
                        id: entry.id,
                        point: point.clone(),
                        distance,
                    });
                    if neighbors.len() >= k {
                        return RoundScan {
                            neighbors,
                            scanned: cnt,
                        };
                    }
                }
                if cnt >= budget {
                    return RoundScan {
                        neighbors,
                        scanned: cnt,
                    };
                }
            }
            trace!(table, radius, scanned = cnt, "window pass");
        }
        RoundScan {
            neighbors,
            scanned: cnt,
        }
    }

    /// c-approximate k nearest neighbors, sorted by distance.
    ///
    /// Runs budgeted (r,c)-NN rounds at geometrically growing radii,
    /// accumulating distinct candidates, until `k` are found or the radius
    /// ceiling is reached. Ties on distance keep their discovery order.
    pub fn query_c_knn(&self, q: &DataPointSlice, k: usize) -> Result<Vec<Neighbor>> {
        self.validate_vec(q)?;
        if k < 1 {
            return Err(Error::InvalidParam("k must be at least 1".to_string()));
        }

        let n = self.vec_store.len();
        let mut accumulated: Vec<Neighbor> = Vec::new();
        if n == 0 {
            return Ok(accumulated);
        }

        let budget = 2 * self.budget_factor * self.n_hash_tables + k;
        let mut ids: FnvHashSet<u32> = FnvHashSet::default();
        let mut radius = self.initial_radius;
        loop {
            let round = self.rc_nn(q, radius, k, budget);
            for neighbor in round.neighbors {
                if ids.insert(neighbor.id) {
                    accumulated.push(neighbor);
                }
            }
            trace!(radius, accumulated = accumulated.len(), "search round");
            // Done once k candidates are in, or the whole data set is.
            if accumulated.len() >= k || accumulated.len() == n {
                break;
            }
            let next = radius * self.approximation_ratio;
            if next > self.radius_ceiling {
                debug!(
                    radius,
                    ceiling = self.radius_ceiling,
                    "radius ceiling reached, giving up"
                );
                break;
            }
            radius = next;
        }

        accumulated.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        accumulated.truncate(k);
        Ok(accumulated)
    }

    /// c-approximate nearest neighbor. None only for an empty index or when
    /// the radius ceiling is hit before any point is admitted.
    pub fn query_c_ann(&self, q: &DataPointSlice) -> Result<Option<Neighbor>> {
        Ok(self.query_c_knn(q, 1)?.into_iter().next())
    }

    /// Answer c-k-ANN for a batch of queries.
    ///
    /// # Arguments
    /// * `qs` - Array of query vectors.
    /// * `k` - Number of neighbors per query.
    pub fn query_c_knn_batch(&self, qs: &[DataPoint], k: usize) -> Result<Vec<Vec<Neighbor>>> {
        qs.iter().map(|q| self.query_c_knn(q, k)).collect()
    }

    /// Answer c-k-ANN for a batch of queries in parallel.
    ///
    /// Queries run against frozen state, so rounds never interact across
    /// threads and each per-query result equals its sequential counterpart.
    pub fn query_c_knn_batch_par(&self, qs: &[DataPoint], k: usize) -> Result<Vec<Vec<Neighbor>>> {
        qs.par_iter().map(|q| self.query_c_knn(q, k)).collect()
    }

    /// Number of indexed points.
    pub fn len(&self) -> usize {
        self.vec_store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vec_store.is_empty()
    }

    /// Approximation ratio `c` the index was built with.
    pub fn approximation_ratio(&self) -> f64 {
        self.approximation_ratio
    }

    /// Base window width `w0 = 4 c^2 R_min`.
    pub fn window_base(&self) -> f64 {
        self.window_base
    }

    pub fn stats(&self) -> EngineStats {
        EngineStats {
            n_points: self.vec_store.len(),
            dim: self.dim,
            n_projections: self.n_projections,
            n_hash_tables: self.n_hash_tables,
            trees: self.trees.iter().map(|t| t.stats()).collect(),
        }
    }

    /// Collects statistics of the index.
    ///
    /// # Statistics
    /// * number of points, tables and projections
    /// * window width constant
    /// * tree heights and node counts
    pub fn describe(&self) -> Result<String> {
        let stats = self.stats();
        let mut out = format!(
            "DB-LSH index: {} points in {}D, K = {}, L = {}\n",
            stats.n_points, stats.dim, stats.n_projections, stats.n_hash_tables
        );
        out.push_str(&format!(
            "c = {}, w0 = {}\n",
            self.approximation_ratio, self.window_base
        ));
        let (min_h, max_h) = stats
            .trees
            .iter()
            .map(|t| t.height)
            .minmax()
            .into_option()
            .unwrap_or((0, 0));
        out.push_str(&format!("tree height:\tmin {} max {}\n", min_h, max_h));
        let n_nodes: usize = stats.trees.iter().map(|t| t.n_nodes).sum();
        out.push_str(&format!("tree nodes:\t{}\n", n_nodes));
        Ok(out)
    }

    /// Drop all indexed data. The engine keeps its parameters and answers
    /// any further query over an empty data set.
    pub fn clear(&mut self) {
        for tree in &mut self.trees {
            tree.clear();
        }
        self.vec_store.clear();
    }
}
