//! # dblsh-rs
//!
//! Approximate nearest neighbor search under Euclidean distance, combining
//! Gaussian random projections with per-table R*-trees.
//!
//! Each of `L` hash tables projects the data set with an independent `K x D`
//! matrix of standard normal coefficients and indexes the projected points
//! with an R*-tree. A query runs axis-aligned window searches at
//! geometrically expanding radii, refines the candidates with exact distances
//! in the original space, and terminates by radius success or by a
//! candidate-budget cap.
//!
//! ```
//! use dblsh_rs::prelude::*;
//!
//! let points = vec![
//!     vec![1.0, 1.0],
//!     vec![2.0, 2.0],
//!     vec![5.0, 5.0],
//! ];
//! let index = DbLshBuilder::new(2, 4, 2)
//!     .seed(7)
//!     .approximation_ratio(1.5)
//!     .build(points)
//!     .unwrap();
//! let nn = index.query_c_ann(&[1.1, 0.9]).unwrap();
//! assert!(nn.is_some());
//! ```
pub(crate) mod constants;
pub mod dist;
pub mod error;
pub mod hash;
pub mod lsh;
pub mod prelude;
pub mod rtree;
pub mod stats;
pub mod table;
pub mod utils;

pub use crate::error::{Error, Result};
pub use crate::lsh::lsh::{DbLsh, DbLshBuilder, Neighbor};
