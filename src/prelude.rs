//! Re-export of the public api of dblsh-rs.
pub use crate::{
    error::{Error, Result},
    hash::GaussianProjections,
    lsh::lsh::{DbLsh, DbLshBuilder, EngineStats, Neighbor},
    rtree::{Entry, RTree, TreeStats},
    table::{DataPoint, DataPointSlice},
};
