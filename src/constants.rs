//! Crate wide constants.

/// Maximum number of entries per R*-tree node.
pub const NODE_CAPACITY: usize = 16;

/// Default multiple of the initial radius after which a c-ANN search gives up.
pub const RADIUS_CEILING_FACTOR: f64 = 1e6;
