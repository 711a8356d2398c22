//! DB-LSH engine: index construction and the (r,c)-NN / c-ANN search drivers.
pub mod lsh;
