//! Point storage shared by the hash tables.
use serde::{Deserialize, Serialize};

pub type DataPoint = Vec<f64>;
pub type DataPointSlice = [f64];

/// Indexible vector storage.
/// The ids stored in the per-table R*-trees index into this structure; the
/// original vectors are looked up here at refinement time.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct VecStore {
    pub(crate) map: Vec<DataPoint>,
}

impl VecStore {
    pub(crate) fn from_points(points: Vec<DataPoint>) -> Self {
        VecStore { map: points }
    }

    pub(crate) fn get(&self, idx: u32) -> &DataPoint {
        &self.map[idx as usize]
    }

    pub(crate) fn len(&self) -> usize {
        self.map.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub(crate) fn clear(&mut self) {
        self.map.clear();
    }
}
