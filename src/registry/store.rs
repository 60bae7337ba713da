use super::table::HandleTable;
use super::types::ObjectKind;
use crate::linalg::types::Backend;

use std::sync::Arc;

/// Per-session registry of every object a worker has created.
///
/// Maps and graphs are stored behind `Arc` because vectors, graphs and
/// matrices keep a reference to the object they were built from.
pub struct ObjectRegistry<B: Backend> {
    pub maps: HandleTable<Arc<B::Map>>,
    pub vectors: HandleTable<B::Vector>,
    pub graphs: HandleTable<Arc<B::Graph>>,
    pub matrices: HandleTable<B::Matrix>,
}

impl<B: Backend> ObjectRegistry<B> {
    /// Creates a registry with four empty tables.
    pub fn new() -> Self {
        Self {
            maps: HandleTable::new(ObjectKind::Map),
            vectors: HandleTable::new(ObjectKind::Vector),
            graphs: HandleTable::new(ObjectKind::Graph),
            matrices: HandleTable::new(ObjectKind::Matrix),
        }
    }

    /// Number of objects currently held in the table for `kind`.
    pub fn len(&self, kind: ObjectKind) -> usize {
        match kind {
            ObjectKind::Map => self.maps.len(),
            ObjectKind::Vector => self.vectors.len(),
            ObjectKind::Graph => self.graphs.len(),
            ObjectKind::Matrix => self.matrices.len(),
        }
    }

    /// Total number of objects across all tables.
    pub fn total(&self) -> usize {
        ObjectKind::ALL.iter().map(|&kind| self.len(kind)).sum()
    }
}

impl<B: Backend> Default for ObjectRegistry<B> {
    fn default() -> Self {
        Self::new()
    }
}
