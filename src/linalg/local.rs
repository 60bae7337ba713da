//! In-memory backend.
//!
//! Each worker holds only its own partition. Nothing here talks to other workers:
//! cross-worker consistency is the controller's job (see `controller::partitioner`).

use super::types::*;
use crate::types::{Global, Scalar};

use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, Default)]
pub struct LocalBackend;

impl Backend for LocalBackend {
    type Map = LocalMap;
    type Graph = LocalGraph;
    type Vector = LocalVector;
    type Matrix = LocalMatrix;

    fn create_map(&self, size: Global, elements: Vec<Global>) -> Result<LocalMap, BackendError> {
        LocalMap::new(size, elements)
    }

    fn create_vector(&self, map: Arc<LocalMap>) -> Result<LocalVector, BackendError> {
        Ok(LocalVector::new(map))
    }

    fn create_graph(
        &self,
        map: Arc<LocalMap>,
        row_capacity: &[usize],
    ) -> Result<LocalGraph, BackendError> {
        LocalGraph::new(map, row_capacity)
    }

    fn create_matrix(&self, graph: Arc<LocalGraph>) -> Result<LocalMatrix, BackendError> {
        LocalMatrix::new(graph)
    }
}

/// Local view of an index space: the owned identifiers plus a reverse lookup.
#[derive(Debug)]
pub struct LocalMap {
    size: Global,
    elements: Vec<Global>,
    lookup: HashMap<Global, usize>,
}

impl LocalMap {
    pub fn new(size: Global, elements: Vec<Global>) -> Result<Self, BackendError> {
        let mut lookup = HashMap::with_capacity(elements.len());

        for (position, &element) in elements.iter().enumerate() {
            if element < 0 || element >= size {
                return Err(BackendError::ElementOutOfRange { element, size });
            }
            if lookup.insert(element, position).is_some() {
                return Err(BackendError::DuplicateElement(element));
            }
        }

        Ok(Self {
            size,
            elements,
            lookup,
        })
    }
}

impl IndexSpace for LocalMap {
    fn global_size(&self) -> Global {
        self.size
    }

    fn local_len(&self) -> usize {
        self.elements.len()
    }

    fn global_elements(&self) -> &[Global] {
        &self.elements
    }

    fn local_index(&self, global: Global) -> Option<usize> {
        self.lookup.get(&global).copied()
    }
}

#[derive(Debug)]
pub struct LocalVector {
    map: Arc<LocalMap>,
    values: Vec<Scalar>,
}

impl LocalVector {
    pub fn new(map: Arc<LocalMap>) -> Self {
        let values = vec![0.0; map.local_len()];
        Self { map, values }
    }
}

impl DistributedVector for LocalVector {
    fn sum_into_global_value(
        &mut self,
        global: Global,
        value: Scalar,
    ) -> Result<(), BackendError> {
        let index = self
            .map
            .local_index(global)
            .ok_or(BackendError::NotOwned(global))?;
        self.values[index] += value;
        Ok(())
    }

    fn local_values(&self) -> &[Scalar] {
        &self.values
    }
}

/// Row-wise column lists with a fixed per-row capacity.
///
/// Rows are sorted and deduplicated when the graph is sealed.
#[derive(Debug)]
pub struct LocalGraph {
    map: Arc<LocalMap>,
    capacity: Vec<usize>,
    rows: Vec<Vec<Global>>,
    sealed: bool,
}

impl LocalGraph {
    pub fn new(map: Arc<LocalMap>, row_capacity: &[usize]) -> Result<Self, BackendError> {
        if row_capacity.len() != map.local_len() {
            return Err(BackendError::RowCountMismatch {
                expected: map.local_len(),
                actual: row_capacity.len(),
            });
        }

        let rows = row_capacity
            .iter()
            .map(|&capacity| Vec::with_capacity(capacity))
            .collect();

        Ok(Self {
            map,
            capacity: row_capacity.to_vec(),
            rows,
            sealed: false,
        })
    }
}

impl ConnectivityGraph for LocalGraph {
    fn local_rows(&self) -> usize {
        self.rows.len()
    }

    fn insert_global_indices(
        &mut self,
        row: usize,
        columns: &[Global],
    ) -> Result<(), BackendError> {
        if self.sealed {
            return Err(BackendError::GraphSealed);
        }

        let rows = self.rows.len();
        let size = self.map.global_size();
        let capacity = self.capacity.get(row).copied();
        let entries = self
            .rows
            .get_mut(row)
            .ok_or(BackendError::RowOutOfRange { row, rows })?;

        if let Some(&column) = columns.iter().find(|&&c| c < 0 || c >= size) {
            return Err(BackendError::ColumnOutOfRange { column, size });
        }

        let capacity = capacity.unwrap_or_default();
        if entries.len() + columns.len() > capacity {
            return Err(BackendError::RowCapacityExceeded { row, capacity });
        }

        entries.extend_from_slice(columns);
        Ok(())
    }

    fn fill_complete(&mut self) -> Result<(), BackendError> {
        if self.sealed {
            return Err(BackendError::GraphSealed);
        }

        for row in &mut self.rows {
            row.sort_unstable();
            row.dedup();
        }
        self.sealed = true;

        Ok(())
    }

    fn is_sealed(&self) -> bool {
        self.sealed
    }

    fn row(&self, row: usize) -> Option<&[Global]> {
        self.rows.get(row).map(Vec::as_slice)
    }

    fn num_entries(&self) -> usize {
        self.rows.iter().map(Vec::len).sum()
    }
}

/// Matrix values stored row by row over the pattern of a sealed graph.
#[derive(Debug)]
pub struct LocalMatrix {
    graph: Arc<LocalGraph>,
    values: Vec<Vec<Scalar>>,
}

impl LocalMatrix {
    pub fn new(graph: Arc<LocalGraph>) -> Result<Self, BackendError> {
        if !graph.is_sealed() {
            return Err(BackendError::GraphNotSealed);
        }

        let values = graph.rows.iter().map(|row| vec![0.0; row.len()]).collect();

        Ok(Self { graph, values })
    }
}

impl DistributedMatrix for LocalMatrix {
    fn local_rows(&self) -> usize {
        self.values.len()
    }

    fn num_entries(&self) -> usize {
        self.graph.num_entries()
    }

    fn row(&self, row: usize) -> Option<(&[Global], &[Scalar])> {
        let columns = self.graph.row(row)?;
        let values = self.values.get(row)?;
        Some((columns, values.as_slice()))
    }
}
