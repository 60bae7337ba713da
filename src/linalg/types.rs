use crate::types::{Global, Scalar};

use std::sync::Arc;
use thiserror::Error;

/// Errors raised by a numerical backend.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BackendError {
    #[error("element {element} outside index space of size {size}")]
    ElementOutOfRange { element: Global, size: Global },

    #[error("element {0} listed twice in one partition")]
    DuplicateElement(Global),

    #[error("global index {0} is not owned by this worker")]
    NotOwned(Global),

    #[error("graph needs {expected} row capacities, got {actual}")]
    RowCountMismatch { expected: usize, actual: usize },

    #[error("local row {row} out of range ({rows} rows)")]
    RowOutOfRange { row: usize, rows: usize },

    #[error("column {column} outside index space of size {size}")]
    ColumnOutOfRange { column: Global, size: Global },

    #[error("row {row} holds at most {capacity} columns")]
    RowCapacityExceeded { row: usize, capacity: usize },

    #[error("graph is already sealed")]
    GraphSealed,

    #[error("graph is not sealed")]
    GraphNotSealed,
}

/// Partition of a set of global identifiers; the local view of one worker.
pub trait IndexSpace: Send + Sync {
    /// Number of global identifiers across the whole group.
    fn global_size(&self) -> Global;

    /// Number of identifiers owned by this worker.
    fn local_len(&self) -> usize;

    /// Owned identifiers in local order.
    fn global_elements(&self) -> &[Global];

    /// Local position of `global`, if this worker owns it.
    fn local_index(&self, global: Global) -> Option<usize>;
}

/// Sparse connectivity pattern over the locally owned rows of an index space.
pub trait ConnectivityGraph: Send + Sync {
    fn local_rows(&self) -> usize;

    /// Appends `columns` to local row `row`. Rejected once the graph is sealed.
    fn insert_global_indices(
        &mut self,
        row: usize,
        columns: &[Global],
    ) -> Result<(), BackendError>;

    /// Seals the graph. After this the pattern is immutable.
    fn fill_complete(&mut self) -> Result<(), BackendError>;

    fn is_sealed(&self) -> bool;

    /// Column indices of local row `row`.
    fn row(&self, row: usize) -> Option<&[Global]>;

    /// Total number of stored column indices.
    fn num_entries(&self) -> usize;
}

/// Distributed array of scalars laid out like its index space.
pub trait DistributedVector: Send {
    /// Adds `value` to the entry at global index `global`.
    fn sum_into_global_value(
        &mut self,
        global: Global,
        value: Scalar,
    ) -> Result<(), BackendError>;

    /// Values owned by this worker, in local order.
    fn local_values(&self) -> &[Scalar];
}

/// Sparse matrix whose pattern is a sealed graph.
pub trait DistributedMatrix: Send {
    fn local_rows(&self) -> usize;

    fn num_entries(&self) -> usize;

    /// Column indices and values of local row `row`.
    fn row(&self, row: usize) -> Option<(&[Global], &[Scalar])>;
}

/// Factory for the distributed objects a worker can hold.
pub trait Backend: Send + Sync {
    type Map: IndexSpace + 'static;
    type Graph: ConnectivityGraph + 'static;
    type Vector: DistributedVector + 'static;
    type Matrix: DistributedMatrix + 'static;

    fn create_map(&self, size: Global, elements: Vec<Global>) -> Result<Self::Map, BackendError>;

    fn create_vector(&self, map: Arc<Self::Map>) -> Result<Self::Vector, BackendError>;

    /// Creates an unsealed graph with room for `row_capacity[i]` columns in row `i`.
    fn create_graph(
        &self,
        map: Arc<Self::Map>,
        row_capacity: &[usize],
    ) -> Result<Self::Graph, BackendError>;

    fn create_matrix(&self, graph: Arc<Self::Graph>) -> Result<Self::Matrix, BackendError>;
}
