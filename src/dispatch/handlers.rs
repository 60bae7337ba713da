//! One handler per command.
//!
//! Each handler is a fixed sequence of transport calls: pull the arguments,
//! apply the effect to the registry through the backend, then report the result.
//! The effect is always applied before the result is gathered, so the controller
//! never observes a handle whose object does not exist yet.

use super::protocol::ACCUMULATE_TAG;
use crate::error::{Error, Result};
use crate::linalg::types::{Backend, ConnectivityGraph, DistributedVector, IndexSpace};
use crate::registry::store::ObjectRegistry;
use crate::transport::endpoint::Collective;
use crate::types::{Global, Handle, Scalar, Size};

use std::sync::Arc;

/// Converts a count received on the wire into a buffer length.
fn to_count(value: Size, what: &str) -> Result<usize> {
    usize::try_from(value)
        .map_err(|_| Error::ProtocolDesync(format!("negative {}: {}", what, value)))
}

pub async fn create_matrix<C, B>(
    transport: &mut C,
    backend: &B,
    registry: &mut ObjectRegistry<B>,
) -> Result<()>
where
    C: Collective,
    B: Backend,
{
    let imat = registry.matrices.next_handle();

    let igraph: Handle = transport.broadcast_one().await?;
    let graph = registry.graphs.resolve(igraph)?.clone();

    tracing::debug!("creating matrix #{} from graph #{}", imat, igraph);

    let matrix = backend.create_matrix(graph)?;
    let imat = registry.matrices.allocate(matrix)?;

    transport.gather_one(imat).await
}

pub async fn create_vector<C, B>(
    transport: &mut C,
    backend: &B,
    registry: &mut ObjectRegistry<B>,
) -> Result<()>
where
    C: Collective,
    B: Backend,
{
    let ivec = registry.vectors.next_handle();

    let imap: Handle = transport.broadcast_one().await?;
    let map = registry.maps.resolve(imap)?.clone();

    tracing::debug!("creating vector #{} from map #{}", ivec, imap);

    let vector = backend.create_vector(map)?;
    let ivec = registry.vectors.allocate(vector)?;

    transport.gather_one(ivec).await
}

/// Only the worker named by the broadcast rank takes part past the first step.
pub async fn accumulate_vector<C, B>(
    transport: &mut C,
    registry: &mut ObjectRegistry<B>,
) -> Result<()>
where
    C: Collective,
    B: Backend,
{
    let target: Size = transport.broadcast_one().await?;

    if usize::try_from(target).ok() != Some(transport.rank()) {
        tracing::trace!("accumulate targets rank {}, skipping", target);
        return Ok(());
    }

    let ivec: Handle = transport.recv_one(ACCUMULATE_TAG).await?;
    let nitems: Size = transport.recv_one(ACCUMULATE_TAG).await?;
    let nitems = to_count(nitems, "item count")?;

    tracing::debug!("ivec = {}, nitems = {}", ivec, nitems);

    let indices: Vec<Global> = transport.recv(nitems, ACCUMULATE_TAG).await?;
    let values: Vec<Scalar> = transport.recv(nitems, ACCUMULATE_TAG).await?;

    let vector = registry.vectors.resolve_mut(ivec)?;
    for (&index, &value) in indices.iter().zip(&values) {
        tracing::trace!("{} : {}", index, value);
        vector.sum_into_global_value(index, value)?;
    }

    Ok(())
}

pub async fn read_vector<C, B>(transport: &mut C, registry: &ObjectRegistry<B>) -> Result<()>
where
    C: Collective,
    B: Backend,
{
    let ivec: Handle = transport.broadcast_one().await?;
    let data = registry.vectors.resolve(ivec)?.local_values().to_vec();

    tracing::debug!("reading vector #{} ({} local values)", ivec, data.len());

    transport.gatherv(data).await
}

pub async fn create_map<C, B>(
    transport: &mut C,
    backend: &B,
    registry: &mut ObjectRegistry<B>,
) -> Result<()>
where
    C: Collective,
    B: Backend,
{
    let imap = registry.maps.next_handle();

    let size: Size = transport.broadcast_one().await?;
    let size = to_count(size, "global size")?;
    let ndofs: Size = transport.scatter_one().await?;
    let ndofs = to_count(ndofs, "element count")?;

    tracing::debug!("creating map #{} with {}/{} items", imap, ndofs, size);

    let elements: Vec<Global> = transport.scatterv(ndofs).await?;

    let map = backend.create_map(size as Global, elements)?;
    let imap = registry.maps.allocate(Arc::new(map))?;

    transport.gather_one(imap).await
}

/// Rows are the map's locally owned elements; the column buffer is the
/// concatenation of every row's columns in row order.
pub async fn create_graph<C, B>(
    transport: &mut C,
    backend: &B,
    registry: &mut ObjectRegistry<B>,
) -> Result<()>
where
    C: Collective,
    B: Backend,
{
    let igraph = registry.graphs.next_handle();

    let imap: Handle = transport.broadcast_one().await?;
    let map = registry.maps.resolve(imap)?.clone();

    let nrows = map.local_len();
    tracing::debug!(
        "creating graph #{} from map #{} with {} rows",
        igraph,
        imap,
        nrows
    );

    let numcols: Vec<Size> = transport.scatterv(nrows).await?;
    let numcols = numcols
        .into_iter()
        .map(|n| to_count(n, "column count"))
        .collect::<Result<Vec<usize>>>()?;

    let nitems: usize = numcols.iter().sum();
    let columns: Vec<Global> = transport.scatterv(nitems).await?;

    let mut graph = backend.create_graph(map, &numcols)?;
    let mut offset = 0;
    for (row, &size) in numcols.iter().enumerate() {
        graph.insert_global_indices(row, &columns[offset..offset + size])?;
        offset += size;
    }
    graph.fill_complete()?;

    let igraph = registry.graphs.allocate(Arc::new(graph))?;

    transport.gather_one(igraph).await
}
