//! Typed command client.
//!
//! Each method drives the controller half of one command's exchange, mirroring
//! the worker handlers step for step. Handles gathered back from the group are
//! checked for agreement: workers allocate in lockstep, so a disagreement means
//! the group has already diverged.

use super::partitioner::Partition;
use super::root::Controller;
use crate::dispatch::protocol::{ACCUMULATE_TAG, Command, SHUTDOWN};
use crate::error::{Error, Result};
use crate::types::{Global, Handle, Rank, Scalar, Size};

use tokio::io::{AsyncRead, AsyncWrite};

pub struct MatrixClient<S> {
    controller: Controller<S>,
    commands_sent: u64,
}

impl<S> MatrixClient<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    pub fn new(controller: Controller<S>) -> Self {
        Self {
            controller,
            commands_sent: 0,
        }
    }

    pub fn group_size(&self) -> usize {
        self.controller.group_size()
    }

    pub fn commands_sent(&self) -> u64 {
        self.commands_sent
    }

    /// Raw access to the collectives, for exchanges outside the command set.
    pub fn controller(&mut self) -> &mut Controller<S> {
        &mut self.controller
    }

    pub async fn create_map(&mut self, partition: &Partition) -> Result<Handle> {
        if partition.group_size() != self.group_size() {
            return Err(Error::InvalidArgument(format!(
                "partition spans {} workers, group has {}",
                partition.group_size(),
                self.group_size()
            )));
        }

        self.begin(Command::CreateMap).await?;
        self.controller.broadcast(&[partition.size() as Size]).await?;
        self.controller.scatter(&partition.counts()).await?;
        self.controller.scatterv(partition.parts()).await?;

        self.gather_handle(Command::CreateMap).await
    }

    pub async fn create_vector(&mut self, map: Handle) -> Result<Handle> {
        self.begin(Command::CreateVector).await?;
        self.controller.broadcast(&[map]).await?;

        self.gather_handle(Command::CreateVector).await
    }

    /// Adds `values[i]` at global index `indices[i]` of the vector's entries
    /// owned by worker `target`.
    pub async fn accumulate_vector(
        &mut self,
        target: Rank,
        vector: Handle,
        indices: &[Global],
        values: &[Scalar],
    ) -> Result<()> {
        if indices.len() != values.len() {
            return Err(Error::InvalidArgument(format!(
                "{} indices but {} values",
                indices.len(),
                values.len()
            )));
        }
        if target >= self.group_size() {
            return Err(Error::InvalidArgument(format!(
                "target {} out of range for group of {}",
                target,
                self.group_size()
            )));
        }

        self.begin(Command::AccumulateVector).await?;
        self.controller.broadcast(&[target as Size]).await?;

        self.controller.send(target, &[vector], ACCUMULATE_TAG).await?;
        self.controller
            .send(target, &[indices.len() as Size], ACCUMULATE_TAG)
            .await?;
        self.controller.send(target, indices, ACCUMULATE_TAG).await?;
        self.controller.send(target, values, ACCUMULATE_TAG).await
    }

    /// Returns each worker's owned values, in rank order.
    pub async fn read_vector(&mut self, vector: Handle) -> Result<Vec<Vec<Scalar>>> {
        self.begin(Command::ReadVector).await?;
        self.controller.broadcast(&[vector]).await?;

        self.controller.gatherv().await
    }

    /// `rows[rank][i]` lists the columns of the `i`-th row owned by worker `rank`.
    pub async fn create_graph(&mut self, map: Handle, rows: &[Vec<Vec<Global>>]) -> Result<Handle> {
        if rows.len() != self.group_size() {
            return Err(Error::InvalidArgument(format!(
                "rows given for {} workers, group has {}",
                rows.len(),
                self.group_size()
            )));
        }

        let numcols: Vec<Vec<Size>> = rows
            .iter()
            .map(|local| local.iter().map(|row| row.len() as Size).collect())
            .collect();
        let columns: Vec<Vec<Global>> = rows.iter().map(|local| local.concat()).collect();

        self.begin(Command::CreateGraph).await?;
        self.controller.broadcast(&[map]).await?;
        self.controller.scatterv(&numcols).await?;
        self.controller.scatterv(&columns).await?;

        self.gather_handle(Command::CreateGraph).await
    }

    pub async fn create_matrix(&mut self, graph: Handle) -> Result<Handle> {
        self.begin(Command::CreateMatrix).await?;
        self.controller.broadcast(&[graph]).await?;

        self.gather_handle(Command::CreateMatrix).await
    }

    /// Ends the session and waits for every worker to disconnect.
    pub async fn shutdown(mut self) -> Result<()> {
        self.controller.broadcast(&[SHUTDOWN]).await?;

        tracing::info!("Shutdown sent after {} commands", self.commands_sent);

        self.controller.disconnect().await
    }

    async fn begin(&mut self, command: Command) -> Result<()> {
        tracing::debug!("Sending {}", command);

        self.commands_sent += 1;
        self.controller.broadcast(&[command.code()]).await
    }

    async fn gather_handle(&mut self, command: Command) -> Result<Handle> {
        let handles: Vec<Handle> = self.controller.gather().await?;

        match handles.split_first() {
            Some((&first, rest)) if rest.iter().all(|&h| h == first) => Ok(first),
            Some(_) => Err(Error::ProtocolDesync(format!(
                "{} returned diverging handles {:?}",
                command, handles
            ))),
            None => Err(Error::ProtocolDesync(format!(
                "{} gathered no handles",
                command
            ))),
        }
    }
}
