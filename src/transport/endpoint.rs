//! Worker side of the inter-group channel.
//!
//! Workers never act as root: every collective here either receives the worker's
//! share from the controller or hands the worker's contribution to it.

use super::codec::{read_frame, write_frame};
use super::types::{DEFAULT_TAG, Datum, Frame, Op, Tag};
use crate::error::{Error, Result};
use crate::types::Rank;

use async_trait::async_trait;
use std::io;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};

/// Group collectives as seen from one (non-root) worker.
///
/// Every member of the group must issue the matching call in the same order for
/// a round to complete. Receive counts are exact: a peer that sends a different
/// number of items is out of lockstep.
#[async_trait]
pub trait Collective: Send {
    /// This worker's rank inside the group.
    fn rank(&self) -> Rank;

    /// Number of workers in the group.
    fn group_size(&self) -> usize;

    /// Receives `count` items broadcast by the controller.
    async fn broadcast<T: Datum>(&mut self, count: usize) -> Result<Vec<T>>;

    /// Receives this worker's `count` items of a fixed-size scatter.
    async fn scatter<T: Datum>(&mut self, count: usize) -> Result<Vec<T>>;

    /// Receives this worker's `count` items of a variable-size scatter.
    async fn scatterv<T: Datum>(&mut self, count: usize) -> Result<Vec<T>>;

    /// Contributes `values` to a fixed-size gather at the controller.
    async fn gather<T: Datum>(&mut self, values: Vec<T>) -> Result<()>;

    /// Contributes `values` to a variable-size gather at the controller.
    async fn gatherv<T: Datum>(&mut self, values: Vec<T>) -> Result<()>;

    /// Receives `count` items sent point-to-point by the controller.
    async fn recv<T: Datum>(&mut self, count: usize, tag: Tag) -> Result<Vec<T>>;

    /// Sends `values` point-to-point to the controller.
    async fn send<T: Datum>(&mut self, values: Vec<T>, tag: Tag) -> Result<()>;

    /// Tears down this worker's end of the channel.
    async fn disconnect(&mut self) -> Result<()>;

    async fn broadcast_one<T: Datum>(&mut self) -> Result<T> {
        single(self.broadcast::<T>(1).await?, Op::Broadcast)
    }

    async fn scatter_one<T: Datum>(&mut self) -> Result<T> {
        single(self.scatter::<T>(1).await?, Op::Scatter)
    }

    async fn recv_one<T: Datum>(&mut self, tag: Tag) -> Result<T> {
        single(self.recv::<T>(1, tag).await?, Op::PointToPoint)
    }

    async fn gather_one<T: Datum>(&mut self, value: T) -> Result<()> {
        self.gather(vec![value]).await
    }
}

fn single<T: Datum>(values: Vec<T>, op: Op) -> Result<T> {
    values
        .into_iter()
        .next()
        .ok_or_else(|| Error::ProtocolDesync(format!("empty {} buffer", op)))
}

/// A worker's connection to the controller over any byte stream.
pub struct Endpoint<S> {
    stream: S,
    rank: Rank,
    group_size: usize,
    timeout: Option<Duration>,
}

impl<S> Endpoint<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Announces this worker to the controller and returns the endpoint.
    ///
    /// `timeout` bounds every receive. `None` blocks indefinitely, matching the
    /// production protocol.
    pub async fn connect(
        mut stream: S,
        rank: Rank,
        group_size: usize,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        if rank >= group_size {
            return Err(Error::Config(format!(
                "rank {} out of range for group of {}",
                rank, group_size
            )));
        }

        let hello = Frame::Hello {
            rank: rank as u32,
            group_size: group_size as u32,
        };
        write_frame(&mut stream, &hello).await?;

        tracing::debug!("[{}/{}] connected to controller", rank, group_size);

        Ok(Self {
            stream,
            rank,
            group_size,
            timeout,
        })
    }

    async fn next_frame(&mut self, op: Op) -> Result<Frame> {
        match self.timeout {
            Some(after) => tokio::time::timeout(after, read_frame(&mut self.stream))
                .await
                .map_err(|_| Error::Timeout { op, after })?,
            None => read_frame(&mut self.stream).await,
        }
    }

    async fn expect<T: Datum>(&mut self, op: Op, tag: Tag, count: usize) -> Result<Vec<T>> {
        match self.next_frame(op).await? {
            Frame::Data {
                op: got,
                tag: got_tag,
                buffer,
            } => {
                if got != op || got_tag != tag {
                    return Err(Error::ProtocolDesync(format!(
                        "expected {} (tag {}), controller sent {} (tag {})",
                        op, tag, got, got_tag
                    )));
                }

                let values = T::from_buffer(buffer).map_err(|other| {
                    Error::ProtocolDesync(format!(
                        "{} expected {} items, controller sent {}",
                        op,
                        T::DATATYPE,
                        other.datatype()
                    ))
                })?;

                if values.len() != count {
                    return Err(Error::ProtocolDesync(format!(
                        "{} expected {} items, controller sent {}",
                        op,
                        count,
                        values.len()
                    )));
                }

                Ok(values)
            }
            Frame::Disconnect => Err(Error::Transport(io::Error::new(
                io::ErrorKind::ConnectionAborted,
                format!("controller disconnected during {}", op),
            ))),
            Frame::Hello { .. } => Err(Error::ProtocolDesync(format!(
                "unexpected hello while waiting for {}",
                op
            ))),
        }
    }

    async fn push<T: Datum>(&mut self, op: Op, tag: Tag, values: Vec<T>) -> Result<()> {
        let frame = Frame::Data {
            op,
            tag,
            buffer: T::into_buffer(values),
        };
        write_frame(&mut self.stream, &frame).await
    }
}

#[async_trait]
impl<S> Collective for Endpoint<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    fn rank(&self) -> Rank {
        self.rank
    }

    fn group_size(&self) -> usize {
        self.group_size
    }

    async fn broadcast<T: Datum>(&mut self, count: usize) -> Result<Vec<T>> {
        self.expect(Op::Broadcast, DEFAULT_TAG, count).await
    }

    async fn scatter<T: Datum>(&mut self, count: usize) -> Result<Vec<T>> {
        self.expect(Op::Scatter, DEFAULT_TAG, count).await
    }

    async fn scatterv<T: Datum>(&mut self, count: usize) -> Result<Vec<T>> {
        self.expect(Op::ScatterV, DEFAULT_TAG, count).await
    }

    async fn gather<T: Datum>(&mut self, values: Vec<T>) -> Result<()> {
        self.push(Op::Gather, DEFAULT_TAG, values).await
    }

    async fn gatherv<T: Datum>(&mut self, values: Vec<T>) -> Result<()> {
        self.push(Op::GatherV, DEFAULT_TAG, values).await
    }

    async fn recv<T: Datum>(&mut self, count: usize, tag: Tag) -> Result<Vec<T>> {
        self.expect(Op::PointToPoint, tag, count).await
    }

    async fn send<T: Datum>(&mut self, values: Vec<T>, tag: Tag) -> Result<()> {
        self.push(Op::PointToPoint, tag, values).await
    }

    async fn disconnect(&mut self) -> Result<()> {
        write_frame(&mut self.stream, &Frame::Disconnect).await?;
        self.stream.shutdown().await?;

        tracing::debug!("[{}/{}] disconnected", self.rank, self.group_size);

        Ok(())
    }
}
