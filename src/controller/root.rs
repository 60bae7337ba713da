//! Root side of every collective.
//!
//! The controller is the root of all exchanges in the protocol. It holds one
//! stream per worker, ordered by rank, and fans frames out or in across them.

use crate::error::{Error, Result};
use crate::transport::codec::{read_frame, write_frame};
use crate::transport::types::{DEFAULT_TAG, Datum, Frame, Op, Tag};
use crate::types::Rank;

use std::io;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

pub struct Controller<S> {
    workers: Vec<S>,
    timeout: Option<Duration>,
}

impl Controller<TcpStream> {
    /// Accepts `group_size` worker connections and orders them by rank.
    pub async fn accept(listener: &TcpListener, group_size: usize) -> Result<Self> {
        let mut streams = Vec::with_capacity(group_size);

        while streams.len() < group_size {
            let (stream, addr) = listener.accept().await?;
            stream.set_nodelay(true)?;
            tracing::info!(
                "Worker connected from {} ({}/{})",
                addr,
                streams.len() + 1,
                group_size
            );
            streams.push(stream);
        }

        Self::from_streams(streams).await
    }
}

impl<S> Controller<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Reads the `Hello` frame from every stream and orders the streams by rank.
    ///
    /// Fails unless the announced ranks are exactly `0..streams.len()` and every
    /// worker agrees on the group size.
    pub async fn from_streams(streams: Vec<S>) -> Result<Self> {
        let group_size = streams.len();
        let mut slots: Vec<Option<S>> = (0..group_size).map(|_| None).collect();

        for mut stream in streams {
            let (rank, announced) = match read_frame(&mut stream).await? {
                Frame::Hello { rank, group_size } => (rank as usize, group_size as usize),
                other => {
                    return Err(Error::ProtocolDesync(format!(
                        "expected hello, worker sent {:?}",
                        other
                    )));
                }
            };

            if announced != group_size {
                return Err(Error::ProtocolDesync(format!(
                    "worker {} expects a group of {}, {} connected",
                    rank, announced, group_size
                )));
            }

            let slot = slots.get_mut(rank).ok_or_else(|| {
                Error::ProtocolDesync(format!(
                    "rank {} out of range for group of {}",
                    rank, group_size
                ))
            })?;
            if slot.is_some() {
                return Err(Error::ProtocolDesync(format!(
                    "rank {} announced twice",
                    rank
                )));
            }
            *slot = Some(stream);
        }

        // every slot is filled: n distinct in-range ranks from n streams
        let workers = slots.into_iter().flatten().collect();

        Ok(Self {
            workers,
            timeout: None,
        })
    }

    /// Bounds every receive from a worker.
    pub fn with_timeout(mut self, after: Duration) -> Self {
        self.timeout = Some(after);
        self
    }

    pub fn group_size(&self) -> usize {
        self.workers.len()
    }

    /// Sends the same `values` to every worker.
    pub async fn broadcast<T: Datum>(&mut self, values: &[T]) -> Result<()> {
        for rank in 0..self.workers.len() {
            self.push(rank, Op::Broadcast, DEFAULT_TAG, values.to_vec()).await?;
        }
        Ok(())
    }

    /// Sends `per_worker[rank]` to each worker.
    pub async fn scatter<T: Datum>(&mut self, per_worker: &[T]) -> Result<()> {
        self.check_group(per_worker.len(), Op::Scatter)?;

        for (rank, &value) in per_worker.iter().enumerate() {
            self.push(rank, Op::Scatter, DEFAULT_TAG, vec![value]).await?;
        }
        Ok(())
    }

    /// Sends `parts[rank]` (any length) to each worker.
    pub async fn scatterv<T: Datum>(&mut self, parts: &[Vec<T>]) -> Result<()> {
        self.check_group(parts.len(), Op::ScatterV)?;

        for (rank, part) in parts.iter().enumerate() {
            self.push(rank, Op::ScatterV, DEFAULT_TAG, part.clone()).await?;
        }
        Ok(())
    }

    /// Collects exactly one item from every worker, in rank order.
    pub async fn gather<T: Datum>(&mut self) -> Result<Vec<T>> {
        let mut gathered = Vec::with_capacity(self.workers.len());

        for rank in 0..self.workers.len() {
            let values = self.pull::<T>(rank, Op::Gather, DEFAULT_TAG).await?;
            match values.as_slice() {
                [value] => gathered.push(*value),
                _ => {
                    return Err(Error::ProtocolDesync(format!(
                        "gather expected 1 item from worker {}, got {}",
                        rank,
                        values.len()
                    )));
                }
            }
        }

        Ok(gathered)
    }

    /// Collects a variable-length contribution from every worker, in rank order.
    pub async fn gatherv<T: Datum>(&mut self) -> Result<Vec<Vec<T>>> {
        let mut gathered = Vec::with_capacity(self.workers.len());

        for rank in 0..self.workers.len() {
            gathered.push(self.pull::<T>(rank, Op::GatherV, DEFAULT_TAG).await?);
        }

        Ok(gathered)
    }

    /// Sends `values` point-to-point to worker `rank`.
    pub async fn send<T: Datum>(&mut self, rank: Rank, values: &[T], tag: Tag) -> Result<()> {
        self.push(rank, Op::PointToPoint, tag, values.to_vec()).await
    }

    /// Receives a point-to-point message from worker `rank`.
    pub async fn recv<T: Datum>(&mut self, rank: Rank, tag: Tag) -> Result<Vec<T>> {
        self.pull(rank, Op::PointToPoint, tag).await
    }

    /// Waits for every worker to disconnect, then closes the channel.
    pub async fn disconnect(mut self) -> Result<()> {
        for rank in 0..self.workers.len() {
            match self.next_frame(rank, Op::Broadcast).await? {
                Frame::Disconnect => {
                    self.workers[rank].shutdown().await?;
                    tracing::debug!("Worker {} disconnected", rank);
                }
                other => {
                    return Err(Error::ProtocolDesync(format!(
                        "worker {} sent {:?} instead of disconnecting",
                        rank, other
                    )));
                }
            }
        }

        tracing::info!("Channel to {} workers closed", self.workers.len());

        Ok(())
    }

    fn check_group(&self, len: usize, op: Op) -> Result<()> {
        if len != self.workers.len() {
            return Err(Error::InvalidArgument(format!(
                "{} needs {} parts, got {}",
                op,
                self.workers.len(),
                len
            )));
        }
        Ok(())
    }

    fn stream(&mut self, rank: Rank) -> Result<&mut S> {
        let group_size = self.workers.len();
        self.workers.get_mut(rank).ok_or_else(|| {
            Error::InvalidArgument(format!(
                "rank {} out of range for group of {}",
                rank, group_size
            ))
        })
    }

    async fn push<T: Datum>(&mut self, rank: Rank, op: Op, tag: Tag, values: Vec<T>) -> Result<()> {
        let frame = Frame::Data {
            op,
            tag,
            buffer: T::into_buffer(values),
        };
        write_frame(self.stream(rank)?, &frame).await
    }

    async fn next_frame(&mut self, rank: Rank, op: Op) -> Result<Frame> {
        let timeout = self.timeout;
        let stream = self.stream(rank)?;

        match timeout {
            Some(after) => tokio::time::timeout(after, read_frame(stream))
                .await
                .map_err(|_| Error::Timeout { op, after })?,
            None => read_frame(stream).await,
        }
    }

    async fn pull<T: Datum>(&mut self, rank: Rank, op: Op, tag: Tag) -> Result<Vec<T>> {
        match self.next_frame(rank, op).await? {
            Frame::Data {
                op: got,
                tag: got_tag,
                buffer,
            } if got == op && got_tag == tag => T::from_buffer(buffer).map_err(|other| {
                Error::ProtocolDesync(format!(
                    "{} expected {} from worker {}, got {}",
                    op,
                    T::DATATYPE,
                    rank,
                    other.datatype()
                ))
            }),
            Frame::Disconnect => Err(Error::Transport(io::Error::new(
                io::ErrorKind::ConnectionAborted,
                format!("worker {} disconnected during {}", rank, op),
            ))),
            other => Err(Error::ProtocolDesync(format!(
                "{} expected from worker {}, got {:?}",
                op, rank, other
            ))),
        }
    }
}
