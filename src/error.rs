//! Error types for the worker and its controller-side counterpart.

use std::time::Duration;

use thiserror::Error;

use crate::linalg::types::BackendError;
use crate::registry::types::ObjectKind;
use crate::transport::types::Op;
use crate::types::Handle;

/// Errors that end a worker's participation in a session.
///
/// None of these are reported back to the controller; the protocol has no
/// error channel, so a failing worker simply stops answering and closes its
/// side of the channel.
#[derive(Debug, Error)]
pub enum Error {
    /// A command referenced a handle outside its table.
    #[error("invalid {kind} handle {handle} (table holds {len})")]
    InvalidHandle {
        kind: ObjectKind,
        handle: Handle,
        len: usize,
    },

    /// A table already holds as many objects as the handle type can address.
    #[error("{0} handle space exhausted")]
    HandleSpaceExhausted(ObjectKind),

    /// The peer sent a frame whose collective, datatype or length differs
    /// from what this side of the round expects.
    #[error("protocol desync: {0}")]
    ProtocolDesync(String),

    /// A receive did not complete within the configured timeout.
    ///
    /// Only raised when a timeout is configured; production sessions block.
    #[error("{op} did not complete within {after:?}")]
    Timeout { op: Op, after: Duration },

    /// The channel failed (disconnect, truncated frame, oversized frame).
    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),

    /// A frame could not be encoded or decoded.
    #[error("codec error: {0}")]
    Codec(#[from] bincode::Error),

    /// The numerical backend rejected an operation.
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),

    /// A partition handed to the controller is not a valid index space.
    #[error("invalid partition: {0}")]
    InvalidPartition(String),

    /// A controller-side call was given inconsistent arguments.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Worker configuration could not be resolved.
    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Result type alias for worker and controller operations.
pub type Result<T> = std::result::Result<T, Error>;
