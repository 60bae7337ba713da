//! In-process worker groups.
//!
//! Wires a `Controller` to `n` worker `Endpoint`s through `tokio::io::duplex` pipes,
//! so the full protocol can run inside one process without sockets.

use super::endpoint::Endpoint;
use crate::controller::root::Controller;
use crate::error::Result;

use std::time::Duration;
use tokio::io::DuplexStream;

/// Per-direction buffer of each in-process pipe.
pub const PIPE_CAPACITY: usize = 64 * 1024;

/// Builds a controller and `group_size` connected worker endpoints.
///
/// `timeout` applies to receives on both sides, which turns an unmatched
/// collective into `Error::Timeout` instead of a hang.
pub async fn local_group(
    group_size: usize,
    timeout: Option<Duration>,
) -> Result<(Controller<DuplexStream>, Vec<Endpoint<DuplexStream>>)> {
    let mut roots = Vec::with_capacity(group_size);
    let mut endpoints = Vec::with_capacity(group_size);

    for rank in 0..group_size {
        let (root_side, worker_side) = tokio::io::duplex(PIPE_CAPACITY);
        endpoints.push(Endpoint::connect(worker_side, rank, group_size, timeout).await?);
        roots.push(root_side);
    }

    let mut controller = Controller::from_streams(roots).await?;
    if let Some(after) = timeout {
        controller = controller.with_timeout(after);
    }

    Ok((controller, endpoints))
}
