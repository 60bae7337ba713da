//! Length-prefixed bincode framing.

use super::types::Frame;
use crate::error::Result;

use std::io;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Largest frame accepted in either direction.
pub const MAX_FRAME_LEN: usize = 64 * 1024 * 1024;

pub async fn write_frame<W>(writer: &mut W, frame: &Frame) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let encoded = bincode::serialize(frame)?;
    if encoded.len() > MAX_FRAME_LEN {
        return Err(oversized(encoded.len()).into());
    }

    writer.write_u32_le(encoded.len() as u32).await?;
    writer.write_all(&encoded).await?;
    writer.flush().await?;

    Ok(())
}

pub async fn read_frame<R>(reader: &mut R) -> Result<Frame>
where
    R: AsyncRead + Unpin,
{
    let len = reader.read_u32_le().await? as usize;
    if len > MAX_FRAME_LEN {
        return Err(oversized(len).into());
    }

    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf).await?;

    Ok(bincode::deserialize::<Frame>(&buf)?)
}

fn oversized(len: usize) -> io::Error {
    io::Error::new(
        io::ErrorKind::InvalidData,
        format!("frame of {} bytes exceeds limit of {}", len, MAX_FRAME_LEN),
    )
}
