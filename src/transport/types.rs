use serde::{Deserialize, Serialize};
use std::fmt;

/// Message tag for point-to-point exchanges.
pub type Tag = i32;

/// Tag used by every frame of the command protocol.
pub const DEFAULT_TAG: Tag = 0;

/// The collective a data frame belongs to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Op {
    Broadcast,
    Scatter,
    ScatterV,
    Gather,
    GatherV,
    PointToPoint,
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Op::Broadcast => "broadcast",
            Op::Scatter => "scatter",
            Op::ScatterV => "scatterv",
            Op::Gather => "gather",
            Op::GatherV => "gatherv",
            Op::PointToPoint => "point-to-point",
        };
        f.write_str(name)
    }
}

/// A typed, homogeneous buffer, one variant per wire datatype.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Buffer {
    Char(Vec<u8>),
    Int(Vec<i32>),
    Long(Vec<i64>),
    Double(Vec<f64>),
}

impl Buffer {
    pub fn len(&self) -> usize {
        match self {
            Buffer::Char(values) => values.len(),
            Buffer::Int(values) => values.len(),
            Buffer::Long(values) => values.len(),
            Buffer::Double(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn datatype(&self) -> &'static str {
        match self {
            Buffer::Char(_) => u8::DATATYPE,
            Buffer::Int(_) => i32::DATATYPE,
            Buffer::Long(_) => i64::DATATYPE,
            Buffer::Double(_) => f64::DATATYPE,
        }
    }
}

/// The wire protocol between the controller and one worker.
///
/// - `Hello`: first frame a worker sends after connecting, identifies its rank.
/// - `Data`: one worker's share of a collective or point-to-point exchange.
/// - `Disconnect`: the sender is tearing down its end of the channel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Frame {
    Hello {
        rank: u32,
        group_size: u32,
    },

    Data {
        op: Op,
        tag: Tag,
        buffer: Buffer,
    },

    Disconnect,
}

/// A scalar type that can travel in a `Buffer`.
pub trait Datum: Copy + fmt::Debug + PartialEq + Send + Sync + 'static {
    const DATATYPE: &'static str;

    fn into_buffer(values: Vec<Self>) -> Buffer;

    /// Unwraps a buffer of this datatype, handing back any other buffer untouched.
    fn from_buffer(buffer: Buffer) -> Result<Vec<Self>, Buffer>;
}

macro_rules! datum {
    ($ty:ty, $variant:ident, $name:literal) => {
        impl Datum for $ty {
            const DATATYPE: &'static str = $name;

            fn into_buffer(values: Vec<Self>) -> Buffer {
                Buffer::$variant(values)
            }

            fn from_buffer(buffer: Buffer) -> Result<Vec<Self>, Buffer> {
                match buffer {
                    Buffer::$variant(values) => Ok(values),
                    other => Err(other),
                }
            }
        }
    };
}

datum!(u8, Char, "char");
datum!(i32, Int, "int");
datum!(i64, Long, "long");
datum!(f64, Double, "double");
