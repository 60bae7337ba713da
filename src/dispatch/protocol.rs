//! Command Protocol Definitions
//!
//! The command table and the exact exchange each command performs. The position
//! of a command in `Command::ALL` is its wire code; any code past the end of the
//! table ends the session.
//!
//! ```text
//! CreateMatrix      -> bcast (HANDLE) graph         <- gather (HANDLE) matrix
//! CreateVector      -> bcast (HANDLE) map           <- gather (HANDLE) vector
//! AccumulateVector  -> bcast (SIZE) target rank
//!                      target only:
//!                      -> recv (HANDLE) vector
//!                      -> recv (SIZE) item count
//!                      -> recv (GLOBAL) indices
//!                      -> recv (SCALAR) values
//! ReadVector        -> bcast (HANDLE) vector        <- gatherv (SCALAR) owned values
//! CreateMap         -> bcast (SIZE) global size
//!                   -> scatter (SIZE) owned count
//!                   -> scatterv (GLOBAL) owned ids  <- gather (HANDLE) map
//! CreateGraph       -> bcast (HANDLE) map
//!                   -> scatterv (SIZE) columns per owned row
//!                   -> scatterv (GLOBAL) columns    <- gather (HANDLE) graph
//! ```

use crate::transport::types::{DEFAULT_TAG, Tag};
use crate::types::{Code, Global, Handle, Local, Scalar, Size, bits};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Code the controller broadcasts to end the session.
pub const SHUTDOWN: Code = Code::MAX;

/// Tag of every point-to-point message in `AccumulateVector`.
pub const ACCUMULATE_TAG: Tag = DEFAULT_TAG;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Command {
    CreateMatrix = 0,
    CreateVector = 1,
    AccumulateVector = 2,
    ReadVector = 3,
    CreateMap = 4,
    CreateGraph = 5,
}

impl Command {
    /// The command table, in wire-code order.
    pub const ALL: [Command; 6] = [
        Command::CreateMatrix,
        Command::CreateVector,
        Command::AccumulateVector,
        Command::ReadVector,
        Command::CreateMap,
        Command::CreateGraph,
    ];

    pub const fn code(self) -> Code {
        self as Code
    }

    /// Looks up a wire code. `None` means end of session.
    pub fn from_code(code: Code) -> Option<Self> {
        Self::ALL.get(code as usize).copied()
    }

    pub const fn name(self) -> &'static str {
        match self {
            Command::CreateMatrix => "create_matrix",
            Command::CreateVector => "create_vector",
            Command::AccumulateVector => "accumulate_vector",
            Command::ReadVector => "read_vector",
            Command::CreateMap => "create_map",
            Command::CreateGraph => "create_graph",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The lines printed by `info`: the command enumeration and the wire widths.
pub fn info_lines() -> Vec<String> {
    let names: Vec<&str> = Command::ALL.iter().map(|command| command.name()).collect();

    vec![
        format!("token: enum({})", names.join(", ")),
        format!("local: int{}", bits::<Local>()),
        format!("global: int{}", bits::<Global>()),
        format!("size: int{}", bits::<Size>()),
        format!("handle: int{}", bits::<Handle>()),
        format!("scalar: float{}", bits::<Scalar>()),
    ]
}
