use serde::{Deserialize, Serialize};
use std::fmt;

/// The four kinds of distributed object a worker can hold.
///
/// Each kind has its own table and therefore its own handle space.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Map,
    Vector,
    Graph,
    Matrix,
}

impl ObjectKind {
    pub const ALL: [ObjectKind; 4] = [
        ObjectKind::Map,
        ObjectKind::Vector,
        ObjectKind::Graph,
        ObjectKind::Matrix,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            ObjectKind::Map => "map",
            ObjectKind::Vector => "vector",
            ObjectKind::Graph => "graph",
            ObjectKind::Matrix => "matrix",
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
