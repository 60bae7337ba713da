//! Distributed Linear-Algebra Worker Library
//!
//! The worker side of a controller/worker protocol for building distributed
//! sparse linear-algebra objects. A controller process drives a group of workers
//! through a small set of commands; each worker answers with collective exchanges
//! and keeps the objects it creates in a local registry, addressed by handles that
//! are identical across the group.
//!
//! ## Architecture Modules
//! - **`transport`**: the inter-group channel. Framed collectives (broadcast, scatter,
//!   gather and their variable-size forms) plus tagged point-to-point messages.
//! - **`registry`**: per-kind handle tables. Handles are dense, start at zero and are
//!   never reused.
//! - **`linalg`**: capability traits for index maps, connectivity graphs, vectors and
//!   matrices, with an in-memory backend.
//! - **`dispatch`**: the command table, one handler per command and the worker event loop.
//! - **`controller`**: the root side of every exchange and a typed client for driving
//!   a group.
//! - **`config`**: worker settings from flags and the environment.

pub mod config;
pub mod controller;
pub mod dispatch;
pub mod error;
pub mod linalg;
pub mod registry;
pub mod transport;
pub mod types;
