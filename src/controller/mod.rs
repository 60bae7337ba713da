//! Controller Module
//!
//! The root side of the protocol: accepts the worker group, drives each command's
//! exchange and collects results.
//!
//! ## Submodules
//! - **`root`**: the raw collectives over one stream per worker.
//! - **`client`**: one typed method per command, plus shutdown.
//! - **`partitioner`**: assignment of global indices to workers and reassembly of
//!   gathered values.

pub mod client;
pub mod partitioner;
pub mod root;
