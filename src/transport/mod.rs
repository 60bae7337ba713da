//! Collective Transport Module
//!
//! Carries every exchange between the controller and the worker group over one
//! inter-group channel. Each worker holds a dedicated byte stream to the controller;
//! the collectives are expressed as ordered frames on those streams.
//!
//! ## Core Mechanisms
//! - **Framing**: bincode-encoded `Frame`s with a little-endian `u32` length prefix.
//! - **Lockstep Checking**: every data frame names the collective it belongs to and
//!   carries a typed buffer. A worker that expects a scatter and receives a gather,
//!   or expects `int` and receives `long`, reports a protocol desync instead of
//!   reinterpreting bytes.
//! - **Blocking Rendezvous**: receives block until the peer sends. An optional
//!   timeout turns an unmatched call into an error, which is how tests detect a
//!   group deadlock.
//!
//! ## Submodules
//! - **`types`**: wire frames, typed buffers and the `Datum` mapping for scalars.
//! - **`codec`**: length-prefixed frame reading and writing.
//! - **`endpoint`**: the worker side of the channel (`Collective` trait + `Endpoint`).
//! - **`harness`**: in-process groups over `tokio::io::duplex` for tests and tools.

pub mod codec;
pub mod endpoint;
pub mod harness;
pub mod types;
