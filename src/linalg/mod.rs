//! Numerical Backend Module
//!
//! The worker never implements distributed linear algebra itself. It talks to a
//! backend through four capability traits and a factory:
//!
//! - **`IndexSpace`**: how global element identifiers are partitioned; this worker
//!   sees only the elements it owns.
//! - **`ConnectivityGraph`**: per-row column pattern, insert-only until sealed.
//! - **`DistributedVector`**: locally owned values, mutated by sum-into.
//! - **`DistributedMatrix`**: values laid out over a sealed graph.
//!
//! `local` provides an in-memory backend so the binary runs without an external
//! library. Any other backend plugs in by implementing `Backend`.

pub mod local;
pub mod types;
