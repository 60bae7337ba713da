//! Object Registry Module
//!
//! Holds every distributed object a worker has created during the session.
//! The controller never sees these objects; it refers to them by handle.
//!
//! ## Core Concepts
//! - **Handles**: A handle is the length of its table at creation time. Handles are
//!   0-based, strictly increasing, never reused and never reclaimed.
//! - **Independent Tables**: Maps, vectors, graphs and matrices each have their own
//!   handle space, so vector `3` and graph `3` are unrelated.
//! - **Ownership**: The registry owns its objects for the lifetime of the session.
//!   Handlers borrow from it; maps and graphs are shared via `Arc` with the objects
//!   built on top of them.

pub mod store;
pub mod table;
pub mod types;
