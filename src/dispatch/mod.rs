//! Command Dispatch Module
//!
//! The worker's side of the command protocol.
//!
//! ## Architecture Overview
//! 1. **Command Code**: each round starts with the controller broadcasting a one-byte
//!    code to the whole group.
//! 2. **Lookup**: the code indexes the fixed command table in `protocol`. A code past
//!    the end of the table is the designed end-of-session signal, not an error.
//! 3. **Handler**: the matching handler in `handlers` runs its fixed exchange with the
//!    controller and mutates the worker's registry.
//! 4. **Lockstep**: every worker runs the identical sequence. A worker that diverges
//!    stalls the group; there is no per-worker recovery.
//!
//! ## Submodules
//! - **`protocol`**: the command table and wire shapes.
//! - **`handlers`**: one exchange per command.
//! - **`worker`**: the event loop and session state machine.

pub mod handlers;
pub mod protocol;
pub mod worker;

#[cfg(test)]
mod tests;
