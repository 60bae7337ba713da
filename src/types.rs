//! Wire-level scalar types shared by the worker and the controller.
//!
//! Every field exchanged over the inter-group channel has one fixed width per
//! build. The controller is compiled against the same table, so changing any
//! alias here is a protocol break.

/// Local ordinal of an element inside one worker's partition.
pub type Local = i32;
/// Global element identifier (0-based).
pub type Global = i64;
/// Counts and sizes on the wire.
pub type Size = i32;
/// Object handle, an index into one of the four registry tables.
pub type Handle = i32;
/// Vector and matrix entry type.
pub type Scalar = f64;
/// Command code broadcast at the start of every round.
pub type Code = u8;

/// Position of a worker inside its group. The controller is never a rank.
pub type Rank = usize;

/// Width of `T` in bits, as reported by `info`.
pub const fn bits<T>() -> usize {
    std::mem::size_of::<T>() * 8
}
