//! State machines composing codec steps with transport operations.
//!
//! Each composer owns one session and is driven by `poll_*` calls. The only
//! points where an operation suspends are transport polls returning
//! `Pending`; all codec work happens synchronously between them.

pub mod read;
pub mod write;

pub use read::{ReadComposer, ReadState};
pub use write::{CloseState, WriteComposer, WriteState};
