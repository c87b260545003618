//! Stack composition
//!
//! Ownership and wiring of stages into stacks:
//! - [`Sunk`]: owns exactly one inner stage, installed exactly once
//! - [`Sunken`]: the weak view of that slot a base stage sends through
//! - [`Sink`]: couples a base stage with the stage it owns below
//! - [`Link`]: adapter base bridging typed stages onto byte-level children
//! - [`Cap`], [`Stopper`]: degenerate stages for the ends of a stack

mod link;
mod sink;
mod terminal;

pub use link::Link;
pub use sink::{Sink, Sunk, Sunken};
pub use terminal::{Cap, Stopper};
