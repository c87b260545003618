//! # Penstock
//!
//! A composable framework for building layered, bidirectional byte-stream
//! transport stacks with uniform, race-free shutdown semantics.
//!
//! ## Architecture
//!
//! A stack is a chain of *stages*, each owning exactly one stage below it:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                 Root Sink<Base>                      │
//! │      (top-level domain logic, owns the stack)        │
//! ├─────────────────────────────────────────────────────┤
//! │                 Mid-level stages                     │
//! │    (transforms, adapters — each a Sink<Base> too)    │
//! ├─────────────────────────────────────────────────────┤
//! │                    Leaf pump                         │
//! │     (descriptor/socket adapter touching the world)   │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! Data flows **upward** through synchronous `land` calls (child → parent)
//! and **downward** through asynchronous `send` calls (parent → child).
//! Control flows both ways: an abrupt `stop` propagates upward exactly once,
//! a graceful `shut` drains the stack strictly child-before-parent.
//!
//! The framework never parses or interprets the bytes it moves; concrete
//! transports, ciphers and multiplexers are stages built on top of it.

pub mod config;
pub mod io;
pub mod stage;
pub mod stack;

pub use config::Config;
pub use io::IoPump;
pub use stage::{
    Basin, BufferDrain, Drain, Faucet, Outer, Pipe, Pump, SendError, Valve, ValveState, Valved,
};
pub use stack::{Cap, Link, Sink, Stopper, Sunk, Sunken};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
