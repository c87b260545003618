//! Leaf stages touching real I/O
//!
//! Provides:
//! - [`IoPump`]: a byte-level pump over any async stream
//! - socket authorization through a host-supplied [`Protector`] callback

mod pump;

#[cfg(unix)]
mod protect;

pub use pump::IoPump;

#[cfg(unix)]
pub use protect::{connect, Protector};
