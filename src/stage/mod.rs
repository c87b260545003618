//! Stage capabilities
//!
//! The vocabulary every stage implements:
//! - [`Basin`]: can be abruptly stopped
//! - [`Drain`]: accepts one value, synchronously
//! - [`Pipe`]: transmits one value, asynchronously
//! - [`Valved`]: carries a [`Valve`] and a graceful shutdown hook
//! - [`Pump`]: the full stage object a parent owns

mod faucet;
mod valve;

pub use faucet::{Faucet, Outer};
pub use valve::{Valve, ValveState};

use async_trait::async_trait;
use bytes::Bytes;
use std::any::Any;
use std::sync::Arc;
use thiserror::Error;

/// Delivery failure surfaced by [`Pipe::send`]
#[derive(Debug, Error)]
pub enum SendError {
    /// The stage has stopped or shut and accepts no further traffic
    #[error("stage stopped")]
    Stopped,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("send failed: {0}")]
    Failed(String),
}

/// Capability to be abruptly stopped.
///
/// `stop` is synchronous, best-effort and must never fail, block or suspend.
/// It is the guaranteed-safe teardown path even when the stack is already
/// partially torn down.
pub trait Basin: Send + Sync {
    fn stop(&self, error: Option<&str>);
}

/// Capability to accept one value.
///
/// `land` delivers synchronously and must not suspend, so a lower layer can
/// push upward-flowing events without scheduler cooperation. Landing on a
/// stage that has stopped or shut is out of contract.
pub trait Drain<T: Send + Sync + 'static>: Basin {
    fn land(&self, data: T);
}

/// The canonical byte-level sink used to start and terminate stacks.
pub type BufferDrain = dyn Drain<Bytes>;

/// Capability to transmit one value toward the far end.
///
/// Completes once the value has been handed to the next stage, or fails with
/// a delivery error. Retry policy belongs to the caller.
#[async_trait]
pub trait Pipe<T: Send + Sync + 'static>: Send + Sync {
    async fn send(&self, data: &T) -> Result<(), SendError>;
}

/// Capability to shut down gracefully.
///
/// The provided `shut` finalizes the stage's own [`Valve`]; stages with
/// resources to drain override it and shut the valve last. Calling `shut`
/// twice is safe.
#[async_trait]
pub trait Valved: Send + Sync {
    fn valve(&self) -> &Valve;

    async fn shut(&self) {
        self.valve().shut().await;
    }
}

/// A full stage object: transmits values downward and participates in the
/// shutdown protocol. This is what the ownership layer stores and what a
/// parent stage wires beneath itself.
pub trait Pump<T: Send + Sync + 'static>: Pipe<T> + Basin + Valved + Any {}

impl<T: Send + Sync + 'static, P> Pump<T> for P where P: Pipe<T> + Basin + Valved + Any {}

// A whole stack can be held and wired through a shared handle; the handle
// behaves as the stage it points at.

impl<P: Basin> Basin for Arc<P> {
    fn stop(&self, error: Option<&str>) {
        (**self).stop(error);
    }
}

impl<T: Send + Sync + 'static, P: Drain<T>> Drain<T> for Arc<P> {
    fn land(&self, data: T) {
        (**self).land(data);
    }
}

#[async_trait]
impl<T: Send + Sync + 'static, P: Pipe<T>> Pipe<T> for Arc<P> {
    async fn send(&self, data: &T) -> Result<(), SendError> {
        (**self).send(data).await
    }
}

#[async_trait]
impl<P: Valved> Valved for Arc<P> {
    fn valve(&self) -> &Valve {
        (**self).valve()
    }

    async fn shut(&self) {
        (**self).shut().await;
    }
}
