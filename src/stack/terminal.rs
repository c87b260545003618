//! Degenerate stages for the ends of a stack

use crate::stage::{Basin, BufferDrain, Drain, Faucet, Outer, Pipe, SendError, Valve, Valved};
use async_trait::async_trait;
use bytes::Bytes;
use tracing::trace;

/// A closed bottom end.
///
/// Nothing may ever flow through a cap: `send` is a fatal invariant
/// violation. Shutting a cap stops it (propagating upward) and finalizes
/// its valve.
pub struct Cap {
    faucet: Faucet<BufferDrain>,
}

impl Cap {
    pub fn new(outer: Outer<BufferDrain>) -> Self {
        Self {
            faucet: Faucet::new(outer),
        }
    }
}

impl Basin for Cap {
    fn stop(&self, error: Option<&str>) {
        self.faucet.stop(error);
    }
}

#[async_trait]
impl Pipe<Bytes> for Cap {
    async fn send(&self, _data: &Bytes) -> Result<(), SendError> {
        panic!("send through a closed cap");
    }
}

#[async_trait]
impl Valved for Cap {
    fn valve(&self) -> &Valve {
        self.faucet.valve()
    }

    async fn shut(&self) {
        self.faucet.stop(None);
        self.faucet.valve().shut().await;
    }
}

/// A no-op top of stack.
///
/// Absorbs whatever still lands or stops after the interesting layers are
/// done; upward traffic has nowhere further to go. Use it as the base of a
/// root sink whose inner stage only needs a shutdown hook.
pub struct Stopper {
    valve: Valve,
}

impl Stopper {
    pub fn new() -> Self {
        Self {
            valve: Valve::new(),
        }
    }
}

impl Default for Stopper {
    fn default() -> Self {
        Self::new()
    }
}

impl Basin for Stopper {
    fn stop(&self, error: Option<&str>) {
        trace!(?error, "stop absorbed at stack top");
    }
}

impl Drain<Bytes> for Stopper {
    fn land(&self, data: Bytes) {
        trace!(len = data.len(), "data absorbed at stack top");
    }
}

#[async_trait]
impl Valved for Stopper {
    fn valve(&self) -> &Valve {
        &self.valve
    }
}
