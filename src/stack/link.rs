//! Bridging typed stages onto byte-level children

use crate::stage::{Basin, Drain, Faucet, Outer, Valve, Valved};
use bytes::Bytes;

/// Adapter base for a typed stage wired above a byte-level child.
///
/// The layer below sees a raw-buffer sink; buffers landing there are
/// converted and re-land through the typed outer, so the stage above sees a
/// typed source. Transform stages embed a `Link` and land through
/// [`Link::faucet`] themselves after processing.
pub struct Link<T: Send + Sync + 'static> {
    faucet: Faucet<dyn Drain<T>>,
}

impl<T: Send + Sync + 'static> Link<T> {
    pub fn new(outer: Outer<dyn Drain<T>>) -> Self {
        Self {
            faucet: Faucet::new(outer),
        }
    }

    pub fn faucet(&self) -> &Faucet<dyn Drain<T>> {
        &self.faucet
    }

    pub fn outer(&self) -> &Outer<dyn Drain<T>> {
        self.faucet.outer()
    }
}

impl<T: Send + Sync + 'static> Basin for Link<T> {
    fn stop(&self, error: Option<&str>) {
        self.faucet.stop(error);
    }
}

impl<T> Drain<Bytes> for Link<T>
where
    T: From<Bytes> + Send + Sync + 'static,
{
    fn land(&self, data: Bytes) {
        self.faucet.land(T::from(data));
    }
}

impl<T: Send + Sync + 'static> Valved for Link<T> {
    fn valve(&self) -> &Valve {
        self.faucet.valve()
    }
}
