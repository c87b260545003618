//! Upward wiring: the non-owning parent handle and the valve bound to it

use super::{Basin, Drain, Valve};
use std::sync::Weak;
use tracing::{debug, trace};

/// Non-owning handle from a stage to the sink one level up.
///
/// Valid exactly for the owned child's lifetime. `land` on a handle whose
/// parent is gone is an ordering bug in the caller's stack and fails fast;
/// `stop` must stay safe mid-teardown, so there it degrades to a traced
/// no-op.
pub struct Outer<B: ?Sized> {
    parent: Weak<B>,
}

impl<B: ?Sized> Clone for Outer<B> {
    fn clone(&self) -> Self {
        Self {
            parent: self.parent.clone(),
        }
    }
}

impl<B: ?Sized> Outer<B> {
    pub fn new(parent: Weak<B>) -> Self {
        Self { parent }
    }

    /// Deliver one value to the parent.
    ///
    /// Panics if the parent has been released.
    pub fn land<T>(&self, data: T)
    where
        B: Drain<T>,
        T: Send + Sync + 'static,
    {
        let parent = self
            .parent
            .upgrade()
            .expect("landed data on a released outer stage");
        parent.land(data);
    }

    /// Propagate an abrupt stop to the parent. Never fails; a parent already
    /// tearing down simply no longer observes the signal.
    pub fn stop(&self, error: Option<&str>)
    where
        B: Basin,
    {
        match self.parent.upgrade() {
            Some(parent) => parent.stop(error),
            None => trace!(?error, "stop dropped, outer stage released"),
        }
    }
}

/// A [`Valve`] bound to the outward-facing sink of the stage above.
///
/// Every pump embeds one. `stop` finalizes local state first, then forwards
/// upward, and only on the first transition: the stage above observes a
/// child's failure exactly once, after the child's own teardown.
pub struct Faucet<B: ?Sized> {
    valve: Valve,
    outer: Outer<B>,
}

impl<B: ?Sized> Faucet<B> {
    pub fn new(outer: Outer<B>) -> Self {
        Self {
            valve: Valve::new(),
            outer,
        }
    }

    pub fn valve(&self) -> &Valve {
        &self.valve
    }

    pub fn outer(&self) -> &Outer<B> {
        &self.outer
    }

    /// Default pass-up landing: forward inbound data unchanged.
    pub fn land<T>(&self, data: T)
    where
        B: Drain<T>,
        T: Send + Sync + 'static,
    {
        self.outer.land(data);
    }

    /// Stop the local valve, then the stage above.
    pub fn stop(&self, error: Option<&str>)
    where
        B: Basin,
    {
        if self.valve.stop() {
            debug!(error = error.unwrap_or(""), "stage stopped");
            self.outer.stop(error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::{BufferDrain, ValveState};
    use bytes::Bytes;
    use std::sync::{Arc, Mutex};

    /// Records everything that reaches it.
    struct Recorder {
        landed: Mutex<Vec<Bytes>>,
        stops: Mutex<Vec<String>>,
    }

    impl Recorder {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                landed: Mutex::new(Vec::new()),
                stops: Mutex::new(Vec::new()),
            })
        }
    }

    impl Basin for Recorder {
        fn stop(&self, error: Option<&str>) {
            self.stops
                .lock()
                .unwrap()
                .push(error.unwrap_or("").to_string());
        }
    }

    impl Drain<Bytes> for Recorder {
        fn land(&self, data: Bytes) {
            self.landed.lock().unwrap().push(data);
        }
    }

    fn faucet_into(parent: &Arc<Recorder>) -> Faucet<BufferDrain> {
        let parent: Arc<BufferDrain> = parent.clone();
        let weak: Weak<BufferDrain> = Arc::downgrade(&parent);
        Faucet::new(Outer::new(weak))
    }

    #[test]
    fn test_land_forwards_to_parent() {
        let parent = Recorder::new();
        let faucet = faucet_into(&parent);

        faucet.land(Bytes::from_static(b"up"));
        assert_eq!(parent.landed.lock().unwrap().as_slice(), &[Bytes::from_static(b"up")]);
    }

    #[test]
    fn test_stop_finalizes_locally_then_forwards_once() {
        let parent = Recorder::new();
        let faucet = faucet_into(&parent);

        faucet.stop(Some("read failed"));
        assert_eq!(faucet.valve().state(), ValveState::Stopping);
        assert_eq!(parent.stops.lock().unwrap().as_slice(), &["read failed".to_string()]);

        // A second stop stays local
        faucet.stop(Some("later"));
        assert_eq!(parent.stops.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_stop_on_released_parent_is_a_no_op() {
        let parent = Recorder::new();
        let faucet = faucet_into(&parent);
        drop(parent);

        faucet.stop(Some("too late"));
        assert_eq!(faucet.valve().state(), ValveState::Stopping);
    }

    #[test]
    #[should_panic(expected = "released outer stage")]
    fn test_land_on_released_parent_fails_fast() {
        let parent = Recorder::new();
        let faucet = faucet_into(&parent);
        drop(parent);

        faucet.land(Bytes::from_static(b"lost"));
    }
}
