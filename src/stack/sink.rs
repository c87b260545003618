//! Ownership and wiring of a stage's child

use crate::stage::{Basin, Drain, Outer, Pipe, Pump, SendError, Valve, Valved};
use async_trait::async_trait;
use bytes::Bytes;
use std::any::Any;
use std::sync::{Arc, OnceLock, Weak};

/// Exclusive owner of one inner stage.
///
/// The slot is filled exactly once, before any data flows, and never
/// replaced. Dropping the `Sunk` drops the owned stage.
pub struct Sunk<T: Send + Sync + 'static> {
    slot: OnceLock<Box<dyn Pump<T>>>,
}

impl<T: Send + Sync + 'static> Sunk<T> {
    pub fn new() -> Self {
        Self {
            slot: OnceLock::new(),
        }
    }

    /// Whether the inner stage has been constructed
    pub fn wired(&self) -> bool {
        self.slot.get().is_some()
    }

    /// The owned inner stage.
    ///
    /// Panics when called before wiring; that is a programming error, not a
    /// runtime condition.
    pub fn inner(&self) -> &dyn Pump<T> {
        self.slot
            .get()
            .expect("inner stage used before wiring")
            .as_ref()
    }

    fn install(&self, pump: Box<dyn Pump<T>>) {
        if self.slot.set(pump).is_err() {
            panic!("stage wired twice");
        }
    }
}

impl<T: Send + Sync + 'static> Default for Sunk<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Weak view of a [`Sunk`], handed to the base stage built on top of it.
///
/// Lets the base reach the stage below without owning it. Sending before
/// wiring, or after the owning sink is gone, fails fast.
pub struct Sunken<T: Send + Sync + 'static> {
    sunk: Weak<Sunk<T>>,
}

impl<T: Send + Sync + 'static> Clone for Sunken<T> {
    fn clone(&self) -> Self {
        Self {
            sunk: self.sunk.clone(),
        }
    }
}

impl<T: Send + Sync + 'static> Sunken<T> {
    /// Whether the stage below has been wired
    pub fn wired(&self) -> bool {
        self.sunk.upgrade().map(|sunk| sunk.wired()).unwrap_or(false)
    }

    /// Transmit one value to the stage below
    pub async fn send(&self, data: &T) -> Result<(), SendError> {
        let sunk = self
            .sunk
            .upgrade()
            .expect("sent data beneath a released sink");
        sunk.inner().send(data).await
    }
}

/// The composition point of one stack level.
///
/// A `Sink<B, T>` both *is* a stage (everything `B` implements is delegated)
/// and *owns* the next stage down, constructed on demand through
/// [`Sink::wire`]. The sink supplies itself as the child's outer sink, so
/// the child lands data and reports failures into `B`.
pub struct Sink<B, T: Send + Sync + 'static = Bytes> {
    // Declared first: the owned inner stage is released before the base it
    // reports into.
    sunk: Arc<Sunk<T>>,
    base: B,
}

impl<B, T> Sink<B, T>
where
    B: Send + Sync + 'static,
    T: Send + Sync + 'static,
{
    /// Build a new sink around a base stage.
    ///
    /// The base is constructed against a [`Sunken`] view of this sink's
    /// slot, through which it reaches the stage wired below.
    pub fn new<F>(build: F) -> Arc<Self>
    where
        F: FnOnce(Sunken<T>) -> B,
    {
        let sunk = Arc::new(Sunk::new());
        let base = build(Sunken {
            sunk: Arc::downgrade(&sunk),
        });
        Arc::new(Self { sunk, base })
    }

    /// The domain logic of this level
    pub fn base(&self) -> &B {
        &self.base
    }

    /// Whether the inner stage has been constructed
    pub fn wired(&self) -> bool {
        self.sunk.wired()
    }

    /// The owned inner stage. Panics when unwired.
    pub fn inner(&self) -> &dyn Pump<T> {
        self.sunk.inner()
    }
}

impl<B, T> Sink<B, T>
where
    B: Drain<T> + Send + Sync + 'static,
    T: Send + Sync + 'static,
{
    /// Construct the inner stage, wiring this sink in as its outer sink.
    ///
    /// Returns a borrowed reference to the concrete stage for immediate use;
    /// ownership stays here. Wiring twice panics and leaves the original
    /// child untouched.
    pub fn wire<P, F>(self: &Arc<Self>, build: F) -> &P
    where
        P: Pump<T>,
        F: FnOnce(Outer<dyn Drain<T>>) -> P,
    {
        let this: Arc<dyn Drain<T>> = self.clone();
        let parent: Weak<dyn Drain<T>> = Arc::downgrade(&this);
        let pump = build(Outer::new(parent));
        self.sunk.install(Box::new(pump));

        let inner: &dyn Any = self.sunk.inner();
        inner
            .downcast_ref::<P>()
            .expect("wired stage has its constructed type")
    }
}

impl<B, T> Basin for Sink<B, T>
where
    B: Basin + 'static,
    T: Send + Sync + 'static,
{
    fn stop(&self, error: Option<&str>) {
        self.base.stop(error);
    }
}

impl<U, B, T> Drain<U> for Sink<B, T>
where
    U: Send + Sync + 'static,
    B: Drain<U> + 'static,
    T: Send + Sync + 'static,
{
    fn land(&self, data: U) {
        self.base.land(data);
    }
}

#[async_trait]
impl<U, B, T> Pipe<U> for Sink<B, T>
where
    U: Send + Sync + 'static,
    B: Pipe<U> + 'static,
    T: Send + Sync + 'static,
{
    async fn send(&self, data: &U) -> Result<(), SendError> {
        self.base.send(data).await
    }
}

#[async_trait]
impl<B, T> Valved for Sink<B, T>
where
    B: Valved + 'static,
    T: Send + Sync + 'static,
{
    fn valve(&self) -> &Valve {
        self.base.valve()
    }

    /// Drain strictly child-before-self: the wired inner stage completes its
    /// shutdown before the base finalizes.
    async fn shut(&self) {
        if self.sunk.wired() {
            self.sunk.inner().shut().await;
        }
        self.base.shut().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stack::{Cap, Stopper};
    use crate::stage::ValveState;
    use std::panic::{catch_unwind, AssertUnwindSafe};

    fn root() -> Arc<Sink<Stopper>> {
        Sink::new(|_| Stopper::new())
    }

    #[test]
    fn test_wire_installs_exactly_once() {
        let sink = root();
        assert!(!sink.wired());

        let cap: &Cap = sink.wire(Cap::new);
        assert!(sink.wired());
        assert_eq!(cap.valve().state(), ValveState::Active);
    }

    #[test]
    fn test_wire_twice_fails_fast_and_keeps_original() {
        let sink = root();
        sink.wire(Cap::new);

        let result = catch_unwind(AssertUnwindSafe(|| {
            sink.wire(Cap::new);
        }));
        assert!(result.is_err());

        // The original child is still in place and usable
        assert!(sink.wired());
        let inner: &dyn Any = sink.inner();
        assert!(inner.downcast_ref::<Cap>().is_some());
    }

    #[test]
    #[should_panic(expected = "before wiring")]
    fn test_inner_before_wire_fails_fast() {
        let sink = root();
        let _ = sink.inner();
    }

    #[tokio::test]
    #[should_panic(expected = "released sink")]
    async fn test_sunken_send_after_sink_released_fails_fast() {
        let mut stolen = None;
        {
            let _sink: Arc<Sink<Stopper>> = Sink::new(|sunken| {
                stolen = Some(sunken);
                Stopper::new()
            });
        }
        stolen.unwrap().send(&Bytes::from_static(b"late")).await.ok();
    }

    #[test]
    fn test_sunken_tracks_wiring() {
        let mut held = None;
        let sink: Arc<Sink<Stopper>> = Sink::new(|sunken| {
            held = Some(sunken);
            Stopper::new()
        });
        let held = held.unwrap();

        assert!(!held.wired());
        sink.wire(Cap::new);
        assert!(held.wired());
    }
}
