//! Session event bus
//!
//! The session publishes a typed event after each state change. Subscribers
//! register per event type; nothing else is notified.

use std::any::{Any, TypeId};
use std::sync::Arc;

use ahash::AHashMap;
use parking_lot::Mutex;
use tracing::trace;

/// Anything published on the bus
pub trait Event: Send + Sync + 'static {
    fn as_any(&self) -> &dyn Any;
}

impl<T: Send + Sync + 'static> Event for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Receives events of the type it was subscribed under
pub trait EventHandler: Send + Sync {
    fn handle(&mut self, event: &dyn Event);
}

impl<F> EventHandler for F
where
    F: FnMut(&dyn Event) + Send + Sync,
{
    fn handle(&mut self, event: &dyn Event) {
        self(event)
    }
}

type HandlerMap = AHashMap<TypeId, Vec<Box<dyn EventHandler>>>;

/// Workbench events
pub mod events {
    /// A file was decoded and ingested
    #[derive(Debug, Clone)]
    pub struct DatasetLoaded {
        pub source_name: String,
        pub row_count: usize,
        pub column_count: usize,
        pub hydrated_notes: usize,
    }

    /// Decoding failed or was rejected; the previous dataset is kept
    #[derive(Debug, Clone)]
    pub struct DatasetLoadFailed {
        pub source_name: String,
        pub error: String,
    }

    /// A transform replaced the dataset
    #[derive(Debug, Clone)]
    pub struct DatasetMutated {
        pub operation: String,
        pub changed: usize,
    }

    #[derive(Debug, Clone)]
    pub struct PresetApplied {
        pub preset_id: String,
        pub preset_label: String,
    }

    /// A status note reached the annotation store
    #[derive(Debug, Clone)]
    pub struct AnnotationSaved {
        pub key: String,
    }

    #[derive(Debug, Clone)]
    pub struct UndoRestored {
        pub row_count: usize,
    }
}

/// Type-keyed publish/subscribe. Clones share subscribers.
#[derive(Clone, Default)]
pub struct EventBus {
    handlers: Arc<Mutex<HandlerMap>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for events of type `E`
    pub fn subscribe<E: Event>(&self, handler: Box<dyn EventHandler>) {
        self.handlers
            .lock()
            .entry(TypeId::of::<E>())
            .or_default()
            .push(handler);
    }

    /// Register a closure that receives the concrete event
    pub fn on<E, F>(&self, mut f: F)
    where
        E: Event,
        F: FnMut(&E) + Send + Sync + 'static,
    {
        self.subscribe::<E>(handler_from_fn(move |event: &dyn Event| {
            if let Some(event) = event.as_any().downcast_ref::<E>() {
                f(event);
            }
        }));
    }

    /// Deliver an event; returns how many handlers saw it.
    ///
    /// Handlers run with the bus unlocked, so they may publish or subscribe.
    /// While `E` is being delivered its handlers are checked out: an `E`
    /// published from inside one of them reaches nobody.
    pub fn publish<E: Event>(&self, event: E) -> usize {
        let type_id = TypeId::of::<E>();
        let Some(mut checked_out) = self.handlers.lock().remove(&type_id) else {
            return 0;
        };
        for handler in checked_out.iter_mut() {
            handler.handle(&event);
        }
        let delivered = checked_out.len();

        let mut handlers = self.handlers.lock();
        let slot = handlers.entry(type_id).or_default();
        let added_meanwhile = std::mem::replace(slot, checked_out);
        slot.extend(added_meanwhile);

        trace!(event = std::any::type_name::<E>(), handlers = delivered, "Published event");
        delivered
    }

    pub fn subscriber_count<E: Event>(&self) -> usize {
        self.handlers
            .lock()
            .get(&TypeId::of::<E>())
            .map(Vec::len)
            .unwrap_or(0)
    }
}

/// Box a closure as an [`EventHandler`]
pub fn handler_from_fn<F>(f: F) -> Box<dyn EventHandler>
where
    F: FnMut(&dyn Event) + Send + Sync + 'static,
{
    Box::new(f)
}
