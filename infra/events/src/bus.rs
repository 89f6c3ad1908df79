use crate::error::EventBusError;
use fxhash::FxHashMap;
use parking_lot::RwLock;
use std::any::{Any, TypeId, type_name};
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tracing::{trace, warn};

/// Default broadcast buffer; slow subscribers lag and skip ahead past this.
const DEFAULT_CAPACITY: usize = 64;

/// Supported channel kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    /// Fan-out: every subscriber receives every event.
    Broadcast { capacity: usize },
    /// Latest value only.
    Watch,
}

/// Anything that can travel on the [`EventBus`].
pub trait Event: Any + Send + Sync + 'static {}
impl<T: Any + Send + Sync + 'static> Event for T {}

#[derive(Debug)]
struct ChannelState {
    kind: ChannelKind,
    sender: Box<dyn Any + Send + Sync>,
}

impl ChannelState {
    fn broadcast<T: Event>(&self) -> Result<broadcast::Sender<Arc<T>>, EventBusError> {
        self.sender
            .downcast_ref::<broadcast::Sender<Arc<T>>>()
            .cloned()
            .ok_or_else(|| type_mismatch::<T>())
    }

    fn watch<T: Event>(&self) -> Result<watch::Sender<Arc<T>>, EventBusError> {
        self.sender
            .downcast_ref::<watch::Sender<Arc<T>>>()
            .cloned()
            .ok_or_else(|| type_mismatch::<T>())
    }
}

/// Thread-safe, cheaply clonable event bus keyed by event type.
#[derive(Debug, Clone, Default)]
pub struct EventBus {
    channels: Arc<RwLock<FxHashMap<TypeId, ChannelState>>>,
}

impl EventBus {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes to broadcast events of type `T`.
    ///
    /// # Errors
    /// Returns [`EventBusError::ChannelKindMismatch`] if `T` is registered as a watch channel.
    pub fn subscribe<T: Event>(&self) -> Result<broadcast::Receiver<Arc<T>>, EventBusError> {
        Ok(self.broadcast_sender::<T>(DEFAULT_CAPACITY)?.subscribe())
    }

    /// Subscribes to the latest value of `T`, seeding the channel with `initial` if absent.
    ///
    /// # Errors
    /// Returns [`EventBusError::ChannelKindMismatch`] if `T` is registered as a broadcast channel.
    pub fn subscribe_watch<T: Event>(
        &self,
        initial: T,
    ) -> Result<watch::Receiver<Arc<T>>, EventBusError> {
        Ok(self.watch_sender(Arc::new(initial))?.subscribe())
    }

    /// Broadcasts `event`, returning how many subscribers received it.
    ///
    /// Publishing without subscribers is not an error; the event is dropped.
    ///
    /// # Errors
    /// Returns [`EventBusError::ChannelKindMismatch`] if `T` is registered as a watch channel.
    pub fn publish<T: Event>(&self, event: T) -> Result<usize, EventBusError> {
        let sender = self.broadcast_sender::<T>(DEFAULT_CAPACITY)?;
        let delivered = sender.send(Arc::new(event)).unwrap_or(0);
        trace!(event = type_name::<T>(), delivered, "Event dispatched");
        Ok(delivered)
    }

    /// Replaces the latest value of `T`.
    ///
    /// # Errors
    /// Returns [`EventBusError::ChannelKindMismatch`] if `T` is registered as a broadcast channel.
    pub fn publish_watch<T: Event>(&self, event: T) -> Result<(), EventBusError> {
        let event = Arc::new(event);
        let sender = self.watch_sender(event.clone())?;
        sender.send_replace(event);
        Ok(())
    }

    fn broadcast_sender<T: Event>(
        &self,
        capacity: usize,
    ) -> Result<broadcast::Sender<Arc<T>>, EventBusError> {
        let requested = ChannelKind::Broadcast { capacity };
        if let Some(state) = self.channels.read().get(&TypeId::of::<T>()) {
            return match state.kind {
                ChannelKind::Broadcast { capacity: existing } => {
                    if existing != capacity {
                        warn!(
                            event = type_name::<T>(),
                            existing,
                            requested = capacity,
                            "Broadcast channel already exists with a different capacity"
                        );
                    }
                    state.broadcast::<T>()
                },
                ChannelKind::Watch => Err(kind_mismatch::<T>(requested, state.kind)),
            };
        }

        let mut channels = self.channels.write();
        let state = channels.entry(TypeId::of::<T>()).or_insert_with(|| {
            trace!(event = type_name::<T>(), capacity, "Creating broadcast channel");
            let (tx, _) = broadcast::channel::<Arc<T>>(capacity);
            ChannelState { kind: requested, sender: Box::new(tx) }
        });
        match state.kind {
            ChannelKind::Broadcast { .. } => state.broadcast::<T>(),
            ChannelKind::Watch => Err(kind_mismatch::<T>(requested, state.kind)),
        }
    }

    fn watch_sender<T: Event>(&self, initial: Arc<T>) -> Result<watch::Sender<Arc<T>>, EventBusError> {
        if let Some(state) = self.channels.read().get(&TypeId::of::<T>()) {
            return match state.kind {
                ChannelKind::Watch => state.watch::<T>(),
                ChannelKind::Broadcast { .. } => {
                    Err(kind_mismatch::<T>(ChannelKind::Watch, state.kind))
                },
            };
        }

        let mut channels = self.channels.write();
        let state = channels.entry(TypeId::of::<T>()).or_insert_with(|| {
            trace!(event = type_name::<T>(), "Creating watch channel");
            let (tx, _) = watch::channel(initial);
            ChannelState { kind: ChannelKind::Watch, sender: Box::new(tx) }
        });
        match state.kind {
            ChannelKind::Watch => state.watch::<T>(),
            ChannelKind::Broadcast { .. } => Err(kind_mismatch::<T>(ChannelKind::Watch, state.kind)),
        }
    }
}

fn type_mismatch<T>() -> EventBusError {
    EventBusError::TypeMismatch {
        message: type_name::<T>().into(),
        context: Some("stored sender has an unexpected type".into()),
    }
}

fn kind_mismatch<T>(requested: ChannelKind, existing: ChannelKind) -> EventBusError {
    EventBusError::ChannelKindMismatch {
        message: format!("requested {requested:?} but found {existing:?} for {}", type_name::<T>())
            .into(),
        context: None,
    }
}
