use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::hub::HubStatus;

pub type EventCallback = Box<dyn Fn(&Event) + Send + Sync>;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    TokenizerLoading { key: String },
    TokenizerLoaded { key: String, status: HubStatus },
    TokenizerFailed { key: String, error: String, status: HubStatus },
}

impl Event {
    pub fn type_name(&self) -> &'static str {
        match self {
            Event::TokenizerLoading { .. } => "tokenizer_loading",
            Event::TokenizerLoaded { .. } => "tokenizer_loaded",
            Event::TokenizerFailed { .. } => "tokenizer_failed",
        }
    }

    /// Loaded and failed events change the hub counts.
    pub fn is_change(&self) -> bool {
        !matches!(self, Event::TokenizerLoading { .. })
    }
}

pub trait EventHandler: Send + Sync {
    fn handle(&self, event: &Event);
    fn name(&self) -> &str;
}

pub type HandlerId = usize;

/// Fans hub events out to registered handlers, per-type callbacks and async
/// subscribers.
#[allow(clippy::type_complexity)]
pub struct EventBus {
    handlers: RwLock<HashMap<HandlerId, (String, Arc<dyn EventHandler>)>>,
    callbacks: RwLock<HashMap<String, Vec<EventCallback>>>,
    next_id: AtomicUsize,
    sender: broadcast::Sender<Event>,
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(64);
        Self {
            handlers: RwLock::new(HashMap::new()),
            callbacks: RwLock::new(HashMap::new()),
            next_id: AtomicUsize::new(1),
            sender,
        }
    }

    pub fn subscribe<H: EventHandler + 'static>(&self, handler: H) -> HandlerId {
        let handler_id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let name = handler.name().to_string();
        self.handlers.write().insert(handler_id, (name, Arc::new(handler)));
        handler_id
    }

    /// Registers a callback for one event type. `"change"` matches every
    /// event that alters the hub counts.
    pub fn subscribe_to(&self, event_type: &str, callback: EventCallback) {
        self.callbacks
            .write()
            .entry(event_type.to_string())
            .or_default()
            .push(callback);
    }

    pub fn unsubscribe(&self, handler_id: HandlerId) {
        self.handlers.write().remove(&handler_id);
    }

    /// Receiver for async consumers. Lagging receivers lose old events.
    pub fn receiver(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }

    pub fn handler_names(&self) -> Vec<String> {
        self.handlers.read().values().map(|(name, _)| name.clone()).collect()
    }

    pub fn publish(&self, event: Event) {
        let handlers: Vec<Arc<dyn EventHandler>> =
            self.handlers.read().values().map(|(_, h)| Arc::clone(h)).collect();
        for handler in handlers {
            handler.handle(&event);
        }

        {
            let callbacks = self.callbacks.read();
            if let Some(list) = callbacks.get(event.type_name()) {
                for callback in list {
                    callback(&event);
                }
            }
            if event.is_change() {
                if let Some(list) = callbacks.get("change") {
                    for callback in list {
                        callback(&event);
                    }
                }
            }
        }

        // No receivers is fine.
        let _ = self.sender.send(event);
    }

    pub fn clear(&self) {
        self.handlers.write().clear();
        self.callbacks.write().clear();
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

pub struct LoggingHandler;

impl EventHandler for LoggingHandler {
    fn handle(&self, event: &Event) {
        match event {
            Event::TokenizerLoading { key } => tracing::debug!(key = %key, "loading tokenizer"),
            Event::TokenizerLoaded { key, status } => {
                tracing::info!(key = %key, loaded = status.loaded, downloaded = status.downloaded, "tokenizer loaded")
            }
            Event::TokenizerFailed { key, error, .. } => {
                tracing::warn!(key = %key, error = %error, "tokenizer failed to load")
            }
        }
    }

    fn name(&self) -> &str {
        "logging"
    }
}
