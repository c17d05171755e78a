//! Engine-scoped external event bus.
//!
//! The bus is a publish/subscribe channel for collaborators *outside* the
//! simulation — the host application, external controllers. Entities,
//! components, and plugins must not register listeners here: bus dispatch
//! sits outside the per-step ordering guarantees. The bridge from the
//! outside in is [`Engine::broadcast`](crate::engine::Engine::broadcast),
//! which emits on this bus first and then walks every root entity tree.

use std::collections::HashMap;

use serde_json::Value;

/// Lifecycle event broadcast through a root's tree on admission.
pub const ENTITY_CREATE: &str = "entity.create";

/// Lifecycle event broadcast through a root's tree before teardown.
pub const ENTITY_DESTROY: &str = "entity.destroy";

/// Per-step event broadcast to every enabled root; arguments carry the
/// step delta in seconds.
pub const ENGINE_UPDATE: &str = "engine.update";

/// A bus listener. Listeners only observe payloads; they hold their own
/// state through captures.
pub type EventCallback = Box<dyn FnMut(&Value)>;

/// Name-keyed listener lists.
#[derive(Default)]
pub struct EventBus {
    listeners: HashMap<String, Vec<EventCallback>>,
}

impl EventBus {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener for an event name.
    pub fn on<F>(&mut self, event: &str, callback: F)
    where
        F: FnMut(&Value) + 'static,
    {
        self.listeners
            .entry(event.to_string())
            .or_default()
            .push(Box::new(callback));
    }

    /// Invoke every listener registered for the event name, in
    /// registration order. Unknown events dispatch to nobody.
    pub fn emit(&mut self, event: &str, data: &Value) {
        if let Some(callbacks) = self.listeners.get_mut(event) {
            for callback in callbacks {
                callback(data);
            }
        }
    }

    /// Number of listeners registered for an event name.
    #[must_use]
    pub fn listener_count(&self, event: &str) -> usize {
        self.listeners.get(event).map_or(0, Vec::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_emit_reaches_listeners_in_order() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut bus = EventBus::new();

        let first = seen.clone();
        bus.on("score", move |data| {
            first.borrow_mut().push(format!("first:{data}"));
        });
        let second = seen.clone();
        bus.on("score", move |data| {
            second.borrow_mut().push(format!("second:{data}"));
        });

        bus.emit("score", &json!(10));
        assert_eq!(&*seen.borrow(), &["first:10", "second:10"]);
    }

    #[test]
    fn test_emit_unknown_event_is_noop() {
        let mut bus = EventBus::new();
        bus.emit("nobody.listens", &Value::Null);
        assert_eq!(bus.listener_count("nobody.listens"), 0);
    }

    #[test]
    fn test_listeners_keep_state() {
        let count = Rc::new(RefCell::new(0));
        let mut bus = EventBus::new();
        let counter = count.clone();
        bus.on("tick", move |_| *counter.borrow_mut() += 1);

        bus.emit("tick", &Value::Null);
        bus.emit("tick", &Value::Null);
        assert_eq!(*count.borrow(), 2);
    }
}
