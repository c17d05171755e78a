//! Component instances.
//!
//! Components are schema-free: a named bundle of JSON data plus a table of
//! message handlers keyed by event name. Definitions construct instances
//! through a setup closure (see
//! [`ComponentDef`](crate::registry::ComponentDef)) which populates the
//! handler table; there is no per-component Rust type.

use std::collections::HashMap;
use std::rc::Rc;

use serde_json::Value;

use crate::engine::Engine;
use crate::entity::EntityId;

/// A message handler registered on a component for one event name.
///
/// Handlers receive the engine, the owning entity's id, and the event
/// arguments. They reach their own component state through the engine
/// (`engine.entity_mut(id)` then [`Entity::component_mut`]), which keeps the
/// broadcast walk free to hand out `&mut Engine`.
///
/// [`Entity::component_mut`]: crate::entity::Entity::component_mut
pub type MessageHandler = Rc<dyn Fn(&mut Engine, EntityId, &Value)>;

/// Construction closure invoked once when a component is attached to an
/// entity, after all of its requirements. Registers message handlers and
/// may consult engine services (plugins are loaded before entities).
pub type ComponentSetup = Rc<dyn Fn(&mut Component, &mut Engine)>;

/// A named data + behavior unit attached to exactly one entity.
pub struct Component {
    name: String,
    entity_id: EntityId,
    enabled: bool,
    data: Value,
    handlers: HashMap<String, MessageHandler>,
}

impl Component {
    pub(crate) fn new(name: &str, entity_id: EntityId, defaults: Value) -> Self {
        Self {
            name: name.to_string(),
            entity_id,
            enabled: true,
            data: defaults,
            handlers: HashMap::new(),
        }
    }

    /// The component's registered name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Id of the owning entity.
    #[must_use]
    pub fn entity_id(&self) -> EntityId {
        self.entity_id
    }

    /// Returns `true` if this component's handlers participate in
    /// broadcasts.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Toggle handler dispatch for this component without detaching it.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// The component's data payload.
    #[must_use]
    pub fn data(&self) -> &Value {
        &self.data
    }

    /// Mutable access to the data payload.
    pub fn data_mut(&mut self) -> &mut Value {
        &mut self.data
    }

    /// Read a single field of the payload.
    #[must_use]
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// Read a numeric field, defaulting when absent or non-numeric.
    #[must_use]
    pub fn field_f64(&self, key: &str, default: f64) -> f64 {
        self.field(key).and_then(Value::as_f64).unwrap_or(default)
    }

    /// Write a single field of the payload, promoting a non-object payload
    /// to an object first.
    pub fn set_field(&mut self, key: &str, value: Value) {
        if !self.data.is_object() {
            self.data = Value::Object(serde_json::Map::new());
        }
        if let Value::Object(map) = &mut self.data {
            map.insert(key.to_string(), value);
        }
    }

    /// Merge a configuration blob into the payload: shallow, field-level,
    /// incoming keys win, untouched keys survive. Incoming values are
    /// cloned — instance data never aliases a definition's configuration.
    pub fn apply_config(&mut self, config: &Value) {
        match (&mut self.data, config) {
            (_, Value::Null) => {}
            (Value::Object(data), Value::Object(incoming)) => {
                for (key, value) in incoming {
                    data.insert(key.clone(), value.clone());
                }
            }
            (data, incoming) => *data = incoming.clone(),
        }
    }

    /// Register a handler for the given event name. Called from setup
    /// closures; at most one handler per event name per component.
    pub fn on<F>(&mut self, event: &str, handler: F)
    where
        F: Fn(&mut Engine, EntityId, &Value) + 'static,
    {
        self.handlers.insert(event.to_string(), Rc::new(handler));
    }

    /// Fetch the handler for an event, if any. Disabled components are
    /// excluded from dispatch entirely.
    pub(crate) fn handler(&self, event: &str) -> Option<MessageHandler> {
        if !self.enabled {
            return None;
        }
        self.handlers.get(event).cloned()
    }

    /// Returns `true` if a handler is registered for the event name.
    #[must_use]
    pub fn handles(&self, event: &str) -> bool {
        self.handlers.contains_key(event)
    }
}
