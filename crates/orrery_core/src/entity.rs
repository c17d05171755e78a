//! Entity tree nodes.
//!
//! An [`Entity`] is a node in the scene hierarchy: it owns an attach-ordered
//! list of [`Component`]s and an insertion-ordered list of child entity ids.
//! The [`Engine`](crate::engine::Engine) owns the arena of all entities, so
//! parent links and cross-entity operations (attach, detach, broadcast) are
//! expressed as ids resolved through the engine rather than object
//! references.

use crate::component::Component;

/// Entity identifier. Positive while the entity is tracked by an engine,
/// [`Entity::DETACHED`] once destroyed.
pub type EntityId = i64;

/// A node in the scene hierarchy.
///
/// Entities are created disabled; the engine enables the whole tree when a
/// root is admitted to the active list, so nothing receives updates before
/// its `entity.create` broadcast.
pub struct Entity {
    id: EntityId,
    name: String,
    layer: String,
    tags: Vec<String>,
    enabled: bool,
    parent: Option<EntityId>,
    children: Vec<EntityId>,
    components: Vec<Component>,
}

impl Entity {
    /// Sentinel id for an entity that is no longer tracked by an engine.
    pub const DETACHED: EntityId = -1;

    /// Name given to entities whose definition does not provide one.
    pub const ANONYMOUS: &'static str = "Anonymous";

    /// Layer given to entities whose definition does not provide one.
    pub const DEFAULT_LAYER: &'static str = "default";

    pub(crate) fn new(id: EntityId) -> Self {
        Self {
            id,
            name: Self::ANONYMOUS.to_string(),
            layer: Self::DEFAULT_LAYER.to_string(),
            tags: Vec::new(),
            enabled: false,
            parent: None,
            children: Vec::new(),
            components: Vec::new(),
        }
    }

    /// Returns the entity id, or [`Entity::DETACHED`] once destroyed.
    #[must_use]
    pub fn id(&self) -> EntityId {
        self.id
    }

    pub(crate) fn set_id(&mut self, id: EntityId) {
        self.id = id;
    }

    /// The entity's human-readable name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// The layer label this entity belongs to.
    #[must_use]
    pub fn layer(&self) -> &str {
        &self.layer
    }

    pub(crate) fn set_layer(&mut self, layer: impl Into<String>) {
        self.layer = layer.into();
    }

    /// All tags attached to this entity.
    #[must_use]
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// Returns `true` if the entity carries the given tag.
    #[must_use]
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    pub(crate) fn add_tag(&mut self, tag: impl Into<String>) {
        let tag = tag.into();
        if !self.has_tag(&tag) {
            self.tags.push(tag);
        }
    }

    /// Returns `true` if this entity participates in update broadcasts.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Enable this entity. Does not touch children — the engine cascades
    /// through the tree on admission.
    pub fn enable(&mut self) {
        self.enabled = true;
    }

    /// Disable this entity. Never cascades; whether descendants follow is a
    /// handler/plugin decision.
    pub fn disable(&mut self) {
        self.enabled = false;
    }

    /// The parent entity id, or `None` for roots.
    #[must_use]
    pub fn parent(&self) -> Option<EntityId> {
        self.parent
    }

    pub(crate) fn set_parent(&mut self, parent: Option<EntityId>) {
        self.parent = parent;
    }

    /// An entity is a root iff it has no parent.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// Child entity ids in insertion order.
    #[must_use]
    pub fn children(&self) -> &[EntityId] {
        &self.children
    }

    pub(crate) fn push_child(&mut self, child: EntityId) {
        if !self.children.contains(&child) {
            self.children.push(child);
        }
    }

    pub(crate) fn remove_child_id(&mut self, child: EntityId) {
        self.children.retain(|&c| c != child);
    }

    /// Detach the whole child list at once, returning it. Parent links on
    /// the children themselves are cleared by the engine.
    pub(crate) fn take_children(&mut self) -> Vec<EntityId> {
        std::mem::take(&mut self.children)
    }

    /// Returns `true` if a component with the given name is attached.
    #[must_use]
    pub fn has_component(&self, name: &str) -> bool {
        self.components.iter().any(|c| c.name() == name)
    }

    /// Look up an attached component by name.
    #[must_use]
    pub fn component(&self, name: &str) -> Option<&Component> {
        self.components.iter().find(|c| c.name() == name)
    }

    /// Mutable lookup of an attached component by name.
    pub fn component_mut(&mut self, name: &str) -> Option<&mut Component> {
        self.components.iter_mut().find(|c| c.name() == name)
    }

    /// Attached components in attach order.
    pub fn components(&self) -> impl Iterator<Item = &Component> {
        self.components.iter()
    }

    /// Attach a component, replacing any existing one with the same name
    /// while preserving its attach position.
    pub fn set_component(&mut self, component: Component) {
        match self
            .components
            .iter_mut()
            .find(|c| c.name() == component.name())
        {
            Some(slot) => *slot = component,
            None => self.components.push(component),
        }
    }

    /// Number of attached components.
    #[must_use]
    pub fn component_count(&self) -> usize {
        self.components.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_entity_is_disabled_root() {
        let entity = Entity::new(1);
        assert_eq!(entity.id(), 1);
        assert!(entity.is_root());
        assert!(!entity.is_enabled());
        assert_eq!(entity.name(), Entity::ANONYMOUS);
        assert_eq!(entity.layer(), Entity::DEFAULT_LAYER);
    }

    #[test]
    fn test_parent_clears_root() {
        let mut entity = Entity::new(2);
        entity.set_parent(Some(1));
        assert!(!entity.is_root());
        entity.set_parent(None);
        assert!(entity.is_root());
    }

    #[test]
    fn test_tags() {
        let mut entity = Entity::new(1);
        entity.add_tag("enemy");
        entity.add_tag("enemy");
        assert!(entity.has_tag("enemy"));
        assert!(!entity.has_tag("player"));
        assert_eq!(entity.tags().len(), 1);
    }

    #[test]
    fn test_set_component_replaces_in_place() {
        let mut entity = Entity::new(1);
        entity.set_component(Component::new("a", 1, json!({"v": 1})));
        entity.set_component(Component::new("b", 1, json!({})));
        entity.set_component(Component::new("a", 1, json!({"v": 2})));

        assert_eq!(entity.component_count(), 2);
        // Replacement keeps the original attach position.
        let order: Vec<&str> = entity.components().map(Component::name).collect();
        assert_eq!(order, vec!["a", "b"]);
        assert_eq!(entity.component("a").unwrap().data()["v"], 2);
    }

    #[test]
    fn test_child_list_maintenance() {
        let mut entity = Entity::new(1);
        entity.push_child(2);
        entity.push_child(3);
        entity.push_child(2);
        assert_eq!(entity.children(), &[2, 3]);

        entity.remove_child_id(2);
        assert_eq!(entity.children(), &[3]);

        entity.push_child(4);
        let taken = entity.take_children();
        assert_eq!(taken, vec![3, 4]);
        assert!(entity.children().is_empty());
    }

    #[test]
    fn test_disable_is_local() {
        let mut entity = Entity::new(1);
        entity.enable();
        assert!(entity.is_enabled());
        entity.disable();
        assert!(!entity.is_enabled());
    }
}
