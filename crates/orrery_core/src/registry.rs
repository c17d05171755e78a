//! Definition registry.
//!
//! The registry stores the immutable definitions everything else is built
//! from: components, prefabs, plugins, and scenes, all keyed by name. It is
//! constructed once at configuration time and moved into the engine — there
//! is no process-wide singleton.
//!
//! Definitions never change at runtime, with one exception: the one-time
//! [`Registry::optimize`] pass, which flattens every component definition's
//! transitive requirements into a direct list so instantiation resolves
//! dependencies with a plain traversal instead of a recursive graph walk.

use std::collections::BTreeMap;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::component::ComponentSetup;
use crate::plugin::Plugin;

/// Lookup and validation errors for registry definitions.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("unknown prefab: {0}")]
    PrefabNotFound(String),
    #[error("unknown component: {0}")]
    ComponentNotFound(String),
    #[error("unknown plugin: {0}")]
    PluginNotFound(String),
    #[error("unknown scene: {0}")]
    SceneNotFound(String),
    #[error("circular component requirement involving '{0}'")]
    CircularRequirement(String),
}

/// Reference to an entity template: either a registered prefab by name or
/// an inline definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityRef {
    Name(String),
    Inline(PrefabDef),
}

impl From<&str> for EntityRef {
    fn from(name: &str) -> Self {
        EntityRef::Name(name.to_string())
    }
}

impl From<PrefabDef> for EntityRef {
    fn from(def: PrefabDef) -> Self {
        EntityRef::Inline(def)
    }
}

/// A reusable entity template.
///
/// `from_prefab` declares inheritance: the base is built first and this
/// definition's components and metadata are layered on top. Component
/// configurations merge shallowly, this definition's keys winning.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PrefabDef {
    pub name: Option<String>,
    pub layer: Option<String>,
    pub tags: Vec<String>,
    pub from_prefab: Option<String>,
    pub components: BTreeMap<String, Value>,
    pub children: Vec<EntityRef>,
}

impl PrefabDef {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the entity name this template produces.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the layer label.
    #[must_use]
    pub fn in_layer(mut self, layer: impl Into<String>) -> Self {
        self.layer = Some(layer.into());
        self
    }

    /// Add a tag.
    #[must_use]
    pub fn tagged(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Inherit from a registered prefab.
    #[must_use]
    pub fn inherits(mut self, base: impl Into<String>) -> Self {
        self.from_prefab = Some(base.into());
        self
    }

    /// Declare a component with its per-entity configuration.
    #[must_use]
    pub fn component(mut self, name: impl Into<String>, config: Value) -> Self {
        self.components.insert(name.into(), config);
        self
    }

    /// Add a child template.
    #[must_use]
    pub fn child(mut self, child: impl Into<EntityRef>) -> Self {
        self.children.push(child.into());
        self
    }
}

/// A component definition: requirements, default configuration, and the
/// setup closure that populates instances.
#[derive(Clone)]
pub struct ComponentDef {
    pub(crate) requires: Vec<String>,
    pub(crate) defaults: Value,
    pub(crate) setup: ComponentSetup,
    /// Transitive requirement closure in dependency order, filled by
    /// [`Registry::optimize`].
    pub(crate) computed_requirements: Vec<String>,
}

impl std::fmt::Debug for ComponentDef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentDef")
            .field("requires", &self.requires)
            .field("defaults", &self.defaults)
            .field("setup", &"<closure>")
            .field("computed_requirements", &self.computed_requirements)
            .finish()
    }
}

impl ComponentDef {
    pub fn new<F>(setup: F) -> Self
    where
        F: Fn(&mut crate::component::Component, &mut crate::engine::Engine) + 'static,
    {
        Self {
            requires: Vec::new(),
            defaults: Value::Null,
            setup: std::rc::Rc::new(setup),
            computed_requirements: Vec::new(),
        }
    }

    /// Declare direct requirements; transitive closure happens in
    /// [`Registry::optimize`].
    #[must_use]
    pub fn requires<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.requires.extend(names.into_iter().map(Into::into));
        self
    }

    /// Default configuration cloned into every instance before per-entity
    /// configuration merges in.
    #[must_use]
    pub fn defaults(mut self, defaults: Value) -> Self {
        self.defaults = defaults;
        self
    }

    /// Declared direct requirements.
    #[must_use]
    pub fn required(&self) -> &[String] {
        &self.requires
    }

    /// The flattened requirement list (empty until optimized).
    #[must_use]
    pub fn computed_requirements(&self) -> &[String] {
        &self.computed_requirements
    }
}

/// A plugin definition: a factory building the instance from its
/// configuration, plus default configuration.
#[derive(Clone)]
pub struct PluginDef {
    pub(crate) build: std::rc::Rc<dyn Fn(&Value) -> Box<dyn Plugin>>,
    pub(crate) defaults: Value,
}

impl std::fmt::Debug for PluginDef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginDef")
            .field("build", &"<closure>")
            .field("defaults", &self.defaults)
            .finish()
    }
}

impl PluginDef {
    pub fn new<F>(build: F) -> Self
    where
        F: Fn(&Value) -> Box<dyn Plugin> + 'static,
    {
        Self {
            build: std::rc::Rc::new(build),
            defaults: Value::Null,
        }
    }

    /// Configuration used when neither the caller nor the engine config
    /// supplies one.
    #[must_use]
    pub fn defaults(mut self, defaults: Value) -> Self {
        self.defaults = defaults;
        self
    }
}

/// A scene: plugin configuration plus the entities to instantiate together.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneDef {
    /// Plugins this scene wants, keyed by name. An empty map falls back to
    /// the engine configuration's global plugin map.
    pub plugins: BTreeMap<String, Value>,
    /// Entities to instantiate, in order.
    pub entities: Vec<EntityRef>,
}

impl SceneDef {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a plugin with its scene-level configuration. `Null` (or an
    /// empty object) means "use the configuration precedence chain".
    #[must_use]
    pub fn plugin(mut self, name: impl Into<String>, config: Value) -> Self {
        self.plugins.insert(name.into(), config);
        self
    }

    /// Add an entity to instantiate when the scene loads.
    #[must_use]
    pub fn entity(mut self, entity: impl Into<EntityRef>) -> Self {
        self.entities.push(entity.into());
        self
    }
}

/// The store of all definitions.
#[derive(Default)]
pub struct Registry {
    components: HashMap<String, ComponentDef>,
    prefabs: HashMap<String, PrefabDef>,
    plugins: HashMap<String, PluginDef>,
    scenes: HashMap<String, SceneDef>,
    optimized: bool,
}

impl Registry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a component definition. Last registration for a name wins.
    pub fn register_component(&mut self, name: impl Into<String>, def: ComponentDef) -> &mut Self {
        self.components.insert(name.into(), def);
        self.optimized = false;
        self
    }

    /// Register a prefab definition.
    pub fn register_prefab(&mut self, name: impl Into<String>, def: PrefabDef) -> &mut Self {
        self.prefabs.insert(name.into(), def);
        self
    }

    /// Register a plugin definition.
    pub fn register_plugin(&mut self, name: impl Into<String>, def: PluginDef) -> &mut Self {
        self.plugins.insert(name.into(), def);
        self
    }

    /// Register a scene definition.
    pub fn register_scene(&mut self, name: impl Into<String>, def: SceneDef) -> &mut Self {
        self.scenes.insert(name.into(), def);
        self
    }

    pub fn component(&self, name: &str) -> Result<&ComponentDef, RegistryError> {
        self.components
            .get(name)
            .ok_or_else(|| RegistryError::ComponentNotFound(name.to_string()))
    }

    pub fn prefab(&self, name: &str) -> Result<&PrefabDef, RegistryError> {
        self.prefabs
            .get(name)
            .ok_or_else(|| RegistryError::PrefabNotFound(name.to_string()))
    }

    pub fn plugin(&self, name: &str) -> Result<&PluginDef, RegistryError> {
        self.plugins
            .get(name)
            .ok_or_else(|| RegistryError::PluginNotFound(name.to_string()))
    }

    pub fn scene(&self, name: &str) -> Result<&SceneDef, RegistryError> {
        self.scenes
            .get(name)
            .ok_or_else(|| RegistryError::SceneNotFound(name.to_string()))
    }

    #[must_use]
    pub fn has_component(&self, name: &str) -> bool {
        self.components.contains_key(name)
    }

    #[must_use]
    pub fn has_prefab(&self, name: &str) -> bool {
        self.prefabs.contains_key(name)
    }

    /// Flatten every component definition's transitive requirements into a
    /// direct, dependency-ordered list. Idempotent; the engine runs it on
    /// first initialization. Fails on requirements that name unregistered
    /// components and on requirement cycles.
    pub fn optimize(&mut self) -> Result<(), RegistryError> {
        if self.optimized {
            return Ok(());
        }

        let names: Vec<String> = self.components.keys().cloned().collect();
        for name in &names {
            let mut order = Vec::new();
            let mut stack = Vec::new();
            self.resolve_requirements(name, &mut order, &mut stack)?;
            // The component itself lands last in its own post-order.
            order.pop();
            if let Some(def) = self.components.get_mut(name) {
                def.computed_requirements = order;
            }
        }

        self.optimized = true;
        Ok(())
    }

    /// Depth-first post-order walk: dependencies land before dependents,
    /// each name at most once.
    fn resolve_requirements(
        &self,
        name: &str,
        order: &mut Vec<String>,
        stack: &mut Vec<String>,
    ) -> Result<(), RegistryError> {
        if order.iter().any(|n| n == name) {
            return Ok(());
        }
        if stack.iter().any(|n| n == name) {
            return Err(RegistryError::CircularRequirement(name.to_string()));
        }

        let def = self.component(name)?;
        stack.push(name.to_string());
        for requirement in &def.requires {
            self.resolve_requirements(requirement, order, stack)?;
        }
        stack.pop();
        order.push(name.to_string());
        Ok(())
    }

    /// Whether the optimize pass has run since the last component
    /// registration.
    #[must_use]
    pub fn is_optimized(&self) -> bool {
        self.optimized
    }
}
