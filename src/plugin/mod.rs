//! Plugin contract for configuration sections.
//!
//! Every top-level section of a session file is handled by a plugin that
//! turns the section payload into named objects. Plugins are built in
//! descending [`PluginType::PRIORITY`] order (declaration order breaks ties),
//! and each one observes the objects of every plugin built *after* it through
//! its hooks. It never sees its own objects or those of earlier plugins.
//!
//! # Example
//!
//! ```
//! use daq_loader::prelude::*;
//!
//! struct Hutch {
//!     info: Info,
//! }
//!
//! impl PluginType for Hutch {
//!     const PRIORITY: i32 = 10;
//!
//!     fn new(info: Info) -> LoadResult<Self> {
//!         Ok(Self { info })
//!     }
//! }
//!
//! impl Plugin for Hutch {
//!     fn get_objects(&mut self, _resolver: &Resolver<'_>) -> LoadResult<ObjectGroup> {
//!         let mut objs = ObjectGroup::new();
//!         objs.insert("hutch".into(), Object::new(self.info.as_text()?.to_string()));
//!         Ok(objs)
//!     }
//! }
//!
//! let mut plugins = PluginRegistry::new();
//! plugins.register::<Hutch>("hutch");
//! assert_eq!(plugins.get("hutch").map(|d| d.priority()), Some(10));
//! ```

pub mod load;

use crate::error::LoadResult;
use crate::info::Info;
use crate::object::{Object, ObjectGroup};
use crate::resolver::Resolver;
use std::collections::HashMap;
use std::fmt;

pub use load::LoadPlugin;

/// A constructed section handler.
pub trait Plugin {
    /// Build this section's objects, keyed by global reference name.
    ///
    /// May use `resolver` to look objects up by string. Must not mutate
    /// objects it did not create.
    fn get_objects(&mut self, resolver: &Resolver<'_>) -> LoadResult<ObjectGroup>;

    /// Called for every object a later plugin binds into the namespace.
    ///
    /// Does nothing by default.
    fn future_object_hook(&mut self, name: &str, obj: &Object) -> LoadResult<()> {
        let _ = (name, obj);
        Ok(())
    }

    /// Called once with the whole output of each later plugin.
    ///
    /// `source` is the configuration key of that plugin's section. The default
    /// forwards each entry, in production order, to
    /// [`Plugin::future_object_hook`]. Override it to react to a group as a
    /// whole, e.g. to spot a particular combination of names.
    fn future_plugin_hook(&mut self, source: &str, objs: &ObjectGroup) -> LoadResult<()> {
        let _ = source;
        for (name, obj) in objs {
            self.future_object_hook(name, obj)?;
        }
        Ok(())
    }
}

/// A plugin type that can be registered for a section key.
pub trait PluginType: Plugin + Sized + 'static {
    /// Higher priorities are constructed first.
    const PRIORITY: i32 = 0;

    /// Store the section payload. No resolution happens here.
    fn new(info: Info) -> LoadResult<Self>;
}

type Constructor = Box<dyn Fn(Info) -> LoadResult<Box<dyn Plugin>>>;

/// How to build the plugin for one section key.
pub struct PluginDescriptor {
    priority: i32,
    type_name: &'static str,
    constructor: Constructor,
}

impl PluginDescriptor {
    /// Descriptor for a [`PluginType`].
    pub fn of<P: PluginType>() -> Self {
        Self {
            priority: P::PRIORITY,
            type_name: std::any::type_name::<P>(),
            constructor: Box::new(|info: Info| Ok(Box::new(P::new(info)?) as Box<dyn Plugin>)),
        }
    }

    /// Descriptor from a constructor function.
    pub fn from_fn<F>(priority: i32, type_name: &'static str, constructor: F) -> Self
    where
        F: Fn(Info) -> LoadResult<Box<dyn Plugin>> + 'static,
    {
        Self {
            priority,
            type_name,
            constructor: Box::new(constructor),
        }
    }

    /// Construction priority.
    pub fn priority(&self) -> i32 {
        self.priority
    }

    /// Name of the plugin type, for logs.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Build a plugin instance from its section payload.
    pub fn construct(&self, info: Info) -> LoadResult<Box<dyn Plugin>> {
        (self.constructor)(info)
    }
}

impl fmt::Debug for PluginDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginDescriptor")
            .field("priority", &self.priority)
            .field("type_name", &self.type_name)
            .finish_non_exhaustive()
    }
}

/// Section key to plugin descriptor.
#[derive(Debug, Default)]
pub struct PluginRegistry {
    descriptors: HashMap<String, PluginDescriptor>,
}

impl PluginRegistry {
    /// Registry with no plugins.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the plugins shipped in this crate (`load`).
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register::<LoadPlugin>(LoadPlugin::SOURCE);
        registry
    }

    /// Handle sections named `source` with plugin type `P`.
    pub fn register<P: PluginType>(&mut self, source: impl Into<String>) -> &mut Self {
        self.insert(source, PluginDescriptor::of::<P>())
    }

    /// Handle sections named `source` with an explicit descriptor.
    pub fn insert(&mut self, source: impl Into<String>, descriptor: PluginDescriptor) -> &mut Self {
        let source = source.into();
        if let Some(previous) = self.descriptors.insert(source.clone(), descriptor) {
            tracing::warn!(
                source = %source,
                "Replacing plugin {} registered for '{}'",
                previous.type_name(),
                source
            );
        }
        self
    }

    /// Descriptor for a section key.
    pub fn get(&self, source: &str) -> Option<&PluginDescriptor> {
        self.descriptors.get(source)
    }

    /// True if a plugin handles `source`.
    pub fn contains(&self, source: &str) -> bool {
        self.descriptors.contains_key(source)
    }

    /// Registered section keys, sorted.
    pub fn sources(&self) -> Vec<&str> {
        let mut sources: Vec<&str> = self.descriptors.keys().map(String::as_str).collect();
        sources.sort_unstable();
        sources
    }
}

/// One top-level configuration entry, ready to be built.
#[derive(Debug, Clone, PartialEq)]
pub struct PluginSpec {
    /// Section key, which selects the plugin type and names the object group
    pub source: String,
    /// Section payload, passed through unmodified
    pub info: Info,
    /// Construction priority of the plugin type
    pub priority: i32,
}

impl PluginSpec {
    /// Sort specs by descending priority, keeping declaration order for ties.
    pub fn sort_by_priority(specs: &mut [PluginSpec]) {
        specs.sort_by(|a, b| b.priority.cmp(&a.priority));
    }
}
