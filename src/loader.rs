//! Building a session namespace from configuration sections.
//!
//! The [`Loader`] drives the whole sequence:
//!
//! 1. look up each section's plugin type and priority,
//! 2. order sections by descending priority, stable for ties,
//! 3. construct each plugin and produce its objects inside [`safe_load`],
//! 4. bind the objects into the [`ObjectRegistry`],
//! 5. hand the group to every plugin constructed earlier, in construction
//!    order, each delivery isolated from the others,
//! 6. append the plugin to the observers.
//!
//! Nothing in the sequence aborts it. A failing section leaves a gap in the
//! namespace and an error in the log.
//!
//! # Example
//!
//! ```
//! use daq_loader::prelude::*;
//!
//! let modules = ModuleRegistry::new()
//!     .with_module(Module::new("hutch.beamline").with_value("sam_x", 1.5_f64));
//! let loader = Loader::new(PluginRegistry::with_builtins(), &modules);
//!
//! let session = loader.load_yaml("load: hutch.beamline").unwrap();
//! assert_eq!(session.objects.get("sam_x").and_then(|o| o.downcast_ref::<f64>()), Some(&1.5));
//! ```
//!
//! [`safe_load`]: crate::safe_load::safe_load

use crate::config::LoaderConfig;
use crate::error::{LoadError, LoadResult};
use crate::info::Info;
use crate::module::ModuleRegistry;
use crate::namespace::Namespace;
use crate::object::{Object, ObjectGroup};
use crate::plugin::{Plugin, PluginRegistry, PluginSpec};
use crate::resolver::Resolver;
use crate::safe_load::{catch_panics, safe_load};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// What happens when a plugin binds a name an earlier plugin already bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollisionPolicy {
    /// The later binding wins. Logged as a warning and recorded.
    #[default]
    Replace,
    /// The earlier binding is kept and the later object dropped. Logged as an
    /// error and recorded; hooks never see the dropped object.
    Reject,
}

/// A name bound by more than one plugin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collision {
    /// Global reference name
    pub name: String,
    /// Section that bound it first
    pub bound_by: String,
    /// Section that tried to bind it again
    pub source: String,
    /// Whether the later binding replaced the earlier one
    pub replaced: bool,
}

#[derive(Debug, Clone)]
struct Binding {
    obj: Object,
    source: String,
}

/// Every name bound so far, in binding order, with the section that bound it.
#[derive(Debug, Clone, Default)]
pub struct ObjectRegistry {
    bindings: IndexMap<String, Binding>,
    policy: CollisionPolicy,
}

impl ObjectRegistry {
    /// Empty registry applying `policy` to rebinding.
    pub fn new(policy: CollisionPolicy) -> Self {
        Self {
            bindings: IndexMap::new(),
            policy,
        }
    }

    /// Bind a plugin's group.
    ///
    /// Returns the objects that were actually bound, in production order, and
    /// the collisions that occurred.
    pub fn bind_group(&mut self, source: &str, objs: ObjectGroup) -> (ObjectGroup, Vec<Collision>) {
        let mut bound = ObjectGroup::with_capacity(objs.len());
        let mut collisions = Vec::new();

        for (name, obj) in objs {
            if let Some(existing) = self.bindings.get(&name) {
                let replaced = self.policy == CollisionPolicy::Replace;
                let collision = Collision {
                    name: name.clone(),
                    bound_by: existing.source.clone(),
                    source: source.to_string(),
                    replaced,
                };
                if replaced {
                    tracing::warn!(
                        name = %name,
                        "'{}' from {} replaces the object bound by {}",
                        name,
                        source,
                        collision.bound_by
                    );
                } else {
                    let err = LoadError::NameCollision {
                        name: name.clone(),
                        source_key: source.to_string(),
                        bound_by: collision.bound_by.clone(),
                    };
                    tracing::error!(name = %name, "{}", err);
                    collisions.push(collision);
                    continue;
                }
                collisions.push(collision);
            }

            self.bindings.insert(
                name.clone(),
                Binding {
                    obj: obj.clone(),
                    source: source.to_string(),
                },
            );
            bound.insert(name, obj);
        }

        (bound, collisions)
    }

    /// Look up a bound object.
    pub fn get(&self, name: &str) -> Option<&Object> {
        self.bindings.get(name).map(|b| &b.obj)
    }

    /// Section that bound `name`.
    pub fn source_of(&self, name: &str) -> Option<&str> {
        self.bindings.get(name).map(|b| b.source.as_str())
    }

    /// Names in the order they were first bound.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.bindings.keys().map(String::as_str)
    }

    /// Number of bound names.
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// True if nothing is bound.
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Alphabetical view of everything bound.
    pub fn to_namespace(&self) -> Namespace {
        self.bindings
            .iter()
            .map(|(name, b)| (name.clone(), b.obj.clone()))
            .collect()
    }
}

/// Result of a load.
#[derive(Debug, Clone, Default)]
pub struct LoadedNamespace {
    /// Every bound object, by global name
    pub objects: Namespace,
    /// Objects bound by each section, by section key
    pub groups: BTreeMap<String, Namespace>,
    /// Sections whose plugin was built and produced objects, in construction order
    pub built: Vec<String>,
    /// Sections whose plugin failed to construct or produce objects
    pub failed: Vec<String>,
    /// Sections no plugin is registered for
    pub skipped: Vec<String>,
    /// Names bound by more than one section
    pub collisions: Vec<Collision>,
}

/// Parse a session document into ordered sections.
///
/// The document must be a mapping of section keys to payloads. A section whose
/// key is not a string or whose payload is not a string, sequence or mapping is
/// logged and left out.
pub fn read_conf(yaml: &str) -> LoadResult<IndexMap<String, Info>> {
    let doc: serde_yaml::Value = serde_yaml::from_str(yaml)?;
    let map = match doc {
        serde_yaml::Value::Null => return Ok(IndexMap::new()),
        serde_yaml::Value::Mapping(map) => map,
        other => {
            return Err(LoadError::ConfigShape {
                expected: "mapping of sections",
                found: Info::try_from(other).map(|i| i.kind()).unwrap_or("scalar"),
            });
        }
    };

    let mut sections = IndexMap::with_capacity(map.len());
    for (key, value) in map {
        let Some(key) = key.as_str().map(str::to_string) else {
            tracing::error!("Skipping section with non-string key {:?}", key);
            continue;
        };
        match Info::try_from(value) {
            Ok(info) => {
                sections.insert(key, info);
            }
            Err(err) => tracing::error!(source = %key, "Skipping section {}: {}", key, err),
        }
    }
    Ok(sections)
}

/// Runs the plugin sequence against a module registry.
pub struct Loader<'m> {
    plugins: PluginRegistry,
    resolver: Resolver<'m>,
    policy: CollisionPolicy,
}

impl<'m> Loader<'m> {
    /// Loader with the default search path and collision policy.
    pub fn new(plugins: PluginRegistry, modules: &'m ModuleRegistry) -> Self {
        Self {
            plugins,
            resolver: Resolver::new(modules),
            policy: CollisionPolicy::default(),
        }
    }

    /// Loader configured from [`LoaderConfig`].
    pub fn from_config(
        plugins: PluginRegistry,
        modules: &'m ModuleRegistry,
        config: &LoaderConfig,
    ) -> Self {
        Self {
            plugins,
            resolver: Resolver::new(modules)
                .with_search_path(config.resolver_search_path()),
            policy: config.collision_policy,
        }
    }

    /// Set the collision policy.
    pub fn with_collision_policy(mut self, policy: CollisionPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// The resolver handed to plugins.
    pub fn resolver(&self) -> &Resolver<'m> {
        &self.resolver
    }

    /// The registered plugin types.
    pub fn plugins(&self) -> &PluginRegistry {
        &self.plugins
    }

    /// Turn sections into specs in construction order.
    ///
    /// Returns the specs and the keys of sections nobody handles.
    pub fn plan<I>(&self, sections: I) -> (Vec<PluginSpec>, Vec<String>)
    where
        I: IntoIterator<Item = (String, Info)>,
    {
        let mut specs = Vec::new();
        let mut unknown = Vec::new();
        for (source, info) in sections {
            match self.plugins.get(&source) {
                Some(descriptor) => specs.push(PluginSpec {
                    priority: descriptor.priority(),
                    source,
                    info,
                }),
                None => {
                    let err = LoadError::UnknownPlugin(source.clone());
                    tracing::error!(source = %source, "{}", err);
                    unknown.push(source);
                }
            }
        }
        PluginSpec::sort_by_priority(&mut specs);
        (specs, unknown)
    }

    /// Parse a YAML session document and load it.
    pub fn load_yaml(&self, yaml: &str) -> LoadResult<LoadedNamespace> {
        Ok(self.load(read_conf(yaml)?))
    }

    /// Build every section's plugin and assemble the namespace.
    pub fn load<I>(&self, sections: I) -> LoadedNamespace
    where
        I: IntoIterator<Item = (String, Info)>,
    {
        let (specs, skipped) = self.plan(sections);
        let mut registry = ObjectRegistry::new(self.policy);
        let mut observers: Vec<(String, Box<dyn Plugin>)> = Vec::new();
        let mut loaded = LoadedNamespace {
            skipped,
            ..LoadedNamespace::default()
        };

        for spec in specs {
            let PluginSpec { source, info, .. } = spec;
            let built = safe_load(&source, None, || self.build(&source, info));
            let Some((plugin, objs)) = built else {
                loaded.failed.push(source);
                continue;
            };

            let (bound, collisions) = registry.bind_group(&source, objs);
            loaded.collisions.extend(collisions);

            for (observer_source, observer) in observers.iter_mut() {
                deliver(observer_source, observer.as_mut(), &source, &bound);
            }

            loaded
                .groups
                .entry(source.clone())
                .or_default()
                .extend(bound);
            loaded.built.push(source.clone());
            observers.push((source, plugin));
        }

        loaded.objects = registry.to_namespace();
        tracing::debug!(
            objects = loaded.objects.len(),
            failed = loaded.failed.len(),
            "Namespace assembled"
        );
        loaded
    }

    fn build(&self, source: &str, info: Info) -> LoadResult<(Box<dyn Plugin>, ObjectGroup)> {
        let descriptor = self
            .plugins
            .get(source)
            .ok_or_else(|| LoadError::UnknownPlugin(source.to_string()))?;

        let mut plugin = descriptor
            .construct(info)
            .map_err(|err| LoadError::PluginConstruction {
                source_key: source.to_string(),
                message: err.to_string(),
            })?;

        let objs = plugin
            .get_objects(&self.resolver)
            .map_err(|err| LoadError::ObjectProduction {
                source_key: source.to_string(),
                message: err.to_string(),
            })?;

        Ok((plugin, objs))
    }
}

fn deliver(observer_source: &str, observer: &mut dyn Plugin, source: &str, objs: &ObjectGroup) {
    let label = format!("{} hook", observer_source);
    let result = catch_panics(&label, || observer.future_plugin_hook(source, objs));
    if let Err(err) = result {
        let err = LoadError::Hook {
            observer: observer_source.to_string(),
            source_key: source.to_string(),
            message: err.to_string(),
        };
        tracing::error!(observer = %observer_source, "{}", err);
    }
}
