//! # DAQ Session Loader
//!
//! This crate assembles the namespace of an interactive beamline session from a
//! YAML configuration file. Each top-level section of the file is handled by a
//! plugin that turns the section payload into named objects, and plugins can
//! observe the objects every later plugin adds. Objects are located by string
//! through an explicit registry of modules instead of by runtime reflection.
//!
//! ## Crate Structure
//!
//! - **`config`**: Loader settings (log level, collision policy, class search path)
//!   layered from defaults, TOML and environment with `figment`.
//! - **`error`**: The `LoadError` enum used across the crate.
//! - **`experiment`**: Runs the external lookup of a hutch's current experiment.
//! - **`info`**: Section payload shapes.
//! - **`loader`**: Orders plugins, builds them fail-soft, binds their objects and
//!   fans hooks out to earlier plugins.
//! - **`logging`**: `tracing` subscriber setup and the SUCCESS severity.
//! - **`module`**: Modules and the `ModuleRegistry` that imports them.
//! - **`namespace`**: Attribute-style container that iterates alphabetically.
//! - **`object`**: Type-erased session objects.
//! - **`plugin`**: The plugin contract, registry and the built-in `load` plugin.
//! - **`resolver`**: Specifier parsing and object, attribute and class lookup.
//! - **`safe_load`**: Fail-soft execution of one named load step.

pub mod config;
pub mod error;
pub mod experiment;
pub mod info;
pub mod loader;
pub mod logging;
pub mod module;
pub mod namespace;
pub mod object;
pub mod plugin;
pub mod resolver;
pub mod safe_load;

pub use error::{LoadError, LoadResult};
pub use loader::{read_conf, CollisionPolicy, LoadedNamespace, Loader};
pub use namespace::Namespace;
pub use resolver::Resolver;
pub use safe_load::safe_load;

#[doc(hidden)]
pub use tracing as __tracing;

/// Everything needed to write a plugin or drive a load.
pub mod prelude {
    pub use crate::error::{LoadError, LoadResult};
    pub use crate::info::Info;
    pub use crate::loader::{read_conf, CollisionPolicy, LoadedNamespace, Loader};
    pub use crate::module::{Module, ModuleLoader, ModuleRegistry};
    pub use crate::namespace::Namespace;
    pub use crate::object::{ClassHandle, Object, ObjectGroup};
    pub use crate::plugin::{LoadPlugin, Plugin, PluginRegistry, PluginType};
    pub use crate::resolver::Resolver;
    pub use crate::safe_load::safe_load;
}
