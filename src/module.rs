//! Modules and the registry that stands in for an import cache.
//!
//! There is no reflection to turn `"pcdsdevices.device_types"` into code, so
//! everything resolvable by string is registered up front in a
//! [`ModuleRegistry`]. The registry is owned by whoever drives the load and
//! passed by reference to the resolver. Nothing here is process-wide.
//!
//! # Security boundary
//!
//! Configuration strings can only ever reach objects that were explicitly
//! registered as module attributes, placed in the registry scope, or produced
//! by an installed [`ModuleLoader`]. A loader is the only place arbitrary code
//! runs in response to a string, so install loaders only for sources you trust.

use crate::error::{LoadError, LoadResult};
use crate::object::{ClassHandle, Object};
use indexmap::IndexMap;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A named table of attributes addressable by dotted path.
#[derive(Debug, Clone)]
pub struct Module {
    path: String,
    attrs: IndexMap<String, Object>,
    exports: Option<Vec<String>>,
}

impl Module {
    /// Create an empty module at `path`, e.g. `pcdsdevices.device_types`.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            attrs: IndexMap::new(),
            exports: None,
        }
    }

    /// Bind an attribute.
    pub fn with_attr(mut self, name: impl Into<String>, obj: impl Into<Object>) -> Self {
        self.attrs.insert(name.into(), obj.into());
        self
    }

    /// Bind a value attribute.
    pub fn with_value<T>(self, name: impl Into<String>, value: T) -> Self
    where
        T: std::any::Any + Send + Sync,
    {
        self.with_attr(name, Object::new(value))
    }

    /// Bind a class under its own name.
    pub fn with_class(self, class: ClassHandle) -> Self {
        let name = class.name().to_string();
        self.with_attr(name, class)
    }

    /// Bind a zero-argument function under `name`.
    pub fn with_function<F>(self, name: impl Into<String>, func: F) -> Self
    where
        F: Fn() -> LoadResult<Object> + Send + Sync + 'static,
    {
        let name = name.into();
        let obj = Object::function(name.clone(), func);
        self.with_attr(name, obj)
    }

    /// Declare the explicit export list; only these names are extracted.
    pub fn with_exports<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exports = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// Dotted path of this module.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Look up an attribute.
    pub fn get(&self, name: &str) -> Option<&Object> {
        self.attrs.get(name)
    }

    /// The explicit export list, if one was declared.
    pub fn exports(&self) -> Option<&[String]> {
        self.exports.as_deref()
    }

    /// Names extracted when the whole module is loaded.
    ///
    /// The export list in its declared order when present, otherwise every
    /// attribute not starting with `_`, sorted by name.
    pub fn public_names(&self) -> Vec<String> {
        match &self.exports {
            Some(exports) => exports.clone(),
            None => {
                let mut names: Vec<String> = self
                    .attrs
                    .keys()
                    .filter(|name| !name.starts_with('_'))
                    .cloned()
                    .collect();
                names.sort();
                names
            }
        }
    }
}

/// Source of modules not registered up front, e.g. a plugin directory.
///
/// `Ok(None)` means "not mine"; an `Err` means the module exists but could not
/// be loaded, and is reported as such.
pub trait ModuleLoader {
    /// Try to produce the module at `path`.
    fn load(&self, path: &str) -> LoadResult<Option<Module>>;
}

impl<F> ModuleLoader for F
where
    F: Fn(&str) -> LoadResult<Option<Module>>,
{
    fn load(&self, path: &str) -> LoadResult<Option<Module>> {
        self(path)
    }
}

/// Registered modules, loaders and the names visible to bare-name lookup.
///
/// Modules produced by a loader are cached, so importing the same path twice
/// runs the loader once.
pub struct ModuleRegistry {
    modules: RefCell<HashMap<String, Arc<Module>>>,
    scope: HashMap<String, Object>,
    loaders: Vec<Box<dyn ModuleLoader>>,
}

impl Default for ModuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ModuleRegistry {
    /// Registry whose scope holds the built-in type names.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        for class in builtin_classes() {
            registry.define(class.name().to_string(), class);
        }
        registry
    }

    /// Registry with nothing in it, not even built-in type names.
    pub fn empty() -> Self {
        Self {
            modules: RefCell::new(HashMap::new()),
            scope: HashMap::new(),
            loaders: Vec::new(),
        }
    }

    /// Register a module under its path, replacing any previous one.
    pub fn register(&self, module: Module) -> Arc<Module> {
        let module = Arc::new(module);
        self.modules
            .borrow_mut()
            .insert(module.path().to_string(), Arc::clone(&module));
        module
    }

    /// Builder form of [`ModuleRegistry::register`].
    pub fn with_module(self, module: Module) -> Self {
        self.register(module);
        self
    }

    /// Make `name` visible to bare-name lookup.
    pub fn define(&mut self, name: impl Into<String>, obj: impl Into<Object>) {
        self.scope.insert(name.into(), obj.into());
    }

    /// Install a loader consulted when a path is not registered.
    pub fn add_loader<L: ModuleLoader + 'static>(&mut self, loader: L) {
        self.loaders.push(Box::new(loader));
    }

    /// Look up a bare name in scope.
    pub fn lookup_name(&self, name: &str) -> Option<Object> {
        self.scope.get(name).cloned()
    }

    /// True if the module at `path` is registered or was already loaded.
    pub fn is_loaded(&self, path: &str) -> bool {
        self.modules.borrow().contains_key(path)
    }

    /// Paths of every registered or loaded module, sorted.
    pub fn loaded_modules(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.modules.borrow().keys().cloned().collect();
        paths.sort();
        paths
    }

    /// Import the module at `path`, consulting loaders on a cache miss.
    pub fn import(&self, path: &str) -> LoadResult<Arc<Module>> {
        if let Some(module) = self.modules.borrow().get(path) {
            return Ok(Arc::clone(module));
        }

        for loader in &self.loaders {
            if let Some(module) = loader.load(path)? {
                tracing::debug!(module = path, "Loaded module from loader");
                let module = Module {
                    path: path.to_string(),
                    ..module
                };
                return Ok(self.register(module));
            }
        }

        Err(LoadError::ModuleNotFound(path.to_string()))
    }
}

impl fmt::Debug for ModuleRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleRegistry")
            .field("modules", &self.loaded_modules())
            .field("scope", &self.scope.len())
            .field("loaders", &self.loaders.len())
            .finish()
    }
}

fn builtin_classes() -> Vec<ClassHandle> {
    vec![
        ClassHandle::constructible::<bool, _>("bool", || Ok(false)),
        ClassHandle::constructible::<i64, _>("int", || Ok(0)),
        ClassHandle::constructible::<f64, _>("float", || Ok(0.0)),
        ClassHandle::constructible::<String, _>("str", || Ok(String::new())),
        ClassHandle::constructible::<Vec<Object>, _>("list", || Ok(Vec::new())),
        ClassHandle::constructible::<IndexMap<String, Object>, _>("dict", || Ok(IndexMap::new())),
    ]
}
