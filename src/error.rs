//! Error types for plugin composition and object resolution.
//!
//! `LoadError` is the single error enum of the crate. Which variants reach the
//! caller depends on the operation:
//!
//! - **Absorbed**: anything raised inside [`Resolver::resolve_module`] or inside a
//!   [`safe_load`] scope is logged and converted into an empty result.
//! - **Propagated**: [`Resolver::resolve_attribute`] and [`Resolver::resolve_class`]
//!   return their failures to the calling plugin.
//!
//! Plugin implementations may use `anyhow` internally; an `anyhow::Error`
//! converts into [`LoadError::Other`] through `?`.
//!
//! [`Resolver::resolve_module`]: crate::resolver::Resolver::resolve_module
//! [`Resolver::resolve_attribute`]: crate::resolver::Resolver::resolve_attribute
//! [`Resolver::resolve_class`]: crate::resolver::Resolver::resolve_class
//! [`safe_load`]: crate::safe_load::safe_load

use thiserror::Error;

/// Convenience alias for results using the crate error type.
pub type LoadResult<T> = std::result::Result<T, LoadError>;

/// Primary error type for loading a session namespace.
#[derive(Error, Debug)]
pub enum LoadError {
    /// The specifier does not follow the dotted-identifier grammar.
    #[error("Invalid specifier '{specifier}': {reason}")]
    InvalidSpecifier {
        /// The rejected input
        specifier: String,
        /// What is wrong with it
        reason: String,
    },

    /// No module is registered (or loadable) under this dotted path.
    #[error("No module named '{0}'")]
    ModuleNotFound(String),

    /// The module exists but does not define the requested attribute.
    #[error("Module '{module}' has no attribute '{attribute}'")]
    AttributeNotFound {
        /// Dotted module path that was imported
        module: String,
        /// Attribute that was looked up
        attribute: String,
    },

    /// A bare class name was not in scope and no default namespace defines it.
    #[error("Name '{0}' is not defined")]
    UndefinedName(String),

    /// The path resolved to an object that is not a class.
    #[error("'{path}' resolved to a {kind}, not a class")]
    NotAClass {
        /// The resolved path
        path: String,
        /// Kind of the object that was found
        kind: &'static str,
    },

    /// Invocation was requested on an object that cannot be called.
    #[error("'{name}' is a {kind} and cannot be called")]
    NotCallable {
        /// Name the object was resolved under
        name: String,
        /// Kind of the object
        kind: &'static str,
    },

    /// A configuration section names a plugin type nobody registered.
    #[error("No plugin registered for section '{0}'")]
    UnknownPlugin(String),

    /// The plugin constructor rejected its section payload.
    #[error("Failed to construct plugin '{source_key}': {message}")]
    PluginConstruction {
        /// Configuration key of the section
        source_key: String,
        /// Reason reported by the constructor
        message: String,
    },

    /// `get_objects` failed for a constructed plugin.
    #[error("Plugin '{source_key}' failed to produce objects: {message}")]
    ObjectProduction {
        /// Configuration key of the section
        source_key: String,
        /// Reason reported by the plugin
        message: String,
    },

    /// A hook callback failed while observing another plugin's objects.
    #[error("Hook of plugin '{observer}' failed on objects from '{source_key}': {message}")]
    Hook {
        /// Plugin whose hook failed
        observer: String,
        /// Section whose objects were being delivered
        source_key: String,
        /// Reason reported by the hook
        message: String,
    },

    /// The section payload does not have the shape the plugin expects.
    #[error("Expected {expected} for section payload, found {found}")]
    ConfigShape {
        /// Shape the plugin accepts
        expected: &'static str,
        /// Shape that was supplied
        found: &'static str,
    },

    /// A name was already bound and the collision policy rejects rebinding.
    #[error("Name '{name}' from '{source_key}' is already bound by '{bound_by}'")]
    NameCollision {
        /// Global reference name
        name: String,
        /// Section that tried to rebind it
        source_key: String,
        /// Section that bound it first
        bound_by: String,
    },

    /// Code inside a guarded scope panicked.
    #[error("Panicked while loading {0}")]
    Panicked(String),

    /// Loader configuration could not be read or extracted.
    #[error("Configuration error: {0}")]
    Config(#[from] Box<figment::Error>),

    /// Loader configuration parsed but failed validation.
    #[error("Configuration validation error: {0}")]
    Validation(String),

    /// The YAML session configuration could not be parsed.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Standard I/O failure, e.g. spawning an external command.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An external command ran but exited unsuccessfully.
    #[error("Command '{command}' failed with {status}")]
    Command {
        /// The command line that was run
        command: String,
        /// Exit status description
        status: String,
    },

    /// Any other failure raised by plugin code.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl LoadError {
    /// True for failures of the import step (module or attribute missing).
    pub fn is_import_failure(&self) -> bool {
        matches!(
            self,
            LoadError::ModuleNotFound(_) | LoadError::AttributeNotFound { .. }
        )
    }

    /// True when a bare name could not be found anywhere.
    pub fn is_undefined_name(&self) -> bool {
        matches!(self, LoadError::UndefinedName(_))
    }
}

impl From<figment::Error> for LoadError {
    fn from(err: figment::Error) -> Self {
        LoadError::Config(Box::new(err))
    }
}
