//! String-to-object resolution.
//!
//! Configuration refers to objects by string in one of four forms:
//!
//! | Form            | Meaning                                                  |
//! |-----------------|----------------------------------------------------------|
//! | `a.b.c`         | module `a.b.c`, or attribute `c` of module `a.b`         |
//! | `a.b.c.py`      | same, written as a file name                             |
//! | `a.b.c()`       | attribute `c` of module `a.b`, called with no arguments  |
//! | `Name`          | class in scope, or in one of the default namespaces      |
//!
//! Every component must be an identifier. There is no expression evaluation:
//! a bare name is looked up, never executed.

use crate::error::{LoadError, LoadResult};
use crate::module::ModuleRegistry;
use crate::object::{ClassHandle, Object, ObjectGroup};
use std::fmt;
use std::str::FromStr;

/// Namespaces searched, in order, for bare class names not found in scope.
pub const DEFAULT_CLASS_SEARCH_PATH: &[&str] = &["pcdsdevices.device_types"];

const SOURCE_SUFFIX: &str = ".py";
const CALL_MARKER: &str = "()";

/// True for `[A-Za-z_][A-Za-z0-9_]*`.
pub fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// True for one or more identifiers joined by `.`.
pub fn is_dotted_path(s: &str) -> bool {
    !s.is_empty() && s.split('.').all(is_identifier)
}

/// A parsed resolver specifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Specifier {
    path: String,
    invoke: bool,
}

impl Specifier {
    /// Parse `path`, `path.py` or `path()`.
    pub fn parse(input: &str) -> LoadResult<Self> {
        let trimmed = input.trim();
        let (path, invoke) = if let Some(path) = trimmed.strip_suffix(SOURCE_SUFFIX) {
            (path, false)
        } else if let Some(path) = trimmed.strip_suffix(CALL_MARKER) {
            (path, true)
        } else {
            (trimmed, false)
        };

        if !is_dotted_path(path) {
            return Err(LoadError::InvalidSpecifier {
                specifier: input.to_string(),
                reason: "expected identifiers separated by '.'".to_string(),
            });
        }

        Ok(Self {
            path: path.to_string(),
            invoke,
        })
    }

    /// The dotted path with any suffix removed.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// True if the resolved object should be called.
    pub fn invoke(&self) -> bool {
        self.invoke
    }

    /// Last dotted component, the name a single object is bound under.
    pub fn base_name(&self) -> &str {
        self.path.rsplit('.').next().unwrap_or(&self.path)
    }
}

impl FromStr for Specifier {
    type Err = LoadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Specifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.invoke {
            write!(f, "{}{}", self.path, CALL_MARKER)
        } else {
            f.write_str(&self.path)
        }
    }
}

/// Resolves specifiers against a [`ModuleRegistry`].
///
/// The resolver holds no state besides the search path; every call goes back
/// to the registry.
pub struct Resolver<'r> {
    registry: &'r ModuleRegistry,
    search_path: Vec<String>,
}

impl<'r> Resolver<'r> {
    /// Resolver using [`DEFAULT_CLASS_SEARCH_PATH`].
    pub fn new(registry: &'r ModuleRegistry) -> Self {
        Self {
            registry,
            search_path: DEFAULT_CLASS_SEARCH_PATH
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }

    /// Replace the class search path.
    pub fn with_search_path<I, S>(mut self, search_path: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.search_path = search_path.into_iter().map(Into::into).collect();
        self
    }

    /// Namespaces searched for bare class names.
    pub fn search_path(&self) -> &[String] {
        &self.search_path
    }

    /// The registry resolution runs against.
    pub fn registry(&self) -> &'r ModuleRegistry {
        self.registry
    }

    /// Resolve a specifier into named objects, absorbing every failure.
    ///
    /// A module yields its exported (or public) attributes. Otherwise the
    /// last component is looked up as an attribute of the rest, called first
    /// if the specifier ends in `()`, and bound under that last component.
    /// Failures are logged and produce an empty group.
    pub fn resolve_module(&self, specifier: &str) -> ObjectGroup {
        match self.try_resolve_module(specifier) {
            Ok(objs) => objs,
            Err(err) => {
                tracing::error!(specifier, "Error loading {}", specifier);
                tracing::debug!(error = ?err, "{}", err);
                ObjectGroup::new()
            }
        }
    }

    fn try_resolve_module(&self, specifier: &str) -> LoadResult<ObjectGroup> {
        let spec = Specifier::parse(specifier)?;
        let mut objs = ObjectGroup::new();

        let module = match self.registry.import(spec.path()) {
            Ok(module) => module,
            Err(LoadError::ModuleNotFound(_)) => {
                let obj = self.resolve_attribute(spec.path())?;
                let name = spec.base_name();
                let obj = if spec.invoke() { obj.call(name)? } else { obj };
                objs.insert(name.to_string(), obj);
                return Ok(objs);
            }
            Err(err) => return Err(err),
        };

        for attr in module.public_names() {
            let obj = module
                .get(&attr)
                .cloned()
                .ok_or_else(|| LoadError::AttributeNotFound {
                    module: module.path().to_string(),
                    attribute: attr.clone(),
                })?;
            objs.insert(attr, obj);
        }
        Ok(objs)
    }

    /// Import the module part of `dotted_path` and return its last attribute.
    ///
    /// When the module has no such attribute but `dotted_path` is itself an
    /// importable module, that submodule is returned as [`Object::Module`].
    /// Failures are returned, not logged.
    pub fn resolve_attribute(&self, dotted_path: &str) -> LoadResult<Object> {
        if !is_dotted_path(dotted_path) {
            return Err(LoadError::InvalidSpecifier {
                specifier: dotted_path.to_string(),
                reason: "expected identifiers separated by '.'".to_string(),
            });
        }
        let (module_path, attribute) = dotted_path
            .rsplit_once('.')
            .ok_or_else(|| LoadError::InvalidSpecifier {
                specifier: dotted_path.to_string(),
                reason: "no module portion before the attribute name".to_string(),
            })?;

        let found = self.registry.import(module_path).and_then(|module| {
            module
                .get(attribute)
                .cloned()
                .ok_or_else(|| LoadError::AttributeNotFound {
                    module: module_path.to_string(),
                    attribute: attribute.to_string(),
                })
        });

        match found {
            Err(err) if err.is_import_failure() => match self.registry.import(dotted_path) {
                Ok(submodule) => Ok(Object::Module(submodule)),
                Err(_) => Err(err),
            },
            other => other,
        }
    }

    /// Resolve a class from a dotted path or a bare name.
    ///
    /// A bare name is looked up in the registry scope first. If it is not
    /// there and `search_defaults` is set, each search-path namespace is tried
    /// in order; when none defines it the result is
    /// [`LoadError::UndefinedName`]. Failures are returned, not logged.
    pub fn resolve_class(
        &self,
        name_or_path: &str,
        search_defaults: bool,
    ) -> LoadResult<ClassHandle> {
        let found = if name_or_path.contains('.') {
            self.resolve_attribute(name_or_path)
        } else {
            self.lookup_name(name_or_path)
        };

        match found {
            Ok(obj) => into_class(name_or_path, obj),
            Err(LoadError::UndefinedName(name)) if search_defaults => {
                for namespace in &self.search_path {
                    let candidate = format!("{}.{}", namespace, name);
                    match self.resolve_class(&candidate, false) {
                        Ok(class) => return Ok(class),
                        Err(err) if err.is_import_failure() => {
                            tracing::trace!(candidate = %candidate, "{}", err);
                        }
                        Err(err) => return Err(err),
                    }
                }
                Err(LoadError::UndefinedName(name))
            }
            Err(err) => Err(err),
        }
    }

    fn lookup_name(&self, name: &str) -> LoadResult<Object> {
        if !is_identifier(name) {
            return Err(LoadError::InvalidSpecifier {
                specifier: name.to_string(),
                reason: "a bare class name must be a single identifier".to_string(),
            });
        }
        self.registry
            .lookup_name(name)
            .ok_or_else(|| LoadError::UndefinedName(name.to_string()))
    }
}

fn into_class(path: &str, obj: Object) -> LoadResult<ClassHandle> {
    match obj {
        Object::Class(class) => Ok(class),
        other => Err(LoadError::NotAClass {
            path: path.to_string(),
            kind: other.kind(),
        }),
    }
}
