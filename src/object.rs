//! Runtime objects bound into the session namespace.
//!
//! An [`Object`] is a cheap-to-clone handle: plugins hand the same object to the
//! namespace, to their own group, and to every hook observer. Handles are
//! shared read-only; observers receive `&Object` and cannot mutate it.

use crate::error::{LoadError, LoadResult};
use crate::module::Module;
use indexmap::IndexMap;
use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

type Thunk = Arc<dyn Fn() -> LoadResult<Object> + Send + Sync>;

/// Named objects in production order, as returned by a plugin or the resolver.
pub type ObjectGroup = IndexMap<String, Object>;

/// A named type that can be looked up by string and optionally instantiated.
#[derive(Clone)]
pub struct ClassHandle {
    name: String,
    type_id: TypeId,
    type_name: &'static str,
    constructor: Option<Thunk>,
}

impl ClassHandle {
    /// Describe the Rust type `T` under a configuration-facing name.
    pub fn of<T: Any>(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            constructor: None,
        }
    }

    /// Like [`ClassHandle::of`], with a zero-argument constructor.
    pub fn constructible<T, F>(name: impl Into<String>, constructor: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn() -> LoadResult<T> + Send + Sync + 'static,
    {
        let mut class = Self::of::<T>(name);
        class.constructor = Some(Arc::new(move || constructor().map(Object::new)));
        class
    }

    /// Configuration-facing name, e.g. `Device` or `int`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the Rust type this class describes.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// True if this class describes the Rust type `T`.
    pub fn is<T: Any>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }

    /// True if a zero-argument constructor was registered.
    pub fn is_constructible(&self) -> bool {
        self.constructor.is_some()
    }

    /// Build an instance with the registered constructor.
    pub fn instantiate(&self) -> LoadResult<Object> {
        match &self.constructor {
            Some(constructor) => constructor(),
            None => Err(LoadError::NotCallable {
                name: self.name.clone(),
                kind: "class without constructor",
            }),
        }
    }
}

impl PartialEq for ClassHandle {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id && self.name == other.name
    }
}

impl fmt::Debug for ClassHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassHandle")
            .field("name", &self.name)
            .field("type_name", &self.type_name)
            .field("constructible", &self.is_constructible())
            .finish()
    }
}

/// Any object a plugin or the resolver can produce.
#[derive(Clone)]
pub enum Object {
    /// A plain value
    Value {
        /// The shared value
        value: Arc<dyn Any + Send + Sync>,
        /// Rust type name, for logs
        type_name: &'static str,
    },
    /// A class, callable through its constructor
    Class(ClassHandle),
    /// A zero-argument function
    Function {
        /// Name the function was registered under
        name: String,
        /// The callable
        func: Thunk,
    },
    /// A module, e.g. a submodule exported from a package
    Module(Arc<Module>),
}

impl Object {
    /// Wrap a value.
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Object::Value {
            value: Arc::new(value),
            type_name: std::any::type_name::<T>(),
        }
    }

    /// Wrap a zero-argument function.
    pub fn function<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn() -> LoadResult<Object> + Send + Sync + 'static,
    {
        Object::Function {
            name: name.into(),
            func: Arc::new(func),
        }
    }

    /// Short description of the variant, for errors and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Object::Value { .. } => "value",
            Object::Class(_) => "class",
            Object::Function { .. } => "function",
            Object::Module(_) => "module",
        }
    }

    /// Rust type name of a value, or the kind for everything else.
    pub fn type_name(&self) -> &str {
        match self {
            Object::Value { type_name, .. } => *type_name,
            Object::Class(class) => class.name(),
            _ => self.kind(),
        }
    }

    /// Borrow the wrapped value as `T`.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        match self {
            Object::Value { value, .. } => value.downcast_ref::<T>(),
            _ => None,
        }
    }

    /// The class, if this object is one.
    pub fn as_class(&self) -> Option<&ClassHandle> {
        match self {
            Object::Class(class) => Some(class),
            _ => None,
        }
    }

    /// True if [`Object::call`] can succeed on this object.
    pub fn is_callable(&self) -> bool {
        match self {
            Object::Function { .. } => true,
            Object::Class(class) => class.is_constructible(),
            _ => false,
        }
    }

    /// Invoke a function or class constructor with no arguments.
    ///
    /// `name` is only used for the error when the object is not callable.
    pub fn call(&self, name: &str) -> LoadResult<Object> {
        match self {
            Object::Function { func, .. } => func(),
            Object::Class(class) => class.instantiate(),
            other => Err(LoadError::NotCallable {
                name: name.to_string(),
                kind: other.kind(),
            }),
        }
    }

    /// True if both handles point at the same underlying object.
    pub fn ptr_eq(&self, other: &Object) -> bool {
        match (self, other) {
            (Object::Value { value: a, .. }, Object::Value { value: b, .. }) => Arc::ptr_eq(a, b),
            (Object::Function { func: a, .. }, Object::Function { func: b, .. }) => {
                Arc::ptr_eq(a, b)
            }
            (Object::Module(a), Object::Module(b)) => Arc::ptr_eq(a, b),
            (Object::Class(a), Object::Class(b)) => a == b,
            _ => false,
        }
    }
}

impl From<ClassHandle> for Object {
    fn from(class: ClassHandle) -> Self {
        Object::Class(class)
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Object::Value { type_name, .. } => write!(f, "<{}>", type_name),
            Object::Class(class) => write!(f, "<class {}>", class.name()),
            Object::Function { name, .. } => write!(f, "<function {}>", name),
            Object::Module(module) => write!(f, "<module {}>", module.path()),
        }
    }
}
