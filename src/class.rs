//! Class definitions and extension
//!
//! A [`Class`] is an immutable definition: an optional parent link plus
//! flattened method and data-property tables. [`Class::extend`] produces a
//! child class from an insertion-ordered [`Properties`] map; overrides
//! marked with [`Properties::delegating`] capture the base implementation
//! of the same name at extension time and receive it through a per-call
//! [`Super`] context, so delegation is exact across chains of any depth
//! with no shared mutable state.
//!
//! Extension never constructs instances: the tables are copied, so there is
//! no seeding instantiation and `initialize` runs exactly once, on
//! [`Class::construct`].

use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{RuntimeError, RuntimeResult};
use crate::instance::Instance;
use crate::value::Value;

pub(crate) const INITIALIZE: &str = "initialize";

type MethodBody = Arc<dyn Fn(&Instance, &Super, &[Value]) -> RuntimeResult<Value> + Send + Sync>;
type BoundFn = dyn Fn(&Instance, &[Value]) -> RuntimeResult<Value> + Send + Sync;

/// The delegation context passed to every method body.
///
/// For a method registered with [`Properties::delegating`], [`Super::call`]
/// invokes the base implementation captured when the override was defined.
/// For plain methods, and for delegating overrides whose base had no
/// callable of that name, the context is empty and `call` fails with a
/// `TypeError`.
pub struct Super {
    name: Arc<str>,
    base: Option<BoundMethod>,
}

impl Super {
    /// Invoke the enclosing override's base implementation.
    pub fn call(&self, this: &Instance, args: &[Value]) -> RuntimeResult<Value> {
        match &self.base {
            Some(method) => method.invoke(this, args),
            None => Err(RuntimeError::type_error(format!(
                "`{}` has no base implementation to delegate to",
                self.name
            ))),
        }
    }

    /// True if a base implementation was captured.
    pub fn is_available(&self) -> bool {
        self.base.is_some()
    }
}

impl fmt::Debug for Super {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Super")
            .field("name", &self.name)
            .field("available", &self.base.is_some())
            .finish()
    }
}

/// A method as stored in a class table: the body closed over its captured
/// base implementation, invocable with just a receiver and arguments.
#[derive(Clone)]
pub struct BoundMethod {
    name: Arc<str>,
    func: Arc<BoundFn>,
}

impl BoundMethod {
    fn new(name: Arc<str>, body: MethodBody, base: Option<BoundMethod>) -> Self {
        let func: Arc<BoundFn> = {
            let name = Arc::clone(&name);
            Arc::new(move |this: &Instance, args: &[Value]| {
                let context = Super {
                    name: Arc::clone(&name),
                    base: base.clone(),
                };
                body(this, &context, args)
            })
        };
        Self { name, func }
    }

    /// The name this method is bound under
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Invoke with a receiver and arguments
    pub fn invoke(&self, this: &Instance, args: &[Value]) -> RuntimeResult<Value> {
        (self.func)(this, args)
    }
}

impl fmt::Debug for BoundMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundMethod")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

enum Member {
    Value(Value),
    Method(MethodBody),
    Delegating(MethodBody),
}

/// The insertion-ordered map of properties handed to [`Class::extend`].
///
/// A name defined as a data property shadows any inherited method of the
/// same name, and vice versa, reproducing plain assignment onto a
/// definition table.
#[derive(Default)]
pub struct Properties {
    entries: IndexMap<String, Member>,
}

impl Properties {
    /// Empty map
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a data property.
    pub fn value(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.entries.insert(name.into(), Member::Value(value.into()));
        self
    }

    /// Add a plain method. Its [`Super`] context is always empty.
    pub fn method<F>(mut self, name: impl Into<String>, body: F) -> Self
    where
        F: Fn(&Instance, &Super, &[Value]) -> RuntimeResult<Value> + Send + Sync + 'static,
    {
        self.entries.insert(name.into(), Member::Method(Arc::new(body)));
        self
    }

    /// Add an override explicitly marked as delegating: the base class's
    /// implementation of `name`, if it has one, is captured for the body to
    /// invoke through [`Super::call`].
    pub fn delegating<F>(mut self, name: impl Into<String>, body: F) -> Self
    where
        F: Fn(&Instance, &Super, &[Value]) -> RuntimeResult<Value> + Send + Sync + 'static,
    {
        self.entries
            .insert(name.into(), Member::Delegating(Arc::new(body)));
        self
    }
}

impl fmt::Debug for Properties {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.entries.keys()).finish()
    }
}

/// An immutable class definition
#[derive(Clone)]
pub struct Class(Arc<ClassInner>);

struct ClassInner {
    parent: Option<Class>,
    methods: FxHashMap<String, BoundMethod>,
    values: FxHashMap<String, Value>,
}

impl Class {
    /// The primordial base class: no parent, empty tables. Every extension
    /// chain starts here.
    pub fn root() -> Self {
        Self(Arc::new(ClassInner {
            parent: None,
            methods: FxHashMap::default(),
            values: FxHashMap::default(),
        }))
    }

    /// Produce a child class from a map of properties and overrides.
    ///
    /// The parent's flattened tables are copied, then each entry is applied
    /// in insertion order. An empty map yields a class behaviorally
    /// identical to the parent aside from identity. The result supports
    /// `extend` in turn, to arbitrary depth.
    pub fn extend(&self, properties: Properties) -> Class {
        let mut methods = self.0.methods.clone();
        let mut values = self.0.values.clone();
        for (name, member) in properties.entries {
            match member {
                Member::Value(value) => {
                    methods.remove(&name);
                    values.insert(name, value);
                }
                Member::Method(body) => {
                    values.remove(&name);
                    let bound_name: Arc<str> = Arc::from(name.as_str());
                    methods.insert(name, BoundMethod::new(bound_name, body, None));
                }
                Member::Delegating(body) => {
                    values.remove(&name);
                    let base = methods.get(&name).cloned();
                    let bound_name: Arc<str> = Arc::from(name.as_str());
                    methods.insert(name, BoundMethod::new(bound_name, body, base));
                }
            }
        }
        Class(Arc::new(ClassInner {
            parent: Some(self.clone()),
            methods,
            values,
        }))
    }

    /// Build an instance.
    ///
    /// The instance starts with the default listener threshold, then
    /// `initialize` is invoked with `args` iff the table has one. This is
    /// the only path that runs `initialize`.
    pub fn construct(&self, args: &[Value]) -> RuntimeResult<Instance> {
        let instance = Instance::bare(self.clone());
        if let Some(init) = self.method(INITIALIZE) {
            init.invoke(&instance, args)?;
        }
        Ok(instance)
    }

    /// The class this one extends, if any
    pub fn parent(&self) -> Option<&Class> {
        self.0.parent.as_ref()
    }

    /// Look up a method in the flattened table.
    pub fn method(&self, name: &str) -> Option<BoundMethod> {
        self.0.methods.get(name).cloned()
    }

    /// Look up a class-level data property.
    pub fn value(&self, name: &str) -> Option<Value> {
        self.0.values.get(name).cloned()
    }

    /// Identity comparison
    pub fn ptr_eq(&self, other: &Class) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Class")
            .field("methods", &self.0.methods.len())
            .field("values", &self.0.values.len())
            .field("has_parent", &self.0.parent.is_some())
            .finish()
    }
}
