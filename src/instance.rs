//! Instance handles
//!
//! An [`Instance`] is a cheap-clone shared handle to one object produced by
//! [`Class::construct`](crate::class::Class::construct). It carries the
//! producing class, a field map for per-instance data, and its own listener
//! registry (see [`emitter`](crate::emitter) for the registration and
//! dispatch surface).

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use std::fmt;
use std::sync::Arc;

use crate::class::Class;
use crate::emitter::Registry;
use crate::error::{RuntimeError, RuntimeResult};
use crate::value::Value;

/// A shared handle to one object instance
#[derive(Clone)]
pub struct Instance(Arc<InstanceInner>);

struct InstanceInner {
    class: Class,
    fields: Mutex<FxHashMap<String, Value>>,
    registry: Registry,
}

impl Instance {
    /// Build an instance without running `initialize`. Only
    /// [`Class::construct`](crate::class::Class::construct) calls this.
    pub(crate) fn bare(class: Class) -> Self {
        Self(Arc::new(InstanceInner {
            class,
            fields: Mutex::new(FxHashMap::default()),
            registry: Registry::new(),
        }))
    }

    pub(crate) fn registry(&self) -> &Registry {
        &self.0.registry
    }

    /// The class that produced this instance
    pub fn class(&self) -> &Class {
        &self.0.class
    }

    /// Read a property: instance fields first, then class-level data
    /// properties.
    pub fn get(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.0.fields.lock().get(name) {
            return Some(value.clone());
        }
        self.0.class.value(name)
    }

    /// Write an instance field, shadowing any class-level data property of
    /// the same name.
    pub fn set(&self, name: impl Into<String>, value: impl Into<Value>) -> &Self {
        self.0.fields.lock().insert(name.into(), value.into());
        self
    }

    /// Invoke the named method through the class's method table.
    pub fn call(&self, method: &str, args: &[Value]) -> RuntimeResult<Value> {
        match self.0.class.method(method) {
            Some(bound) => bound.invoke(self, args),
            None => Err(RuntimeError::type_error(format!(
                "`{method}` is not a method of this instance"
            ))),
        }
    }

    /// True if this instance's class is `class` or descends from it.
    pub fn instance_of(&self, class: &Class) -> bool {
        let mut current = Some(self.0.class.clone());
        while let Some(ancestor) = current {
            if ancestor.ptr_eq(class) {
                return true;
            }
            current = ancestor.parent().cloned();
        }
        false
    }

    /// Identity comparison
    pub fn ptr_eq(&self, other: &Instance) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("fields", &self.0.fields.lock().len())
            .finish_non_exhaustive()
    }
}
