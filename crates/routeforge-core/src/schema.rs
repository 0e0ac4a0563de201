//! Schema registration for documentation tooling.
//!
//! Generated code lists every request body and response type once; the
//! host's schema library decides what to do with each.

use std::any::{TypeId, type_name};

pub trait SchemaRegistry {
    /// Register `rust_type` under the component name `name`.
    fn describe(&mut self, name: &str, type_id: TypeId, rust_type: &'static str);
}

pub fn describe<T: ?Sized + 'static>(registry: &mut dyn SchemaRegistry, name: &str) {
    registry.describe(name, TypeId::of::<T>(), type_name::<T>());
}

/// A [`SchemaRegistry`] that records registrations in order.
#[derive(Debug, Default, Clone)]
pub struct SchemaList {
    entries: Vec<(String, TypeId, &'static str)>,
}

impl SchemaList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _, _)| name.as_str())
    }

    pub fn contains<T: ?Sized + 'static>(&self) -> bool {
        self.entries.iter().any(|(_, id, _)| *id == TypeId::of::<T>())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl SchemaRegistry for SchemaList {
    fn describe(&mut self, name: &str, type_id: TypeId, rust_type: &'static str) {
        tracing::trace!(name, rust_type, "schema registered");
        self.entries.push((name.to_string(), type_id, rust_type));
    }
}
