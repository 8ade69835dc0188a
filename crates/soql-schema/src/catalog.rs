//! Read-only catalog interface consumed by path resolution and SQL translation

use crate::schema::{ClassInfo, CollectionInfo, FieldInfo, Schema};
use soql_core::{Error, Result, Value};

// Inheritance chains longer than this are treated as cyclic.
const MAX_HIERARCHY_DEPTH: usize = 64;

/// Lookup of classes, fields, relations and inheritance by name.
///
/// Implementors only provide class lookup and direct subclass enumeration;
/// everything else walks the inheritance chain on top of those two.
pub trait SchemaCatalog {
    /// Find a class by name
    fn find_class(&self, name: &str) -> Option<&ClassInfo>;

    /// Classes whose parent is `class`
    fn direct_subclasses(&self, class: &str) -> Vec<&ClassInfo>;

    /// Find a class or fail with a resolution error
    fn require_class(&self, name: &str) -> Result<&ClassInfo> {
        self.find_class(name)
            .ok_or_else(|| Error::SchemaResolution(format!("unknown class '{}'", name)))
    }

    /// The class followed by its ancestors, nearest first
    fn ancestry(&self, class: &str) -> Vec<&ClassInfo> {
        let mut chain = Vec::new();
        let mut current = self.find_class(class);
        while let Some(info) = current {
            if chain.len() >= MAX_HIERARCHY_DEPTH {
                break;
            }
            chain.push(info);
            current = info
                .inherits_from
                .as_deref()
                .and_then(|parent| self.find_class(parent));
        }
        chain
    }

    /// Find a field on `class` or any of its ancestors
    fn find_field_by_name(&self, class: &str, name: &str) -> Option<&FieldInfo> {
        self.ancestry(class)
            .into_iter()
            .find_map(|info| info.own_field(name))
    }

    /// Find a field or fail with a resolution error
    fn require_field(&self, class: &str, name: &str) -> Result<&FieldInfo> {
        self.require_class(class)?;
        self.find_field_by_name(class, name).ok_or_else(|| {
            Error::SchemaResolution(format!("class '{}' has no field '{}'", class, name))
        })
    }

    /// The class a reference field points at
    fn referenced_class(&self, field: &FieldInfo) -> Option<&ClassInfo> {
        field
            .references
            .as_deref()
            .and_then(|name| self.find_class(name))
    }

    /// Find a collection on `class` or any of its ancestors
    fn find_collection(&self, class: &str, name: &str) -> Option<&CollectionInfo> {
        self.ancestry(class)
            .into_iter()
            .find_map(|info| info.own_collection(name))
    }

    /// Find a collection or fail with a resolution error
    fn require_collection(&self, class: &str, name: &str) -> Result<&CollectionInfo> {
        self.require_class(class)?;
        self.find_collection(class, name).ok_or_else(|| {
            Error::SchemaResolution(format!("class '{}' has no collection '{}'", class, name))
        })
    }

    /// Table backing `class`, inherited from the nearest ancestor that has one
    fn table_of(&self, class: &str) -> Option<&str> {
        self.ancestry(class)
            .into_iter()
            .find_map(|info| info.table.as_deref().filter(|t| !t.is_empty()))
    }

    /// Primary key field of `class`
    fn primary_key_of(&self, class: &str) -> Option<&FieldInfo> {
        let key = self
            .ancestry(class)
            .into_iter()
            .find_map(|info| info.primary_key.as_deref())?;
        self.find_field_by_name(class, key)
    }

    /// All subclasses of `class`, transitively
    fn subclasses_of(&self, class: &str) -> Vec<&ClassInfo> {
        let mut result: Vec<&ClassInfo> = Vec::new();
        let mut frontier = vec![class.to_string()];
        while let Some(name) = frontier.pop() {
            for sub in self.direct_subclasses(&name) {
                if sub.name == class || result.iter().any(|c| c.name == sub.name) {
                    continue;
                }
                frontier.push(sub.name.clone());
                result.push(sub);
            }
        }
        result
    }

    /// Discriminator value of `class`
    fn selector_value_of(&self, class: &str) -> Option<&Value> {
        self.find_class(class)
            .and_then(|info| info.subclass_selector_value.as_ref())
    }

    /// Discriminator field of the hierarchy `class` belongs to
    fn selector_field_of(&self, class: &str) -> Option<&FieldInfo> {
        let name = self
            .ancestry(class)
            .into_iter()
            .find_map(|info| info.subclass_selector_field.as_deref())?;
        self.find_field_by_name(class, name)
    }

    /// Returns true if `class` has a parent or any subclass
    fn has_subclassing(&self, class: &str) -> bool {
        match self.find_class(class) {
            Some(info) => {
                info.inherits_from.is_some() || !self.direct_subclasses(class).is_empty()
            }
            None => false,
        }
    }

    /// Discriminator values of `class` and its concrete subclasses
    fn selector_values_for(&self, class: &str) -> Vec<Value> {
        let mut values = Vec::new();
        let own = self.find_class(class).into_iter();
        for info in own.chain(self.subclasses_of(class)) {
            if info.is_abstract {
                continue;
            }
            if let Some(value) = &info.subclass_selector_value {
                if !values.contains(value) {
                    values.push(value.clone());
                }
            }
        }
        values
    }
}

impl SchemaCatalog for Schema {
    fn find_class(&self, name: &str) -> Option<&ClassInfo> {
        self.get_class(name)
    }

    fn direct_subclasses(&self, class: &str) -> Vec<&ClassInfo> {
        let mut subclasses: Vec<&ClassInfo> = self
            .classes
            .values()
            .filter(|info| info.inherits_from.as_deref() == Some(class))
            .collect();
        subclasses.sort_by(|a, b| a.name.cmp(&b.name));
        subclasses
    }
}
