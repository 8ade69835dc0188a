//! Schema model: classes, fields, collections and inheritance

use serde::{Deserialize, Serialize};
use soql_core::{Error, Result, Value};
use std::collections::HashMap;

/// Storage type of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldType {
    Boolean,
    Int8,
    Int16,
    Int32,
    Int64,
    Decimal,
    Float,
    Double,
    String,
    DateTime,
}

/// A field definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldInfo {
    /// Name of the field as written in queries
    pub name: String,

    /// Column backing the field
    pub column: String,

    /// Storage type
    pub data_type: FieldType,

    /// Class referenced by this field (foreign key), if any
    #[serde(default)]
    pub references: Option<String>,

    /// Whether the column accepts nulls
    #[serde(default)]
    pub nullable: bool,
}

impl FieldInfo {
    /// Create a plain scalar field
    pub fn scalar(name: &str, column: &str, data_type: FieldType) -> Self {
        Self {
            name: name.to_string(),
            column: column.to_string(),
            data_type,
            references: None,
            nullable: false,
        }
    }

    /// Create a reference field holding the primary key of `class`
    pub fn reference(name: &str, column: &str, class: &str) -> Self {
        Self {
            name: name.to_string(),
            column: column.to_string(),
            data_type: FieldType::Int32,
            references: Some(class.to_string()),
            nullable: true,
        }
    }

    /// Mark the field as nullable
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Returns true if this field points at another class
    pub fn is_reference(&self) -> bool {
        self.references.is_some()
    }
}

/// How a collection is stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CollectionKind {
    /// Elements carry a foreign key back to the owner
    OneToMany {
        class: String,
        foreign_field: String,
    },

    /// Owner and element are linked through an association table
    ManyToMany {
        element_class: String,
        association_table: String,
        owner_column: String,
        element_column: String,
    },
}

/// A collection definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionInfo {
    /// Name of the collection
    pub name: String,

    /// Storage of the collection
    pub kind: CollectionKind,
}

impl CollectionInfo {
    /// Create a one-to-many collection
    pub fn one_to_many(name: &str, class: &str, foreign_field: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: CollectionKind::OneToMany {
                class: class.to_string(),
                foreign_field: foreign_field.to_string(),
            },
        }
    }

    /// Create a many-to-many collection
    pub fn many_to_many(
        name: &str,
        element_class: &str,
        association_table: &str,
        owner_column: &str,
        element_column: &str,
    ) -> Self {
        Self {
            name: name.to_string(),
            kind: CollectionKind::ManyToMany {
                element_class: element_class.to_string(),
                association_table: association_table.to_string(),
                owner_column: owner_column.to_string(),
                element_column: element_column.to_string(),
            },
        }
    }

    /// Class of the collection's elements
    pub fn element_class(&self) -> &str {
        match &self.kind {
            CollectionKind::OneToMany { class, .. } => class,
            CollectionKind::ManyToMany { element_class, .. } => element_class,
        }
    }
}

/// A class definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassInfo {
    /// Name of the class
    pub name: String,

    /// Backing table; subclasses without one share their parent's table
    #[serde(default)]
    pub table: Option<String>,

    /// Primary key field name; inherited when absent
    #[serde(default)]
    pub primary_key: Option<String>,

    /// Fields declared on this class (inherited fields are not repeated)
    #[serde(default)]
    pub fields: Vec<FieldInfo>,

    /// Collections declared on this class
    #[serde(default)]
    pub collections: Vec<CollectionInfo>,

    /// Parent class
    #[serde(default)]
    pub inherits_from: Option<String>,

    /// Discriminator field, declared on the root of a hierarchy
    #[serde(default)]
    pub subclass_selector_field: Option<String>,

    /// Discriminator value identifying rows of this class
    #[serde(default)]
    pub subclass_selector_value: Option<Value>,

    /// Abstract classes have no rows of their own
    #[serde(default)]
    pub is_abstract: bool,
}

impl ClassInfo {
    /// Create a root class stored in `table`
    pub fn new(name: &str, table: &str) -> Self {
        Self {
            name: name.to_string(),
            table: Some(table.to_string()),
            primary_key: None,
            fields: Vec::new(),
            collections: Vec::new(),
            inherits_from: None,
            subclass_selector_field: None,
            subclass_selector_value: None,
            is_abstract: false,
        }
    }

    /// Create a subclass sharing its parent's table
    pub fn subclass(name: &str, parent: &str) -> Self {
        Self {
            table: None,
            inherits_from: Some(parent.to_string()),
            ..Self::new(name, "")
        }
    }

    /// Set the primary key field, adding an Int32 field for it
    pub fn with_primary_key(mut self, name: &str, column: &str) -> Self {
        self.primary_key = Some(name.to_string());
        self.fields
            .push(FieldInfo::scalar(name, column, FieldType::Int32));
        self
    }

    /// Add a field
    pub fn with_field(mut self, field: FieldInfo) -> Self {
        self.fields.push(field);
        self
    }

    /// Add a collection
    pub fn with_collection(mut self, collection: CollectionInfo) -> Self {
        self.collections.push(collection);
        self
    }

    /// Declare the discriminator field of a hierarchy root
    pub fn with_selector_field(mut self, field: &str) -> Self {
        self.subclass_selector_field = Some(field.to_string());
        self
    }

    /// Set this class's discriminator value
    pub fn with_selector_value<V: Into<Value>>(mut self, value: V) -> Self {
        self.subclass_selector_value = Some(value.into());
        self
    }

    /// Mark the class abstract
    pub fn abstract_class(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    /// Field declared directly on this class
    pub fn own_field(&self, name: &str) -> Option<&FieldInfo> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Collection declared directly on this class
    pub fn own_collection(&self, name: &str) -> Option<&CollectionInfo> {
        self.collections.iter().find(|c| c.name == name)
    }
}

/// In-memory schema catalog, containing all classes by name
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Schema {
    /// Classes by name
    pub classes: HashMap<String, ClassInfo>,
}

impl Schema {
    /// Create a new empty schema
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a schema from its JSON document form
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| Error::SchemaResolution(format!("invalid schema document: {}", e)))
    }

    /// Add a class; returns false when the name is already taken
    pub fn add_class(&mut self, class: ClassInfo) -> bool {
        if self.classes.contains_key(&class.name) {
            return false;
        }
        self.classes.insert(class.name.clone(), class);
        true
    }

    /// Builder form of [`Schema::add_class`]
    pub fn with_class(mut self, class: ClassInfo) -> Self {
        self.add_class(class);
        self
    }

    /// Remove a class
    pub fn remove_class(&mut self, name: &str) -> Option<ClassInfo> {
        self.classes.remove(name)
    }

    /// Get a class by name
    pub fn get_class(&self, name: &str) -> Option<&ClassInfo> {
        self.classes.get(name)
    }
}
