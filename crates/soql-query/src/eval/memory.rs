//! Object store implementing [`EvaluationContext`] without a host model

use super::{Datum, EvaluationContext};
use serde::{Deserialize, Serialize};
use soql_core::{Error, Result, Value};
use std::collections::HashMap;

/// Handle of an object inside an [`InMemoryContext`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectId(pub usize);

/// An object with scalar fields, references and collections
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryObject {
    pub class: String,
    pub key: Value,
    pub fields: HashMap<String, Value>,
    pub references: HashMap<String, Option<ObjectId>>,
    pub collections: HashMap<String, Vec<ObjectId>>,
}

impl MemoryObject {
    pub fn new(class: impl Into<String>, key: impl Into<Value>) -> Self {
        Self {
            class: class.into(),
            key: key.into(),
            fields: HashMap::new(),
            references: HashMap::new(),
            collections: HashMap::new(),
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn with_reference(mut self, name: impl Into<String>, target: Option<ObjectId>) -> Self {
        self.references.insert(name.into(), target);
        self
    }

    pub fn with_collection(mut self, name: impl Into<String>, elements: Vec<ObjectId>) -> Self {
        self.collections.insert(name.into(), elements);
        self
    }
}

/// Evaluation context backed by a vector of objects.
///
/// Unqualified paths start from the object passed to [`set_root`]. Until a
/// root is set, the first inserted object (handle 0) is the root.
///
/// [`set_root`]: InMemoryContext::set_root
#[derive(Debug, Clone, Default)]
pub struct InMemoryContext {
    objects: Vec<MemoryObject>,
    root: Option<ObjectId>,
    parameters: Vec<Value>,
}

impl InMemoryContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an object and return its handle
    pub fn insert(&mut self, object: MemoryObject) -> ObjectId {
        self.objects.push(object);
        ObjectId(self.objects.len() - 1)
    }

    pub fn get(&self, id: ObjectId) -> Option<&MemoryObject> {
        self.objects.get(id.0)
    }

    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut MemoryObject> {
        self.objects.get_mut(id.0)
    }

    /// Replace a collection on an already stored object
    pub fn set_collection(&mut self, owner: ObjectId, name: impl Into<String>, elements: Vec<ObjectId>) {
        if let Some(object) = self.get_mut(owner) {
            object.collections.insert(name.into(), elements);
        }
    }

    pub fn set_root(&mut self, root: ObjectId) {
        self.root = Some(root);
    }

    pub fn set_parameters(&mut self, parameters: Vec<Value>) {
        self.parameters = parameters;
    }

    fn object(&self, id: ObjectId) -> Result<&MemoryObject> {
        self.get(id)
            .ok_or_else(|| Error::SchemaResolution(format!("no object with handle {}", id.0)))
    }
}

impl EvaluationContext for InMemoryContext {
    type Object = ObjectId;

    /// The configured root, else handle 0; lookups on an empty store fail
    /// with a resolution error
    fn root(&self) -> ObjectId {
        self.root.unwrap_or(ObjectId(0))
    }

    fn parameter(&self, index: usize) -> Option<Value> {
        self.parameters.get(index).cloned()
    }

    fn property(&self, object: &ObjectId, name: &str) -> Result<Datum<ObjectId>> {
        let info = self.object(*object)?;
        if let Some(value) = info.fields.get(name) {
            return Ok(Datum::Value(value.clone()));
        }
        match info.references.get(name) {
            Some(Some(target)) => Ok(Datum::Object(*target)),
            Some(None) => Ok(Datum::null()),
            None => Err(Error::SchemaResolution(format!(
                "class '{}' has no property '{}'",
                info.class, name
            ))),
        }
    }

    fn collection(&self, object: &ObjectId, name: &str) -> Result<Vec<ObjectId>> {
        let info = self.object(*object)?;
        info.collections.get(name).cloned().ok_or_else(|| {
            Error::SchemaResolution(format!(
                "class '{}' has no collection '{}'",
                info.class, name
            ))
        })
    }

    fn class_name(&self, object: &ObjectId) -> Result<String> {
        Ok(self.object(*object)?.class.clone())
    }

    fn primary_key(&self, object: &ObjectId) -> Result<Value> {
        Ok(self.object(*object)?.key.clone())
    }
}
