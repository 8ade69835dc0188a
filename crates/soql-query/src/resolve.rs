//! Path resolution against a schema catalog
//!
//! Every segment of a path except the last must be a reference field; each
//! one becomes a join step from its owner class to the referenced class.

use crate::ast::PathExpr;
use soql_core::{Error, Result};
use soql_schema::{FieldInfo, SchemaCatalog};

/// One dereference: `owner_class.field` points at `target_class`
#[derive(Debug, Clone, PartialEq)]
pub struct JoinStep {
    /// Dotted path up to and including the reference field
    pub prefix: String,
    pub owner_class: String,
    pub field: FieldInfo,
    pub target_class: String,
}

/// A fully resolved property path
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedPath {
    pub steps: Vec<JoinStep>,
    /// Class declaring (or inheriting) the last segment
    pub owner_class: String,
    pub field: FieldInfo,
}

/// Follow `segments` as reference fields starting at `root`
pub fn resolve_references<S: SchemaCatalog + ?Sized>(
    schema: &S,
    root: &str,
    segments: &[&str],
) -> Result<Vec<JoinStep>> {
    schema.require_class(root)?;
    let mut class = root.to_string();
    let mut steps = Vec::with_capacity(segments.len());

    for (i, name) in segments.iter().enumerate() {
        let field = schema.require_field(&class, name)?;
        let target = match field.references.as_deref() {
            Some(target) => schema.require_class(target)?,
            None => {
                return Err(Error::SchemaResolution(format!(
                    "field '{}' of class '{}' is not a reference",
                    name, class
                )));
            }
        };
        steps.push(JoinStep {
            prefix: segments[..=i].join("."),
            owner_class: class,
            field: field.clone(),
            target_class: target.name.clone(),
        });
        class = target.name.clone();
    }

    Ok(steps)
}

/// Resolve a property path against `root`
pub fn resolve_path<S: SchemaCatalog + ?Sized>(
    schema: &S,
    root: &str,
    path: &PathExpr,
) -> Result<ResolvedPath> {
    let segments = path.segments();
    let (last, prefix) = match segments.split_last() {
        Some(split) => split,
        None => return Err(Error::SchemaResolution("empty path".to_string())),
    };

    let steps = resolve_references(schema, root, prefix)?;
    let owner_class = steps
        .last()
        .map(|step| step.target_class.clone())
        .unwrap_or_else(|| root.to_string());
    let field = schema.require_field(&owner_class, last)?.clone();

    Ok(ResolvedPath {
        steps,
        owner_class,
        field,
    })
}

/// Class of the object an optional path prefix points at
pub fn class_of<S: SchemaCatalog + ?Sized>(
    schema: &S,
    root: &str,
    path: Option<&PathExpr>,
) -> Result<String> {
    let segments = path.map(|p| p.segments()).unwrap_or_default();
    let steps = resolve_references(schema, root, &segments)?;
    Ok(steps
        .last()
        .map(|step| step.target_class.clone())
        .unwrap_or_else(|| root.to_string()))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use soql_schema::{ClassInfo, CollectionInfo, FieldType, Schema};

    /// Contacts in groups, groups with a manager, vehicles with subclasses
    pub(crate) fn sample_schema() -> Schema {
        Schema::new()
            .with_class(
                ClassInfo::new("Contact", "contact")
                    .with_primary_key("Id", "id")
                    .with_field(FieldInfo::scalar("Name", "name", FieldType::String))
                    .with_field(FieldInfo::scalar("Age", "age", FieldType::Int32))
                    .with_field(FieldInfo::reference("PrimaryGroup", "primary_group", "Group"))
                    .with_field(FieldInfo::reference("Manager", "manager", "Contact"))
                    .with_collection(CollectionInfo::many_to_many(
                        "Vehicles",
                        "Vehicle",
                        "contact_vehicle",
                        "contact_id",
                        "vehicle_id",
                    )),
            )
            .with_class(
                ClassInfo::new("Group", "_group")
                    .with_primary_key("Id", "id")
                    .with_field(FieldInfo::scalar("Name", "name", FieldType::String))
                    .with_field(FieldInfo::reference("Manager", "manager", "Contact"))
                    .with_collection(CollectionInfo::one_to_many(
                        "Members",
                        "Contact",
                        "PrimaryGroup",
                    )),
            )
            .with_class(
                ClassInfo::new("Vehicle", "vehicle")
                    .with_primary_key("Id", "id")
                    .with_field(FieldInfo::scalar("Type", "type", FieldType::Int32))
                    .with_field(FieldInfo::scalar("Name", "name", FieldType::String))
                    .with_field(FieldInfo::reference("Owner", "owner", "Contact"))
                    .with_selector_field("Type")
                    .abstract_class(),
            )
            .with_class(ClassInfo::subclass("Car", "Vehicle").with_selector_value(1))
            .with_class(ClassInfo::subclass("Bike", "Vehicle").with_selector_value(2))
            .with_class(ClassInfo::subclass("MountainBike", "Bike").with_selector_value(3))
            .with_class(
                ClassInfo::new("Garage", "garage")
                    .with_primary_key("Id", "id")
                    .with_field(FieldInfo::reference("Bike", "bike", "Bike"))
                    .with_field(FieldInfo::reference("Owner", "owner", "Contact")),
            )
    }

    #[test]
    fn test_resolve_path() {
        let schema = sample_schema();
        let path = PathExpr::from_segments(["PrimaryGroup", "Manager", "Name"]).unwrap();
        let resolved = resolve_path(&schema, "Contact", &path).unwrap();

        assert_eq!(resolved.steps.len(), 2);
        assert_eq!(resolved.steps[0].prefix, "PrimaryGroup");
        assert_eq!(resolved.steps[0].target_class, "Group");
        assert_eq!(resolved.steps[1].prefix, "PrimaryGroup.Manager");
        assert_eq!(resolved.steps[1].owner_class, "Group");
        assert_eq!(resolved.steps[1].target_class, "Contact");
        assert_eq!(resolved.owner_class, "Contact");
        assert_eq!(resolved.field.column, "name");
    }

    #[test]
    fn test_inherited_fields_resolve() {
        let schema = sample_schema();
        let path = PathExpr::new("Bike").child("Owner").child("Name");
        let resolved = resolve_path(&schema, "Garage", &path).unwrap();
        assert_eq!(resolved.steps[0].target_class, "Bike");
        assert_eq!(resolved.steps[1].owner_class, "Bike");
    }

    #[test]
    fn test_resolution_errors() {
        let schema = sample_schema();
        let wrong_root = resolve_path(&schema, "Group", &PathExpr::new("Age"));
        assert!(matches!(wrong_root, Err(Error::SchemaResolution(_))));

        let through_scalar = PathExpr::new("Name").child("Length");
        assert!(matches!(
            resolve_path(&schema, "Contact", &through_scalar),
            Err(Error::SchemaResolution(_))
        ));

        assert!(matches!(
            class_of(&schema, "Nope", None),
            Err(Error::SchemaResolution(_))
        ));
    }

    #[test]
    fn test_class_of() {
        let schema = sample_schema();
        assert_eq!(class_of(&schema, "Contact", None).unwrap(), "Contact");
        let prefix = PathExpr::new("PrimaryGroup").child("Manager");
        assert_eq!(
            class_of(&schema, "Contact", Some(&prefix)).unwrap(),
            "Contact"
        );
        assert_eq!(
            class_of(&schema, "Contact", Some(&PathExpr::new("PrimaryGroup"))).unwrap(),
            "Group"
        );
    }
}
