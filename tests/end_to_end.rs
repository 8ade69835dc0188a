use soql::EvaluationContext;
use soql::query::Datum;
use soql::{
    ClassInfo, CollectionInfo, Error, FieldInfo, FieldType, InMemoryContext, MemoryObject, Schema,
    SqlConfig, Value, evaluate, involved_classes, matches, parse_expression, parse_query,
    parse_where_clause, simplify, to_sql,
};

fn schema() -> Schema {
    Schema::new()
        .with_class(
            ClassInfo::new("Contact", "contact")
                .with_primary_key("Id", "id")
                .with_field(FieldInfo::scalar("Name", "name", FieldType::String))
                .with_field(FieldInfo::scalar("Age", "age", FieldType::Int32))
                .with_field(FieldInfo::reference("PrimaryGroup", "primary_group", "Group")),
        )
        .with_class(
            ClassInfo::new("Group", "_group")
                .with_primary_key("Id", "id")
                .with_field(FieldInfo::scalar("Name", "name", FieldType::String))
                .with_collection(CollectionInfo::one_to_many(
                    "Members",
                    "Contact",
                    "PrimaryGroup",
                )),
        )
}

fn people() -> InMemoryContext {
    let mut context = InMemoryContext::new();
    let bob = context.insert(
        MemoryObject::new("Contact", 1)
            .with_field("Name", "Bob")
            .with_field("Age", 30),
    );
    let admins = context.insert(
        MemoryObject::new("Group", 10)
            .with_field("Name", "Admins")
            .with_collection("Members", vec![bob]),
    );
    if let Some(object) = context.get_mut(bob) {
        object.references.insert("PrimaryGroup".to_string(), Some(admins));
    }
    context.set_root(bob);
    context
}

#[test]
fn test_simplified_text() {
    let fold = |text: &str| simplify(&parse_expression(text).unwrap()).to_string();
    assert_eq!(fold("true && false && true"), "false");
    assert_eq!(fold("1 + 2 * 3"), "7");
    assert_eq!(fold("(Name = 'x') || (1 = 1)"), "true");
}

#[test]
fn test_evaluation() {
    let context = InMemoryContext::new();
    let eval = |text: &str| evaluate(&parse_expression(text).unwrap(), &context).unwrap();
    assert_eq!(eval("1 = 1.0"), Value::Boolean(true));
    assert_eq!(eval("1 - 4 / 2 = -1"), Value::Boolean(true));
    assert_eq!(eval("'it''s'"), Value::from("it's"));
    assert_eq!(eval("null = null"), Value::Null);
}

#[test]
fn test_matching_objects() {
    let context = people();
    let condition =
        parse_where_clause("PrimaryGroup.Name = 'Admins' and Age >= 18 and PrimaryGroup.Members.Count = 1")
            .unwrap();
    assert!(matches(&condition, &context).unwrap());

    let unknown = parse_where_clause("Age > null").unwrap();
    assert!(!matches(&unknown, &context).unwrap());
}

#[test]
fn test_involvement_and_translation_agree() {
    let schema = schema();
    let condition = parse_where_clause("PrimaryGroup.Name = 'x'").unwrap();
    let classes: Vec<String> = involved_classes(&condition, "Contact", &schema)
        .unwrap()
        .into_iter()
        .collect();
    assert_eq!(classes, vec!["Contact", "Group"]);

    let query = parse_query("select PrimaryGroup.Id from Contact where PrimaryGroup.Name = 'x'")
        .unwrap();
    let sql = to_sql(&query, &schema, &SqlConfig::for_sql_server()).unwrap();
    assert_eq!(
        sql,
        "select t1.id from contact t0 left outer join _group t1 on (t0.primary_group = t1.id) \
         where (t1.name = 'x')"
    );
    assert_eq!(sql.matches("left outer join").count(), 1);
}

#[test]
fn test_string_literal_quoting() {
    let query = parse_query("select Name from Contact where Name = 'it''s'").unwrap();
    let sql = to_sql(&query, &schema(), &SqlConfig::default()).unwrap();
    assert!(sql.ends_with("where (t0.name = 'it''s')"));
}

#[test]
fn test_errors_surface() {
    assert!(matches!(parse_expression("1 +"), Err(Error::Syntax { .. })));
    assert!(matches!(parse_expression("Name # 1"), Err(Error::Lex { .. })));

    let query = parse_query("select Salary from Contact").unwrap();
    assert!(matches!(
        to_sql(&query, &schema(), &SqlConfig::default()),
        Err(Error::SchemaResolution(_))
    ));
}

#[test]
fn test_context_root() {
    let context = people();
    let root = context.root();
    assert_eq!(
        context.property(&root, "Name").unwrap(),
        Datum::Value(Value::from("Bob"))
    );
}
