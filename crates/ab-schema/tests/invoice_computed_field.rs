use ab_schema::{FieldDefinition, FieldKey, InMemoryCatalog, MigrationEngine, ObjectDefinition};
use ab_schema::ddl::{TriggerBody, TriggerEvent};

fn invoice() -> ObjectDefinition {
    let mut obj = ObjectDefinition::new("Invoice");
    let first = obj.add_field(FieldDefinition::new("firstName", FieldKey::Text)).unwrap();
    let last = obj.add_field(FieldDefinition::new("lastName", FieldKey::Text)).unwrap();
    let mut full = FieldDefinition::new("fullName", FieldKey::CustomIndex);
    full.settings.combined_fields = Some(format!("{first},{last}"));
    obj.add_field(full).unwrap();
    obj
}

#[tokio::test]
async fn computed_field_installs_column_unique_index_and_triggers() {
    let obj = invoice();
    let mut cat = InMemoryCatalog::new();
    let report = MigrationEngine::new(&mut cat).migrate_create_object(&obj).await.unwrap();
    assert!(report.skipped.is_empty());

    let table = cat.table("AB_Invoice").expect("table created");
    let full = &table.columns["fullName"];
    assert!(full.nullable);
    assert_eq!(full.ty, ab_schema::ddl::ColumnType::VarChar(535));

    let idx = &table.indexes["UNQ_AB_Invoice_fullName"];
    assert!(idx.unique);
    assert_eq!(idx.columns, vec!["fullName".to_string()]);

    let trg = cat.trigger("AB_Invoice_fullName_update").expect("update trigger");
    assert_eq!(trg.event, TriggerEvent::Update);
    let TriggerBody::Concat { target, sources, separator } = &trg.body;
    assert_eq!(target.as_str(), "fullName");
    assert_eq!(sources.iter().map(|s| s.as_str()).collect::<Vec<_>>(), vec!["firstName", "lastName"]);
    assert_eq!(separator, "+");
    assert!(cat.trigger("AB_Invoice_fullName_insert").is_some());

    let sql = cat.executed().join("\n");
    assert!(sql.contains("CREATE TRIGGER `AB_Invoice_fullName_update` BEFORE UPDATE ON `AB_Invoice` FOR EACH ROW \
                          SET NEW.`fullName` = CONCAT(NEW.`firstName`, '+', NEW.`lastName`)"));
    assert!(sql.contains("ALTER TABLE `AB_Invoice` ADD UNIQUE INDEX `UNQ_AB_Invoice_fullName` (`fullName`)"));
}

#[tokio::test]
async fn statements_follow_dependency_order() {
    let obj = invoice();
    let mut cat = InMemoryCatalog::new();
    MigrationEngine::new(&mut cat).migrate_create_object(&obj).await.unwrap();
    let kinds: Vec<u8> = cat.executed()
                            .iter()
                            .map(|s| {
                                if s.starts_with("CREATE TABLE") {
                                    0
                                } else if s.contains("ADD COLUMN") {
                                    1
                                } else if s.contains("INDEX") {
                                    2
                                } else {
                                    3
                                }
                            })
                            .collect();
    let mut sorted = kinds.clone();
    sorted.sort();
    assert_eq!(kinds, sorted);
}

#[tokio::test]
async fn custom_delimiter_is_quoted_as_literal() {
    let mut obj = invoice();
    obj.fields[2].settings.delimiter = Some("'; DROP TABLE x; --".into());
    let mut cat = InMemoryCatalog::new();
    MigrationEngine::new(&mut cat).migrate_create_object(&obj).await.unwrap();
    let sql = cat.executed().iter().find(|s| s.contains("_update")).cloned().unwrap();
    assert!(sql.contains("'''; DROP TABLE x; --'"));
}

#[tokio::test]
async fn dropping_the_computed_field_removes_triggers_index_and_column() {
    let obj = invoice();
    let mut cat = InMemoryCatalog::new();
    MigrationEngine::new(&mut cat).migrate_create_object(&obj).await.unwrap();
    let full = obj.field_by_column("fullName").unwrap().clone();
    full.migrate_drop(&obj, &mut cat).await.unwrap();

    assert!(cat.trigger("AB_Invoice_fullName_update").is_none());
    assert!(cat.trigger("AB_Invoice_fullName_insert").is_none());
    let table = cat.table("AB_Invoice").unwrap();
    assert!(!table.columns.contains_key("fullName"));
    assert!(!table.indexes.contains_key("UNQ_AB_Invoice_fullName"));

    // segunda vez: todo ausente, nada que ejecutar
    cat.clear_log();
    let report = full.migrate_drop(&obj, &mut cat).await.unwrap();
    assert!(report.is_noop());
    assert!(cat.executed().is_empty());
}
