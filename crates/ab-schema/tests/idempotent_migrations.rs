use ab_schema::connection::CatalogSnapshot;
use ab_schema::ddl::TriggerBody;
use ab_schema::{DbError, DbErrorCode, FieldDefinition, FieldKey, IndexDefinition, InMemoryCatalog, LinkType,
                MigrationEngine, ObjectChanges, ObjectDefinition, SchemaError};
use uuid::Uuid;

fn contact() -> ObjectDefinition {
    let mut obj = ObjectDefinition::new("Contact");
    let mut mail = FieldDefinition::new("mail", FieldKey::Email);
    mail.settings.unique = true;
    let mail = obj.add_field(mail).unwrap();
    let name = obj.add_field(FieldDefinition::new("name", FieldKey::Text)).unwrap();
    let mut tags = FieldDefinition::new("tags", FieldKey::ConnectObject);
    tags.settings.link_type = Some(LinkType::Many);
    obj.add_field(tags).unwrap();
    obj.add_index(IndexDefinition::new("by name and mail", vec![name, mail], false)).unwrap();
    obj
}

#[tokio::test]
async fn create_twice_leaves_schema_unchanged() {
    let obj = contact();
    let mut cat = InMemoryCatalog::new();
    MigrationEngine::new(&mut cat).migrate_create_object(&obj).await.unwrap();
    let before = cat.snapshot();
    cat.clear_log();

    let report = MigrationEngine::new(&mut cat).migrate_create_object(&obj).await.unwrap();
    assert!(report.is_noop());
    assert!(cat.executed().is_empty());
    assert_eq!(cat.snapshot(), before);
    assert!(before.tables.contains_key("AB_JOIN_AB_Contact_tags"));
}

#[tokio::test]
async fn drop_twice_succeeds_and_removes_everything() {
    let obj = contact();
    let mut cat = InMemoryCatalog::new();
    MigrationEngine::new(&mut cat).migrate_create_object(&obj).await.unwrap();
    MigrationEngine::new(&mut cat).migrate_drop_object(&obj).await.unwrap();
    assert!(cat.snapshot().tables.is_empty());

    let again = MigrationEngine::new(&mut cat).migrate_drop_object(&obj).await.unwrap();
    assert!(again.is_noop());
    assert!(cat.snapshot().tables.is_empty());
}

#[tokio::test]
async fn stale_existence_checks_fall_back_to_duplicate_codes() {
    let obj = contact();
    let mut cat = InMemoryCatalog::new();
    MigrationEngine::new(&mut cat).migrate_create_object(&obj).await.unwrap();
    let before = cat.snapshot();

    // Otro actor aplicó el DDL entre la comprobación y la sentencia.
    cat.set_blind_checks(true);
    let report = MigrationEngine::new(&mut cat).migrate_create_object(&obj).await.unwrap();
    assert!(report.applied.is_empty());
    assert!(!report.skipped.is_empty());
    assert_eq!(cat.snapshot(), before);
}

#[tokio::test]
async fn partial_failure_aborts_and_rerun_completes() {
    let obj = contact();
    let mut cat = InMemoryCatalog::new();
    cat.fail_next("ADD COLUMN `name`", DbError::new(DbErrorCode::Other(1205), "Lock wait timeout exceeded"));

    let err = MigrationEngine::new(&mut cat).migrate_create_object(&obj).await.unwrap_err();
    match err {
        SchemaError::Migration(m) => {
            assert_eq!(m.table, "AB_Contact");
            assert!(m.target.contains("name"));
            assert_eq!(m.source.code, DbErrorCode::Other(1205));
        }
        other => panic!("unexpected error: {other}"),
    }
    // lo aplicado antes del fallo permanece
    assert!(cat.table("AB_Contact").unwrap().columns.contains_key("mail"));
    assert!(!cat.table("AB_Contact").unwrap().columns.contains_key("name"));

    MigrationEngine::new(&mut cat).migrate_create_object(&obj).await.unwrap();
    let fresh = {
        let mut c = InMemoryCatalog::new();
        MigrationEngine::new(&mut c).migrate_create_object(&obj).await.unwrap();
        c.snapshot()
    };
    assert_eq!(cat.snapshot(), fresh);
}

#[tokio::test]
async fn update_applies_added_removed_and_changed_fields() {
    let v1 = contact();
    let mut cat = InMemoryCatalog::new();
    MigrationEngine::new(&mut cat).migrate_create_object(&v1).await.unwrap();

    let mut v2 = v1.clone();
    let name_id = v2.field_by_column("name").unwrap().id;
    v2.remove_field(name_id);
    let mail = v2.fields.iter_mut().find(|f| f.column_name == "mail").unwrap();
    mail.settings.unique = false;
    v2.add_field(FieldDefinition::new("phone", FieldKey::Text)).unwrap();

    let changes = ObjectChanges::diff(&v1, &v2);
    assert_eq!(changes.removed_fields.len(), 1);
    assert_eq!(changes.changed_fields.len(), 1);
    assert_eq!(changes.added_fields.len(), 1);
    assert_eq!(changes.removed_indexes.len(), 1);

    MigrationEngine::new(&mut cat).migrate_update_object(&v2, &changes).await.unwrap();
    let table = cat.table("AB_Contact").unwrap();
    assert!(table.columns.contains_key("phone"));
    assert!(!table.columns.contains_key("name"));
    assert!(!table.indexes.contains_key("UNQ_AB_Contact_mail"));
    assert!(!table.indexes.contains_key("IDX_AB_Contact_name_mail"));

    // reaplicar el mismo cambio no ejecuta DDL
    cat.clear_log();
    let again = MigrationEngine::new(&mut cat).migrate_update_object(&v2, &changes).await.unwrap();
    assert!(again.is_noop());
    assert!(cat.executed().is_empty(), "{:?}", cat.executed());
    let fresh = {
        let mut c = InMemoryCatalog::new();
        MigrationEngine::new(&mut c).migrate_create_object(&v2).await.unwrap();
        c.snapshot()
    };
    assert_eq!(cat.snapshot(), fresh);
}

fn invoice() -> (ObjectDefinition, Uuid) {
    let mut obj = ObjectDefinition::new("Invoice");
    let first = obj.add_field(FieldDefinition::new("firstName", FieldKey::Text)).unwrap();
    let last = obj.add_field(FieldDefinition::new("lastName", FieldKey::Text)).unwrap();
    let mut full = FieldDefinition::new("fullName", FieldKey::CustomIndex);
    full.settings.combined_fields = Some(format!("{first},{last}"));
    obj.add_field(full).unwrap();
    obj.add_index(IndexDefinition::new("by customer", vec![last, first], false)).unwrap();
    (obj, first)
}

async fn fresh_snapshot(obj: &ObjectDefinition) -> CatalogSnapshot {
    let mut c = InMemoryCatalog::new();
    MigrationEngine::new(&mut c).migrate_create_object(obj).await.unwrap();
    c.snapshot()
}

#[tokio::test]
async fn renaming_a_combined_source_rebuilds_triggers_and_indexes() {
    let (v1, first) = invoice();
    let mut cat = InMemoryCatalog::new();
    MigrationEngine::new(&mut cat).migrate_create_object(&v1).await.unwrap();

    let mut v2 = v1.clone();
    v2.fields.iter_mut().find(|f| f.id == first).unwrap().column_name = "givenName".into();
    let changes = ObjectChanges::diff(&v1, &v2);
    assert_eq!(changes.changed_fields.len(), 1);
    assert!(changes.changed_indexes.is_empty());

    MigrationEngine::new(&mut cat).migrate_update_object(&v2, &changes).await.unwrap();
    let trg = cat.trigger("AB_Invoice_fullName_insert").unwrap();
    let TriggerBody::Concat { sources, .. } = &trg.body;
    assert_eq!(sources.iter().map(|s| s.as_str()).collect::<Vec<_>>(), vec!["givenName", "lastName"]);
    let table = cat.table("AB_Invoice").unwrap();
    assert!(!table.indexes.contains_key("IDX_AB_Invoice_lastName_firstName"));
    assert_eq!(table.indexes["IDX_AB_Invoice_lastName_givenName"].columns, vec!["lastName", "givenName"]);
    assert_eq!(cat.snapshot(), fresh_snapshot(&v2).await);

    cat.clear_log();
    MigrationEngine::new(&mut cat).migrate_update_object(&v2, &changes).await.unwrap();
    assert!(cat.executed().is_empty(), "{:?}", cat.executed());
}

#[tokio::test]
async fn every_creation_path_yields_the_same_schema() {
    let mut obj = ObjectDefinition::new("Contact");
    let mut mail = FieldDefinition::new("mail", FieldKey::Email);
    mail.settings.unique = true;
    obj.add_field(mail).unwrap();
    let expected = fresh_snapshot(&obj).await;
    assert!(expected.tables["AB_Contact"].indexes.contains_key("UNQ_AB_Contact_uuid"));

    let mut by_field = InMemoryCatalog::new();
    obj.fields[0].migrate_create(&obj, &mut by_field).await.unwrap();
    assert_eq!(by_field.snapshot(), expected);

    let mut by_field_update = InMemoryCatalog::new();
    obj.fields[0].migrate_update(&obj, &mut by_field_update).await.unwrap();
    assert_eq!(by_field_update.snapshot(), expected);

    let mut empty = obj.clone();
    empty.fields.clear();
    let mut by_changes = InMemoryCatalog::new();
    MigrationEngine::new(&mut by_changes).migrate_update_object(&obj, &ObjectChanges::diff(&empty, &obj))
                                         .await
                                         .unwrap();
    assert_eq!(by_changes.snapshot(), expected);
}

#[tokio::test]
async fn field_update_only_touches_what_differs() {
    let mut obj = contact();
    let mut cat = InMemoryCatalog::new();
    MigrationEngine::new(&mut cat).migrate_create_object(&obj).await.unwrap();
    cat.clear_log();

    for field in &obj.fields {
        field.migrate_update(&obj, &mut cat).await.unwrap();
    }
    for index in &obj.indexes {
        index.migrate_update(&obj, &mut cat).await.unwrap();
    }
    assert!(cat.executed().is_empty(), "{:?}", cat.executed());

    let name = obj.fields.iter_mut().find(|f| f.column_name == "name").unwrap();
    name.settings.max_length = Some(80);
    let name = name.clone();
    let report = name.migrate_update(&obj, &mut cat).await.unwrap();
    assert_eq!(report.applied.len(), 1);
    assert_eq!(cat.executed(), ["ALTER TABLE `AB_Contact` MODIFY COLUMN `name` VARCHAR(80) NULL"]);
}
