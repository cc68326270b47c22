use appbuilder::loader::{load_object, load_process};
use appbuilder::process::{EmailMessage, InMemoryInstanceStore, InstanceStatus, Mailer, ServiceError, TaskServices,
                          TaskStatus};
use appbuilder::schema::{InMemoryCatalog, ObjectChanges, FieldDefinition, FieldKey};
use appbuilder::AppConfig;
use async_trait::async_trait;
use serde_json::json;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

fn demo(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("demos").join(name)
}

#[derive(Default)]
struct Outbox(Mutex<Vec<EmailMessage>>);

#[async_trait]
impl Mailer for Outbox {
    async fn send(&self, message: &EmailMessage) -> Result<(), ServiceError> {
        self.0.lock().map_err(|e| ServiceError::new(e.to_string()))?.push(message.clone());
        Ok(())
    }
}

#[tokio::test]
async fn invoice_object_migrates_and_evolves() {
    let v1 = load_object(demo("invoice.object.json")).unwrap();
    let mut catalog = InMemoryCatalog::new();
    v1.migrate_create(&mut catalog).await.unwrap();
    let table = catalog.table("AB_Invoice").unwrap();
    assert!(table.columns.contains_key("fullName"));
    assert!(table.indexes.contains_key("UNQ_AB_Invoice_email"));
    assert!(table.indexes.contains_key("IDX_AB_Invoice_lastName_firstName"));
    assert!(catalog.trigger("AB_Invoice_fullName_update").is_some());

    let mut v2 = v1.clone();
    v2.add_field(FieldDefinition::new("dueDate", FieldKey::Date)).unwrap();
    let changes = ObjectChanges::diff(&v1, &v2);
    v2.migrate_update(&changes, &mut catalog).await.unwrap();
    assert!(catalog.table("AB_Invoice").unwrap().columns.contains_key("dueDate"));

    v2.migrate_drop(&mut catalog).await.unwrap();
    assert!(catalog.table("AB_Invoice").is_none());
    assert!(catalog.trigger("AB_Invoice_fullName_update").is_none());
}

#[tokio::test]
async fn approval_process_suspends_then_completes() {
    let def = load_process(demo("invoice_approval.process.json")).unwrap();
    let outbox = Arc::new(Outbox::default());
    let config = AppConfig { dialect: appbuilder::Dialect::MySql,
                             max_task_steps: 50,
                             database: None };
    let runtime = config.runtime(InMemoryInstanceStore::new(),
                                 TaskServices::default().with_mailer(outbox.clone()));

    let data = json!({"number": "F-1", "customer": {"name": "Ada", "email": "ada@example.com"}});
    let instance = runtime.trigger(&def, "invoice.created", data).await.unwrap();
    assert_eq!(instance.status, InstanceStatus::Waiting);
    assert_eq!(instance.context.status_of("Task_Approve"), TaskStatus::Waiting);

    let inbox = runtime.inbox(std::slice::from_ref(&def), &["accounting".to_string()], &[]).await.unwrap();
    assert_eq!(inbox.len(), 1);
    assert!(runtime.inbox(std::slice::from_ref(&def), &["sales".to_string()], &[]).await.unwrap().is_empty());

    let done = runtime.respond(&def, instance.id, "Task_Approve", json!({"decision": "approved"}))
                      .await
                      .unwrap();
    assert_eq!(done.status, InstanceStatus::Completed);
    assert_eq!(done.context.var("approval"), Some(&json!({"decision": "approved"})));

    let sent = outbox.0.lock().unwrap().clone();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, vec!["ada@example.com".to_string()]);
    assert_eq!(sent[0].subject, "Invoice F-1");
    assert_eq!(sent[0].body, "Dear Ada, your invoice was approved.");
}
