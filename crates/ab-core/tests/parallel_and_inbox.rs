mod test_support;

use ab_core::{ElementKind, EmailTask, InMemoryInstanceStore, InstanceStatus, ProcessElement, ProcessError, ProcessRuntime,
              TaskServices, TaskStatus};
use serde_json::json;
use std::sync::Arc;
use test_support::*;

#[tokio::test]
async fn join_waits_for_every_branch() {
    let def = parallel(approval(&["finance"]), generic());
    let rt = ProcessRuntime::new(InMemoryInstanceStore::new(), TaskServices::default());
    let inst = rt.trigger(&def, TRIGGER_KEY, json!({})).await.unwrap();

    assert_eq!(inst.context.status_of("Fork"), TaskStatus::Completed);
    assert_eq!(inst.context.status_of("B"), TaskStatus::Completed);
    assert_eq!(inst.context.status_of("A"), TaskStatus::Waiting);
    assert_eq!(inst.context.status_of("Join"), TaskStatus::Waiting);
    assert_eq!(inst.status, InstanceStatus::Waiting);

    let done = rt.respond(&def, inst.id, "A", json!("ok")).await.unwrap();
    assert_eq!(done.context.status_of("Join"), TaskStatus::Completed);
    assert_eq!(done.status, InstanceStatus::Completed);
}

#[tokio::test]
async fn inbox_lists_waiting_user_tasks_by_role() {
    let def = linear(approval(&["finance"]));
    let rt = ProcessRuntime::new(InMemoryInstanceStore::new(), TaskServices::default());
    let inst = rt.trigger(&def, TRIGGER_KEY, json!({})).await.unwrap();

    let defs = vec![def.clone()];
    let finance = rt.inbox(&defs, &["finance".to_string()], &[]).await.unwrap();
    assert_eq!(finance.len(), 1);
    assert_eq!(finance[0].instance_id, inst.id);
    assert_eq!(finance[0].task_id, "Task_A");
    assert_eq!(finance[0].instructions, "Approve the invoice");
    assert!(rt.inbox(&defs, &["sales".to_string()], &[]).await.unwrap().is_empty());

    rt.respond(&def, inst.id, "Task_A", json!(true)).await.unwrap();
    assert!(rt.inbox(&defs, &["finance".to_string()], &[]).await.unwrap().is_empty());
}

#[tokio::test]
async fn respond_rejects_non_waiting_or_non_user_tasks() {
    let def = linear(approval(&[]));
    let rt = ProcessRuntime::new(InMemoryInstanceStore::new(), TaskServices::default());
    let inst = rt.trigger(&def, TRIGGER_KEY, json!({})).await.unwrap();
    assert!(rt.respond(&def, inst.id, "EndEvent_1", json!(1)).await.is_err());
    rt.respond(&def, inst.id, "Task_A", json!(1)).await.unwrap();
    assert!(rt.respond(&def, inst.id, "Task_A", json!(2)).await.is_err());
}

#[tokio::test]
async fn respond_rejects_user_tasks_not_yet_reached() {
    let mut def = linear(approval(&[]));
    def.element_add(ProcessElement::new("Task_B", "Second approval", approval(&[]))).unwrap();
    def.connect("Task_A", "Task_B").unwrap();
    let rt = ProcessRuntime::new(InMemoryInstanceStore::new(), TaskServices::default());
    let inst = rt.trigger(&def, TRIGGER_KEY, json!({})).await.unwrap();
    assert!(!inst.context.state("Task_B").unwrap().flag("requested"));

    let err = rt.respond(&def, inst.id, "Task_B", json!(true)).await.unwrap_err();
    assert!(matches!(err, ProcessError::InvalidTaskState { ref task, .. } if task == "Task_B"), "{err}");
    let defs = vec![def.clone()];
    assert_eq!(rt.inbox(&defs, &[], &[]).await.unwrap().len(), 1);
}

#[tokio::test]
async fn email_renders_templates_and_sends_once() {
    let mailer = Arc::new(RecordingMailer::default());
    let email = ElementKind::Email(EmailTask { from: None,
                                               to: "{{customer.email}}, audit@example.com".into(),
                                               subject: "Invoice {{number}}".into(),
                                               body: "Hello {{customer.name}}".into() });
    let def = linear(email);
    let rt = ProcessRuntime::new(InMemoryInstanceStore::new(), TaskServices::default().with_mailer(mailer.clone()));
    let inst = rt.trigger(&def,
                          TRIGGER_KEY,
                          json!({"number": 12, "customer": {"name": "Ada", "email": "ada@example.com"}}))
                 .await
                 .unwrap();
    assert_eq!(inst.status, InstanceStatus::Completed);

    let sent = mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, vec!["ada@example.com", "audit@example.com"]);
    assert_eq!(sent[0].subject, "Invoice 12");
    assert_eq!(sent[0].body, "Hello Ada");

    let state = inst.context.state("Task_A").unwrap();
    assert_eq!(state.get("sentTo"), Some(&json!(["ada@example.com", "audit@example.com"])));
    assert!(state.get("sent").is_none());

    rt.resume(&def, inst.id).await.unwrap();
    assert_eq!(mailer.sent().len(), 1);
}

#[tokio::test]
async fn email_without_recipients_fails_the_task() {
    let email = ElementKind::Email(EmailTask { from: None,
                                               to: "{{missing}}".into(),
                                               subject: "x".into(),
                                               body: "y".into() });
    let def = linear(email);
    let rt = ProcessRuntime::new(InMemoryInstanceStore::new(), TaskServices::default());
    let inst = rt.trigger(&def, TRIGGER_KEY, json!({})).await.unwrap();
    assert_eq!(inst.status, InstanceStatus::Error);
    assert_eq!(inst.context.status_of("Task_A"), TaskStatus::Error);
}
