#![allow(dead_code)]

use ab_core::{ElementKind, EmailMessage, EndTask, GatewayTask, GenericTask, Mailer, ProcessContext, ProcessDefinition,
              ProcessElement, QueryRunner, ServiceError, ServiceQueryTask, TriggerTask, UserTask};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

pub const TRIGGER_KEY: &str = "invoice.created";

/// QueryRunner de test: responde `Ok(reply)` o falla con `fail`.
pub struct ScriptedQuery {
    pub reply: Result<Value, String>,
    pub calls: AtomicUsize,
}

impl ScriptedQuery {
    pub fn ok(reply: Value) -> Self {
        Self { reply: Ok(reply),
               calls: AtomicUsize::new(0) }
    }

    pub fn failing(message: &str) -> Self {
        Self { reply: Err(message.to_string()),
               calls: AtomicUsize::new(0) }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QueryRunner for ScriptedQuery {
    async fn run(&self, _query: &Value, _context: &ProcessContext) -> Result<Value, ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.reply.clone().map_err(ServiceError::new)
    }
}

#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<EmailMessage>>,
}

impl RecordingMailer {
    pub fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), ServiceError> {
        self.sent.lock().map_err(|e| ServiceError::new(e.to_string()))?.push(message.clone());
        Ok(())
    }
}

/// Trigger -> Task A -> End, con `task_a` como tarea A.
pub fn linear(task_a: ElementKind) -> ProcessDefinition {
    let mut def = ProcessDefinition::new("Invoice approval");
    def.element_add(ProcessElement::new("StartEvent_1", "Invoice created", ElementKind::Trigger(TriggerTask::new(TRIGGER_KEY))))
       .unwrap();
    def.element_add(ProcessElement::new("Task_A", "Task A", task_a)).unwrap();
    def.element_add(ProcessElement::new("EndEvent_1", "Done", ElementKind::End(EndTask {}))).unwrap();
    def.connect("StartEvent_1", "Task_A").unwrap();
    def.connect("Task_A", "EndEvent_1").unwrap();
    def
}

pub fn generic() -> ElementKind {
    ElementKind::Generic(GenericTask {})
}

pub fn approval(roles: &[&str]) -> ElementKind {
    ElementKind::UserTask(UserTask { roles: roles.iter().map(|r| r.to_string()).collect(),
                                     users: vec![],
                                     instructions: "Approve the invoice".into(),
                                     response_var: Some("approval".into()) })
}

pub fn lookup() -> ElementKind {
    ElementKind::ServiceQuery(ServiceQueryTask { query: json!({"object": "AB_Invoice", "where": {"uuid": "{{id}}"}}),
                                                 output_var: Some("invoice".into()) })
}

/// Trigger -> Gateway -> (A, B) -> Join -> End.
pub fn parallel(a: ElementKind, b: ElementKind) -> ProcessDefinition {
    let mut def = ProcessDefinition::new("Parallel review");
    def.element_add(ProcessElement::new("Start", "start", ElementKind::Trigger(TriggerTask::new(TRIGGER_KEY)))).unwrap();
    def.element_add(ProcessElement::new("Fork", "fork", ElementKind::Gateway(GatewayTask {}))).unwrap();
    def.element_add(ProcessElement::new("A", "Branch A", a)).unwrap();
    def.element_add(ProcessElement::new("B", "Branch B", b)).unwrap();
    def.element_add(ProcessElement::new("Join", "join", ElementKind::Gateway(GatewayTask {}))).unwrap();
    def.element_add(ProcessElement::new("End", "end", ElementKind::End(EndTask {}))).unwrap();
    for (s, t) in [("Start", "Fork"), ("Fork", "A"), ("Fork", "B"), ("A", "Join"), ("B", "Join"), ("Join", "End")] {
        def.connect(s, t).unwrap();
    }
    def
}
