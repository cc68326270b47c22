//! Colaboradores externos de las tareas.

use async_trait::async_trait;
use log::info;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use crate::context::ProcessContext;
use crate::errors::ServiceError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailMessage {
    pub from: Option<String>,
    pub to: Vec<String>,
    pub subject: String,
    pub body: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<(), ServiceError>;
}

/// Ejecuta una consulta del lenguaje de consultas (QL) ya renderizada.
#[async_trait]
pub trait QueryRunner: Send + Sync {
    async fn run(&self, query: &Value, context: &ProcessContext) -> Result<Value, ServiceError>;
}

/// Mailer que sólo registra el envío en el log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), ServiceError> {
        info!("mail to={} subject={:?}", message.to.join(","), message.subject);
        Ok(())
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct UnconfiguredQueryRunner;

#[async_trait]
impl QueryRunner for UnconfiguredQueryRunner {
    async fn run(&self, _query: &Value, _context: &ProcessContext) -> Result<Value, ServiceError> {
        Err(ServiceError::new("no query runner configured"))
    }
}

#[derive(Clone)]
pub struct TaskServices {
    pub mailer: Arc<dyn Mailer>,
    pub query_runner: Arc<dyn QueryRunner>,
}

impl TaskServices {
    pub fn new(mailer: Arc<dyn Mailer>, query_runner: Arc<dyn QueryRunner>) -> Self {
        Self { mailer,
               query_runner }
    }

    pub fn with_mailer(mut self, mailer: Arc<dyn Mailer>) -> Self {
        self.mailer = mailer;
        self
    }

    pub fn with_query_runner(mut self, query_runner: Arc<dyn QueryRunner>) -> Self {
        self.query_runner = query_runner;
        self
    }
}

impl Default for TaskServices {
    fn default() -> Self {
        Self::new(Arc::new(LogMailer), Arc::new(UnconfiguredQueryRunner))
    }
}

impl fmt::Debug for TaskServices {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskServices").finish_non_exhaustive()
    }
}
