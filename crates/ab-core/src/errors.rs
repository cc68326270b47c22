//! Errores del motor de procesos.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("invalid context: {0}")]
    InvalidContext(String),
    #[error("`{0}` is a reserved context key")]
    ReservedKey(String),
    #[error("invalid process definition: {0}")]
    Definition(String),
    #[error("element `{0}` not found in process definition")]
    UnknownElement(String),
    #[error("process instance {0} not found")]
    UnknownInstance(Uuid),
    #[error("no trigger bound to key `{0}`")]
    NoTriggerForKey(String),
    #[error("task `{task}` is {status}; expected {expected}")]
    InvalidTaskState {
        task: String,
        status: String,
        expected: String,
    },
    #[error("{task}: {message}")]
    Task { task: String, message: String },
    #[error("step budget of {0} task executions exceeded")]
    StepBudgetExceeded(usize),
    #[error("instance store: {0}")]
    Store(String),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

impl ProcessError {
    pub fn task(task: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Task { task: task.into(),
                     message: message.into() }
    }
}

/// Error de un colaborador externo (mailer, query runner).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ServiceError(pub String);

impl ServiceError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}
