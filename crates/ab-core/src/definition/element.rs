use serde::{Deserialize, Serialize};

use crate::tasks::{EmailTask, EndTask, GatewayTask, GenericTask, ProcessTask, ServiceQueryTask, TriggerTask, UserTask};

/// Carril del diagrama. No se ejecuta.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    #[serde(default)]
    pub roles: Vec<String>,
}

/// Variantes de elemento. Conjunto cerrado: añadir un tipo de tarea es
/// añadir una variante aquí y su rama en `as_task`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "key", rename_all = "camelCase")]
pub enum ElementKind {
    Participant(Participant),
    Trigger(TriggerTask),
    End(EndTask),
    Email(EmailTask),
    ServiceQuery(ServiceQueryTask),
    UserTask(UserTask),
    Gateway(GatewayTask),
    Generic(GenericTask),
}

impl ElementKind {
    pub fn key(&self) -> &'static str {
        match self {
            Self::Participant(_) => "participant",
            Self::Trigger(_) => "trigger",
            Self::End(_) => "end",
            Self::Email(_) => "email",
            Self::ServiceQuery(_) => "serviceQuery",
            Self::UserTask(_) => "userTask",
            Self::Gateway(_) => "gateway",
            Self::Generic(_) => "generic",
        }
    }

    pub fn as_task(&self) -> Option<&dyn ProcessTask> {
        match self {
            Self::Participant(_) => None,
            Self::Trigger(t) => Some(t),
            Self::End(t) => Some(t),
            Self::Email(t) => Some(t),
            Self::ServiceQuery(t) => Some(t),
            Self::UserTask(t) => Some(t),
            Self::Gateway(t) => Some(t),
            Self::Generic(t) => Some(t),
        }
    }
}

/// Nodo del grafo de proceso, identificado por su id de diagrama.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessElement {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub kind: ElementKind,
}

impl ProcessElement {
    pub fn new(id: impl Into<String>, name: impl Into<String>, kind: ElementKind) -> Self {
        Self { id: id.into(),
               name: name.into(),
               kind }
    }

    /// Nombre para logs: el nombre declarado o, si falta, el id.
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.id
        } else {
            &self.name
        }
    }

    pub fn is_task(&self) -> bool {
        self.kind.as_task().is_some()
    }

    pub fn is_trigger(&self) -> bool {
        matches!(self.kind, ElementKind::Trigger(_))
    }

    pub fn is_end(&self) -> bool {
        matches!(self.kind, ElementKind::End(_))
    }

    pub fn as_user_task(&self) -> Option<&UserTask> {
        match &self.kind {
            ElementKind::UserTask(t) => Some(t),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceFlow {
    pub id: String,
    pub source: String,
    pub target: String,
}
