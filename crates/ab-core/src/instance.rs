//! Instancia de proceso persistible.

use chrono::{DateTime, Utc};
use log::info;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::context::ProcessContext;
use crate::errors::ProcessError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstanceStatus {
    Running,
    Waiting,
    Completed,
    Error,
}

impl InstanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Waiting => "waiting",
            Self::Completed => "completed",
            Self::Error => "error",
        }
    }

    /// Estados en los que `resume` no vuelve a ejecutar tareas.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }
}

impl fmt::Display for InstanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InstanceStatus {
    type Err = ProcessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "running" => Ok(Self::Running),
            "waiting" => Ok(Self::Waiting),
            "completed" => Ok(Self::Completed),
            "error" => Ok(Self::Error),
            other => Err(ProcessError::InvalidContext(format!("unknown instance status `{other}`"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub ts: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task: Option<String>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessInstance {
    pub id: Uuid,
    pub process_id: Uuid,
    /// Hash de la definición con la que se creó la instancia.
    pub definition_hash: String,
    pub context: ProcessContext,
    pub status: InstanceStatus,
    #[serde(default)]
    pub log: Vec<LogEntry>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProcessInstance {
    pub fn new(process_id: Uuid, definition_hash: String, context: ProcessContext) -> Self {
        let now = Utc::now();
        Self { id: Uuid::new_v4(),
               process_id,
               definition_hash,
               context,
               status: InstanceStatus::Running,
               log: Vec::new(),
               created_at: now,
               updated_at: now }
    }

    /// Canal de auditoría: anota en la instancia y emite por `log`.
    pub fn log(&mut self, task: Option<&str>, message: impl Into<String>) {
        let message = message.into();
        match task {
            Some(t) => info!("process instance={} task={} {}", self.id, t, message),
            None => info!("process instance={} {}", self.id, message),
        }
        self.log.push(LogEntry { ts: Utc::now(),
                                 task: task.map(str::to_string),
                                 message });
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
