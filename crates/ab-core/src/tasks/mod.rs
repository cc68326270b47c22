//! Tareas ejecutables de un proceso.
//!
//! Cada variante de tarea implementa `ProcessTask`. El despacho es cerrado:
//! `ElementKind::as_task` decide por `match` qué implementación atiende a un
//! elemento, sin registro dinámico por clave.

mod email;
mod end;
mod passthrough;
mod run;
mod service_query;
mod services;
pub mod template;
mod trigger;
mod user_task;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::context::{ProcessContext, TaskState};
use crate::errors::ProcessError;

pub use email::EmailTask;
pub use end::EndTask;
pub use passthrough::{GatewayTask, GenericTask};
pub use run::TaskRun;
pub use service_query::ServiceQueryTask;
pub use services::{EmailMessage, LogMailer, Mailer, QueryRunner, TaskServices, UnconfiguredQueryRunner};
pub use trigger::TriggerTask;
pub use user_task::UserTask;

#[async_trait]
pub trait ProcessTask: Send + Sync {
    /// Estado por defecto de la tarea antes de aplicar overrides.
    fn default_state(&self, _context: &ProcessContext) -> TaskState {
        TaskState::waiting()
    }

    /// Siembra el estado de la tarea. Las claves de `overrides` siempre
    /// ganan sobre los valores por defecto.
    fn init_state(&self,
                  context: &ProcessContext,
                  overrides: Option<&Map<String, Value>>)
                  -> Result<TaskState, ProcessError> {
        self.default_state(context).merged(overrides)
    }

    /// Ejecuta el efecto de la tarea. `Ok(true)`: completada, la instancia
    /// puede avanzar. `Ok(false)`: sigue esperando (punto de suspensión).
    /// `Err`: la tarea queda en `error` y la instancia se detiene.
    async fn do_task(&self, run: &mut TaskRun<'_>) -> Result<bool, ProcessError>;
}
