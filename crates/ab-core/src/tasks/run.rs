use serde_json::Value;
use uuid::Uuid;

use super::services::TaskServices;
use crate::context::{ProcessContext, TaskState};
use crate::definition::ProcessElement;
use crate::errors::ProcessError;

/// Vista que recibe una tarea durante `do_task`: lectura del contexto
/// completo, escritura sólo de su propio estado y de variables libres.
pub struct TaskRun<'a> {
    instance_id: Uuid,
    element: &'a ProcessElement,
    context: &'a mut ProcessContext,
    services: &'a TaskServices,
}

impl<'a> TaskRun<'a> {
    pub fn new(instance_id: Uuid,
               element: &'a ProcessElement,
               context: &'a mut ProcessContext,
               services: &'a TaskServices)
               -> Self {
        Self { instance_id,
               element,
               context,
               services }
    }

    pub fn instance_id(&self) -> Uuid {
        self.instance_id
    }

    pub fn task_id(&self) -> &str {
        &self.element.id
    }

    pub fn task_name(&self) -> &str {
        self.element.display_name()
    }

    pub fn context(&self) -> &ProcessContext {
        self.context
    }

    pub fn services(&self) -> &TaskServices {
        self.services
    }

    pub fn state(&self) -> Option<&TaskState> {
        self.context.state(&self.element.id)
    }

    pub fn state_mut(&mut self) -> &mut TaskState {
        self.context.task_state.entry(self.element.id.clone()).or_default()
    }

    pub fn set_var(&mut self, key: &str, value: Value) -> Result<(), ProcessError> {
        self.context.set_var(key, value)
    }

    /// Error atribuido a esta tarea.
    pub fn fail(&self, message: impl Into<String>) -> ProcessError {
        ProcessError::task(self.task_name(), message)
    }
}
