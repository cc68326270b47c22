use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{ProcessTask, TaskRun};
use crate::context::{ProcessContext, TaskState};
use crate::errors::ProcessError;

/// Punto de entrada de un proceso, ligado a una clave de evento externa.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerTask {
    pub trigger_key: String,
}

impl TriggerTask {
    pub fn new(trigger_key: impl Into<String>) -> Self {
        Self { trigger_key: trigger_key.into() }
    }

    /// Construye el contexto de una instancia nueva: `input = data`, el
    /// trigger queda `{triggered: true, status: completed}` y se registra
    /// como `startTaskID`.
    pub fn trigger(&self, task_id: &str, data: Value) -> Result<ProcessContext, ProcessError> {
        let mut context = ProcessContext::new(data);
        let fired = json!({"triggered": true, "status": "completed"});
        let state = self.init_state(&context, fired.as_object())?;
        context.task_state.insert(task_id.to_string(), state);
        context.start_task_id = Some(task_id.to_string());
        Ok(context)
    }
}

#[async_trait]
impl ProcessTask for TriggerTask {
    fn default_state(&self, _context: &ProcessContext) -> TaskState {
        let mut state = TaskState::waiting();
        state.set("triggered", Value::Bool(false));
        state
    }

    async fn do_task(&self, _run: &mut TaskRun<'_>) -> Result<bool, ProcessError> {
        Ok(true)
    }
}
