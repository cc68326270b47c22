use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{ProcessTask, TaskRun};
use crate::context::{ProcessContext, TaskState};
use crate::errors::ProcessError;

/// Aprobación humana a través del inbox. Espera hasta que el estado de la
/// tarea tenga `response`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserTask {
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub users: Vec<String>,
    #[serde(default)]
    pub instructions: String,
    /// Variable de proceso donde copiar la respuesta.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_var: Option<String>,
}

impl UserTask {
    /// Sin roles ni usuarios declarados, la tarea es visible para todos.
    pub fn visible_to(&self, roles: &[String], users: &[String]) -> bool {
        if self.roles.is_empty() && self.users.is_empty() {
            return true;
        }
        self.roles.iter().any(|r| roles.contains(r)) || self.users.iter().any(|u| users.contains(u))
    }
}

#[async_trait]
impl ProcessTask for UserTask {
    fn default_state(&self, _context: &ProcessContext) -> TaskState {
        let mut state = TaskState::waiting();
        state.set("requested", Value::Bool(false));
        state
    }

    async fn do_task(&self, run: &mut TaskRun<'_>) -> Result<bool, ProcessError> {
        if let Some(response) = run.state().and_then(|s| s.get("response")).cloned() {
            if let Some(var) = &self.response_var {
                run.set_var(var, response)?;
            }
            return Ok(true);
        }
        let state = run.state_mut();
        if !state.flag("requested") {
            state.set("requested", Value::Bool(true));
            state.set("requestedAt", Value::String(Utc::now().to_rfc3339()));
        }
        Ok(false)
    }
}
