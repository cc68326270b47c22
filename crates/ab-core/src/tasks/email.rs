use async_trait::async_trait;
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::services::EmailMessage;
use super::template::render;
use super::{ProcessTask, TaskRun};
use crate::context::ProcessContext;
use crate::errors::ProcessError;

/// Envía un correo con plantillas `{{var}}` resueltas desde el contexto.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailTask {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    /// Destinatarios separados por coma; admite plantillas.
    pub to: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub body: String,
}

impl EmailTask {
    pub fn message(&self, context: &ProcessContext) -> EmailMessage {
        let to = render(&self.to, context).split(',')
                                          .map(str::trim)
                                          .filter(|s| !s.is_empty())
                                          .map(str::to_string)
                                          .collect();
        EmailMessage { from: self.from.as_ref().map(|f| render(f, context)),
                       to,
                       subject: render(&self.subject, context),
                       body: render(&self.body, context) }
    }
}

#[async_trait]
impl ProcessTask for EmailTask {
    /// Se completa en la misma escritura que registra el envío: una tarea
    /// completada no vuelve a ejecutarse.
    async fn do_task(&self, run: &mut TaskRun<'_>) -> Result<bool, ProcessError> {
        let message = self.message(run.context());
        if message.to.is_empty() {
            return Err(run.fail("email has no recipients"));
        }
        run.services()
           .mailer
           .send(&message)
           .await
           .map_err(|e| run.fail(format!("email delivery failed: {e}")))?;
        debug!("email sent task={} to={}", run.task_id(), message.to.join(","));
        run.state_mut().set("sentTo", json!(message.to));
        Ok(true)
    }
}
