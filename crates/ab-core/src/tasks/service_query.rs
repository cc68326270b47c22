use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::template::render_value;
use super::{ProcessTask, TaskRun};
use crate::errors::ProcessError;

/// Delega en el `QueryRunner` una consulta QL y guarda su resultado.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceQueryTask {
    pub query: Value,
    /// Variable de proceso donde copiar el resultado.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_var: Option<String>,
}

#[async_trait]
impl ProcessTask for ServiceQueryTask {
    async fn do_task(&self, run: &mut TaskRun<'_>) -> Result<bool, ProcessError> {
        let query = render_value(&self.query, run.context());
        let runner = run.services().query_runner.clone();
        let result = runner.run(&query, run.context())
                           .await
                           .map_err(|e| run.fail(format!("QL error: {e}")))?;
        if let Some(var) = &self.output_var {
            run.set_var(var, result.clone())?;
        }
        run.state_mut().set("result", result);
        Ok(true)
    }
}
