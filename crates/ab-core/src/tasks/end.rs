use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{ProcessTask, TaskRun};
use crate::errors::ProcessError;

/// Fin del proceso. Al completarse, la instancia pasa a `completed`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndTask {}

#[async_trait]
impl ProcessTask for EndTask {
    async fn do_task(&self, _run: &mut TaskRun<'_>) -> Result<bool, ProcessError> {
        Ok(true)
    }
}
