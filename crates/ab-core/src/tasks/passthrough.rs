use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{ProcessTask, TaskRun};
use crate::errors::ProcessError;

/// Gateway paralelo. El fork y el join salen del grafo: una tarea sólo es
/// ejecutable cuando todos sus predecesores están completados.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayTask {}

#[async_trait]
impl ProcessTask for GatewayTask {
    async fn do_task(&self, _run: &mut TaskRun<'_>) -> Result<bool, ProcessError> {
        Ok(true)
    }
}

/// Tarea base sin efecto.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenericTask {}

#[async_trait]
impl ProcessTask for GenericTask {
    async fn do_task(&self, _run: &mut TaskRun<'_>) -> Result<bool, ProcessError> {
        Ok(true)
    }
}
