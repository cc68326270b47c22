//! Lectura de definiciones (objetos y procesos) desde ficheros JSON.

use ab_core::ProcessDefinition;
use ab_schema::ObjectDefinition;
use serde::de::DeserializeOwned;
use std::path::Path;

use crate::errors::AppError;

fn read_json<T>(path: &Path) -> Result<T, AppError>
    where T: DeserializeOwned
{
    let display = path.display().to_string();
    let raw = std::fs::read_to_string(path).map_err(|source| AppError::Io { path: display.clone(),
                                                                            source })?;
    serde_json::from_str(&raw).map_err(|source| AppError::Json { path: display,
                                                                 source })
}

/// Objeto validado (nombres, referencias, colisiones de nombres derivados).
pub fn load_object(path: impl AsRef<Path>) -> Result<ObjectDefinition, AppError> {
    let object: ObjectDefinition = read_json(path.as_ref())?;
    object.validate()?;
    Ok(object)
}

/// Proceso validado (grafo consistente con al menos un Trigger).
pub fn load_process(path: impl AsRef<Path>) -> Result<ProcessDefinition, AppError> {
    let process: ProcessDefinition = read_json(path.as_ref())?;
    process.validate()?;
    Ok(process)
}
