//! Error de aplicación: agrega los errores de cada crate del workspace.

use ab_core::ProcessError;
use ab_persistence::PersistenceError;
use ab_schema::SchemaError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("configuración inválida: {0}")]
    Config(String),
    #[error("no se pudo leer {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("JSON inválido en {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error(transparent)]
    Process(#[from] ProcessError),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}
