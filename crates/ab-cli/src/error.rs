use ab_core::ProcessError;
use ab_schema::SchemaError;
use appbuilder::AppError;
use thiserror::Error;

/// Errores de la CLI con su código de salida.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("{0}")]
    Usage(String),
    #[error("entrada inválida: {0}")]
    Input(String),
    #[error("rechazado: {0}")]
    Rejected(String),
    #[error("error: {0}")]
    Backend(String),
}

impl CliError {
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Usage(_) => 2,
            Self::Input(_) => 3,
            Self::Rejected(_) => 4,
            Self::Backend(_) => 5,
        }
    }
}

impl From<ProcessError> for CliError {
    fn from(err: ProcessError) -> Self {
        match err {
            ProcessError::UnknownInstance(_)
            | ProcessError::UnknownElement(_)
            | ProcessError::NoTriggerForKey(_)
            | ProcessError::InvalidTaskState { .. } => Self::Rejected(err.to_string()),
            ProcessError::InvalidContext(_) | ProcessError::ReservedKey(_) | ProcessError::Definition(_) => {
                Self::Input(err.to_string())
            }
            other => Self::Backend(other.to_string()),
        }
    }
}

impl From<AppError> for CliError {
    fn from(err: AppError) -> Self {
        match err {
            AppError::Schema(SchemaError::Migration(m)) => Self::Backend(m.to_string()),
            AppError::Config(_) | AppError::Io { .. } | AppError::Json { .. } | AppError::Schema(_) => {
                Self::Input(err.to_string())
            }
            AppError::Process(e) => e.into(),
            AppError::Persistence(e) => Self::Backend(e.to_string()),
        }
    }
}
