//! Errores de persistencia.
//! Mapea errores de sqlx / conexión a variantes semánticas y, hacia arriba,
//! a los errores de `ab-schema` (`DbError`) y `ab-core` (`ProcessError`).

use ab_core::ProcessError;
use ab_schema::{DbError, DbErrorCode};
use sqlx::mysql::MySqlDatabaseError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("unique violation: {0}")]
    UniqueViolation(String),
    #[error("check violation: {0}")]
    CheckViolation(String),
    #[error("foreign key violation: {0}")]
    ForeignKeyViolation(String),
    #[error("not found")]
    NotFound,
    #[error("serialization conflict (retryable)")]
    SerializationConflict,
    #[error("transient IO / connection pool error: {0}")]
    TransientIo(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("corrupt row: {0}")]
    Decode(String),
    #[error("mysql error {number}: {message}")]
    Database { number: u16, message: String },
    #[error("unknown database error: {0}")]
    Unknown(String),
}

impl PersistenceError {
    /// Número de error MySQL, si el servidor lo reportó.
    pub fn mysql_number(&self) -> Option<u16> {
        match self {
            Self::Database { number, .. } => Some(*number),
            _ => None,
        }
    }
}

/// Número de error del servidor detrás de un `sqlx::Error`.
pub fn mysql_error_number(err: &sqlx::Error) -> Option<u16> {
    match err {
        sqlx::Error::Database(db_err) => db_err.try_downcast_ref::<MySqlDatabaseError>().map(|e| e.number()),
        _ => None,
    }
}

impl From<sqlx::Error> for PersistenceError {
    fn from(err: sqlx::Error) -> Self {
        if let Some(number) = mysql_error_number(&err) {
            let message = err.as_database_error()
                             .map(|d| d.message().to_string())
                             .unwrap_or_default();
            return match number {
                // ER_DUP_ENTRY
                1062 => Self::UniqueViolation(message),
                // ER_CHECK_CONSTRAINT_VIOLATED
                3819 => Self::CheckViolation(message),
                // ER_ROW_IS_REFERENCED_2 / ER_NO_REFERENCED_ROW_2
                1451 | 1452 => Self::ForeignKeyViolation(message),
                // ER_LOCK_DEADLOCK / ER_LOCK_WAIT_TIMEOUT
                1213 | 1205 => Self::SerializationConflict,
                number => Self::Database { number, message },
            };
        }
        match err {
            sqlx::Error::RowNotFound => Self::NotFound,
            sqlx::Error::Io(e) => Self::TransientIo(format!("io: {e}")),
            sqlx::Error::PoolTimedOut => Self::TransientIo("pool timed out".into()),
            sqlx::Error::PoolClosed => Self::TransientIo("pool closed".into()),
            sqlx::Error::WorkerCrashed => Self::TransientIo("connection worker crashed".into()),
            sqlx::Error::Configuration(e) => Self::Config(e.to_string()),
            sqlx::Error::ColumnDecode { index, source } => Self::Decode(format!("column {index}: {source}")),
            sqlx::Error::Decode(e) => Self::Decode(e.to_string()),
            other => Self::Unknown(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for PersistenceError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(format!("json: {err}"))
    }
}

impl From<PersistenceError> for DbError {
    fn from(err: PersistenceError) -> Self {
        match &err {
            PersistenceError::Database { number, message } => DbError::new(DbErrorCode::from_mysql(*number), message.clone()),
            PersistenceError::SerializationConflict => DbError::new(DbErrorCode::Other(1213), err.to_string()),
            _ => DbError::unknown(err.to_string()),
        }
    }
}

impl From<PersistenceError> for ProcessError {
    fn from(err: PersistenceError) -> Self {
        ProcessError::Store(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_errors_are_transient() {
        assert!(matches!(PersistenceError::from(sqlx::Error::PoolTimedOut), PersistenceError::TransientIo(_)));
        assert!(matches!(PersistenceError::from(sqlx::Error::RowNotFound), PersistenceError::NotFound));
    }

    #[test]
    fn database_errors_keep_their_number_for_ddl() {
        let err = PersistenceError::Database { number: 1061,
                                               message: "Duplicate key name 'UNQ_AB_Invoice_fullName'".into() };
        assert_eq!(err.mysql_number(), Some(1061));
        let db: DbError = err.into();
        assert_eq!(db.code, DbErrorCode::DupKeyName);
        assert!(db.code.is_already_exists());
    }

    #[test]
    fn store_errors_surface_as_process_errors() {
        let err: ProcessError = PersistenceError::NotFound.into();
        assert!(matches!(err, ProcessError::Store(m) if m == "not found"));
    }
}
