//! Errores del modelo de esquema y de la migración.
//!
//! Taxonomía:
//! - `DbError`: error crudo de la base de datos, clasificado por número MySQL.
//!   Las clases "ya existe" / "ya no existe" se convierten en éxito en el
//!   motor de migración.
//! - `MigrationError`: error DDL no idempotente, con el contexto de
//!   tabla/objetivo adjunto.
//! - `SchemaError`: definición inválida (nombres, referencias) o migración
//!   fallida.
//! - `ValidationError`: error de datos a nivel de campo. Nunca se lanza: se
//!   devuelve en listas.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::migration::MigrationOp;

/// Clases de error relevantes del servidor MySQL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DbErrorCode {
    /// ER_TABLE_EXISTS_ERROR (1050)
    TableExists,
    /// ER_BAD_TABLE_ERROR (1051)
    BadTable,
    /// ER_BAD_FIELD_ERROR (1054)
    BadField,
    /// ER_DUP_FIELDNAME (1060)
    DupFieldName,
    /// ER_DUP_KEYNAME (1061)
    DupKeyName,
    /// ER_KEY_COLUMN_DOES_NOT_EXITS (1072)
    KeyColumnMissing,
    /// ER_CANT_DROP_FIELD_OR_KEY (1091)
    CantDropFieldOrKey,
    /// ER_NO_SUCH_TABLE (1146)
    NoSuchTable,
    /// ER_TRG_ALREADY_EXISTS (1359)
    TrgAlreadyExists,
    /// ER_TRG_DOES_NOT_EXIST (1360)
    TrgDoesNotExist,
    /// Cualquier otro número de error del servidor.
    Other(u16),
    /// Error sin número (conexión, protocolo, driver).
    Unknown,
}

impl DbErrorCode {
    pub fn from_mysql(number: u16) -> Self {
        match number {
            1050 => Self::TableExists,
            1051 => Self::BadTable,
            1054 => Self::BadField,
            1060 => Self::DupFieldName,
            1061 => Self::DupKeyName,
            1072 => Self::KeyColumnMissing,
            1091 => Self::CantDropFieldOrKey,
            1146 => Self::NoSuchTable,
            1359 => Self::TrgAlreadyExists,
            1360 => Self::TrgDoesNotExist,
            other => Self::Other(other),
        }
    }

    pub fn mysql_number(&self) -> Option<u16> {
        match self {
            Self::TableExists => Some(1050),
            Self::BadTable => Some(1051),
            Self::BadField => Some(1054),
            Self::DupFieldName => Some(1060),
            Self::DupKeyName => Some(1061),
            Self::KeyColumnMissing => Some(1072),
            Self::CantDropFieldOrKey => Some(1091),
            Self::NoSuchTable => Some(1146),
            Self::TrgAlreadyExists => Some(1359),
            Self::TrgDoesNotExist => Some(1360),
            Self::Other(n) => Some(*n),
            Self::Unknown => None,
        }
    }

    fn symbol(&self) -> &'static str {
        match self {
            Self::TableExists => "ER_TABLE_EXISTS_ERROR",
            Self::BadTable => "ER_BAD_TABLE_ERROR",
            Self::BadField => "ER_BAD_FIELD_ERROR",
            Self::DupFieldName => "ER_DUP_FIELDNAME",
            Self::DupKeyName => "ER_DUP_KEYNAME",
            Self::KeyColumnMissing => "ER_KEY_COLUMN_DOES_NOT_EXITS",
            Self::CantDropFieldOrKey => "ER_CANT_DROP_FIELD_OR_KEY",
            Self::NoSuchTable => "ER_NO_SUCH_TABLE",
            Self::TrgAlreadyExists => "ER_TRG_ALREADY_EXISTS",
            Self::TrgDoesNotExist => "ER_TRG_DOES_NOT_EXIST",
            Self::Other(_) => "ER_OTHER",
            Self::Unknown => "ER_UNKNOWN",
        }
    }

    /// El objeto que se intentaba crear ya existe.
    pub fn is_already_exists(&self) -> bool {
        matches!(self,
                 Self::TableExists | Self::DupFieldName | Self::DupKeyName | Self::TrgAlreadyExists)
    }

    /// El objeto que se intentaba eliminar ya no existe.
    pub fn is_already_absent(&self) -> bool {
        matches!(self,
                 Self::BadTable | Self::CantDropFieldOrKey | Self::NoSuchTable | Self::TrgDoesNotExist)
    }
}

impl fmt::Display for DbErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.mysql_number() {
            Some(n) => write!(f, "{}({})", self.symbol(), n),
            None => f.write_str(self.symbol()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{code}: {message}")]
pub struct DbError {
    pub code: DbErrorCode,
    pub message: String,
}

impl DbError {
    pub fn new(code: DbErrorCode, message: impl Into<String>) -> Self {
        Self { code,
               message: message.into() }
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(DbErrorCode::Unknown, message)
    }
}

/// Error DDL no idempotente. `table` y `target` identifican qué se estaba
/// migrando cuando falló la sentencia.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{op} {target} on `{table}` failed: {source}")]
pub struct MigrationError {
    pub op: MigrationOp,
    pub table: String,
    pub target: String,
    #[source]
    pub source: DbError,
}

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("invalid identifier `{name}`: {reason}")]
    InvalidIdentifier { name: String, reason: String },
    #[error("column `{column}` already defined on object `{object}`")]
    DuplicateColumn { object: String, column: String },
    #[error("column `{column}` is reserved on object `{object}`")]
    ReservedColumn { object: String, column: String },
    #[error("index `{index}` already defined on object `{object}`")]
    DuplicateIndex { object: String, index: String },
    #[error("field {field_id} not found on object `{object}`")]
    UnknownField { object: String, field_id: String },
    #[error("field `{field}` references unresolved combined field `{reference}`")]
    UnresolvedCombinedField { field: String, reference: String },
    #[error("computed field `{field}` cannot combine `{reference}`: it has no column on the object table")]
    CombinedFieldWithoutColumn { field: String, reference: String },
    #[error("invalid definition: {0}")]
    InvalidDefinition(String),
    #[error(transparent)]
    Migration(#[from] MigrationError),
}

/// Error de validación de datos de un campo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    pub column: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self { column: column.into(),
               message: message.into() }
    }
}
