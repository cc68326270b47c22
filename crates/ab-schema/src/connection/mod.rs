//! Conexión DDL abstracta.
//!
//! Contrato:
//! - Las consultas de existencia (`*_exists`) leen el catálogo real
//!   (`SHOW INDEXES`, `information_schema`), nunca un estado cacheado.
//! - Las comparaciones (`*_matches`) dicen si el artefacto existe con la
//!   misma definición; `false` si no existe o si difiere en algo.
//! - `execute` aplica una sentencia y devuelve el `DbError` del servidor sin
//!   reinterpretarlo; la conversión de errores de idempotencia a éxito la
//!   hace el motor de migración.

mod in_memory;

use async_trait::async_trait;

use crate::ddl::{ColumnDef, DdlStatement, Identifier, TriggerBody, TriggerEvent};
use crate::error::DbError;

pub use in_memory::{CatalogSnapshot, InMemoryCatalog, IndexState, TableState, TriggerState};

#[async_trait]
pub trait DdlConnection: Send {
    async fn table_exists(&mut self, table: &Identifier) -> Result<bool, DbError>;

    async fn column_exists(&mut self, table: &Identifier, column: &Identifier) -> Result<bool, DbError>;

    async fn index_exists(&mut self, table: &Identifier, index: &Identifier) -> Result<bool, DbError>;

    async fn trigger_exists(&mut self, trigger: &Identifier) -> Result<bool, DbError>;

    /// Tipo, nulabilidad y valor por defecto.
    async fn column_matches(&mut self, table: &Identifier, column: &ColumnDef) -> Result<bool, DbError>;

    /// Columnas (en orden) y unicidad.
    async fn index_matches(&mut self,
                           table: &Identifier,
                           index: &Identifier,
                           columns: &[Identifier],
                           unique: bool)
                           -> Result<bool, DbError>;

    /// Tabla, evento y cuerpo.
    async fn trigger_matches(&mut self,
                             trigger: &Identifier,
                             table: &Identifier,
                             event: TriggerEvent,
                             body: &TriggerBody)
                             -> Result<bool, DbError>;

    async fn execute(&mut self, stmt: &DdlStatement) -> Result<(), DbError>;
}
