//! ab-schema: modelo de objetos/campos/índices y motor de migración DDL.
//!
//! Un `ObjectDefinition` describe una entidad respaldada por una única tabla.
//! Sus `FieldDefinition` e `IndexDefinition` se expanden a artefactos de
//! esquema (tabla, columnas, índices, triggers) que el `MigrationEngine`
//! aplica de forma idempotente contra una `DdlConnection`.
//!
//! Módulos:
//! - `naming`: derivación determinista de nombres (tablas, índices, triggers).
//! - `ddl`: constructor estructurado de DDL y dialecto (`DdlDialect`).
//! - `connection`: trait `DdlConnection` + catálogo en memoria.
//! - `field`, `index`, `object`: definiciones del modelo.
//! - `migration`: artefactos, planes y el motor de migración.

pub mod connection;
pub mod ddl;
pub mod error;
pub mod field;
pub mod index;
pub mod migration;
pub mod naming;
pub mod object;

pub use connection::{DdlConnection, InMemoryCatalog};
pub use ddl::{DdlDialect, DdlStatement, Identifier, MySqlDialect};
pub use error::{DbError, DbErrorCode, MigrationError, SchemaError, ValidationError};
pub use field::{FieldDefinition, FieldKey, FieldSettings, LinkType, ListOption, Translation};
pub use index::IndexDefinition;
pub use migration::{MigrationEngine, MigrationOp, MigrationPlan, MigrationReport, ObjectChanges, SchemaArtifact};
pub use object::ObjectDefinition;
