//! DDL estructurado.
//!
//! Ninguna sentencia se arma concatenando nombres crudos: los nombres pasan
//! por `Identifier` (validado) y el `DdlDialect` se encarga del quoting de
//! identificadores y literales al renderizar.

mod dialect;
mod identifier;
mod statement;

pub use dialect::{DdlDialect, MySqlDialect};
pub use identifier::Identifier;
pub use statement::{ColumnDef, ColumnType, DdlStatement, DefaultValue, TriggerBody, TriggerEvent};
