use async_trait::async_trait;
use indexmap::IndexMap;
use std::collections::BTreeMap;

use super::DdlConnection;
use crate::ddl::{ColumnDef, DdlDialect, DdlStatement, Identifier, MySqlDialect, TriggerBody, TriggerEvent};
use crate::error::{DbError, DbErrorCode};

#[derive(Debug, Clone, PartialEq)]
pub struct IndexState {
    pub columns: Vec<String>,
    pub unique: bool,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TableState {
    pub columns: IndexMap<String, ColumnDef>,
    pub indexes: BTreeMap<String, IndexState>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TriggerState {
    pub table: String,
    pub event: TriggerEvent,
    pub body: TriggerBody,
}

/// Foto del esquema para comparar estados antes/después de una migración.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CatalogSnapshot {
    pub tables: BTreeMap<String, TableState>,
    pub triggers: BTreeMap<String, TriggerState>,
}

#[derive(Debug)]
struct Fault {
    fragment: String,
    error: DbError,
}

/// Catálogo MySQL simulado en memoria.
///
/// Reproduce los códigos de error del servidor para cada sentencia DDL
/// (tabla duplicada, índice inexistente, trigger ya existente, ...) y
/// registra el SQL renderizado de cada sentencia ejecutada con éxito. Sirve
/// como backend de paridad para tests del motor de migración.
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    state: CatalogSnapshot,
    executed: Vec<String>,
    faults: Vec<Fault>,
    blind_checks: bool,
    dialect: MySqlDialect,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// SQL de las sentencias aplicadas, en orden.
    pub fn executed(&self) -> &[String] {
        &self.executed
    }

    pub fn clear_log(&mut self) {
        self.executed.clear();
    }

    pub fn snapshot(&self) -> CatalogSnapshot {
        self.state.clone()
    }

    pub fn table(&self, table: &str) -> Option<&TableState> {
        self.state.tables.get(table)
    }

    pub fn trigger(&self, name: &str) -> Option<&TriggerState> {
        self.state.triggers.get(name)
    }

    /// La próxima sentencia cuyo SQL contenga `fragment` falla con `error`.
    pub fn fail_next(&mut self, fragment: impl Into<String>, error: DbError) {
        self.faults.push(Fault { fragment: fragment.into(),
                                 error });
    }

    /// Con `true` las consultas de existencia responden siempre `false`,
    /// simulando un catálogo leído antes de que otro actor aplicara el DDL.
    pub fn set_blind_checks(&mut self, blind: bool) {
        self.blind_checks = blind;
    }

    fn take_fault(&mut self, sql: &str) -> Option<DbError> {
        let pos = self.faults.iter().position(|f| sql.contains(&f.fragment))?;
        Some(self.faults.remove(pos).error)
    }

    fn table_mut(&mut self, table: &Identifier) -> Result<&mut TableState, DbError> {
        self.state
            .tables
            .get_mut(table.as_str())
            .ok_or_else(|| DbError::new(DbErrorCode::NoSuchTable, format!("Table '{table}' doesn't exist")))
    }

    fn apply(&mut self, stmt: &DdlStatement) -> Result<(), DbError> {
        match stmt {
            DdlStatement::CreateTable { table, columns, .. } => {
                if self.state.tables.contains_key(table.as_str()) {
                    return Err(DbError::new(DbErrorCode::TableExists, format!("Table '{table}' already exists")));
                }
                let mut state = TableState::default();
                for c in columns {
                    state.columns.insert(c.name.to_string(), c.clone());
                }
                self.state.tables.insert(table.to_string(), state);
            }
            DdlStatement::DropTable { table } => {
                if self.state.tables.remove(table.as_str()).is_none() {
                    return Err(DbError::new(DbErrorCode::BadTable, format!("Unknown table '{table}'")));
                }
                // MySQL elimina los triggers de la tabla junto con ella.
                self.state.triggers.retain(|_, t| t.table != table.as_str());
            }
            DdlStatement::AddColumn { table, column } => {
                let t = self.table_mut(table)?;
                if t.columns.contains_key(column.name.as_str()) {
                    return Err(DbError::new(DbErrorCode::DupFieldName,
                                            format!("Duplicate column name '{}'", column.name)));
                }
                t.columns.insert(column.name.to_string(), column.clone());
            }
            DdlStatement::ModifyColumn { table, column } => {
                let t = self.table_mut(table)?;
                match t.columns.get_mut(column.name.as_str()) {
                    Some(existing) => *existing = column.clone(),
                    None => {
                        return Err(DbError::new(DbErrorCode::BadField,
                                                format!("Unknown column '{}' in '{table}'", column.name)))
                    }
                }
            }
            DdlStatement::DropColumn { table, column } => {
                let t = self.table_mut(table)?;
                if t.columns.shift_remove(column.as_str()).is_none() {
                    return Err(DbError::new(DbErrorCode::CantDropFieldOrKey,
                                            format!("Can't DROP '{column}'; check that column/key exists")));
                }
                for idx in t.indexes.values_mut() {
                    idx.columns.retain(|c| c != column.as_str());
                }
                t.indexes.retain(|_, idx| !idx.columns.is_empty());
            }
            DdlStatement::CreateIndex { table, name, columns, unique } => {
                let t = self.table_mut(table)?;
                if t.indexes.contains_key(name.as_str()) {
                    return Err(DbError::new(DbErrorCode::DupKeyName, format!("Duplicate key name '{name}'")));
                }
                if let Some(missing) = columns.iter().find(|c| !t.columns.contains_key(c.as_str())) {
                    return Err(DbError::new(DbErrorCode::KeyColumnMissing,
                                            format!("Key column '{missing}' doesn't exist in table")));
                }
                t.indexes.insert(name.to_string(),
                                 IndexState { columns: columns.iter().map(|c| c.to_string()).collect(),
                                              unique: *unique });
            }
            DdlStatement::DropIndex { table, name } => {
                let t = self.table_mut(table)?;
                if t.indexes.remove(name.as_str()).is_none() {
                    return Err(DbError::new(DbErrorCode::CantDropFieldOrKey,
                                            format!("Can't DROP '{name}'; check that column/key exists")));
                }
            }
            DdlStatement::CreateTrigger { name, table, event, body } => {
                if self.state.triggers.contains_key(name.as_str()) {
                    return Err(DbError::new(DbErrorCode::TrgAlreadyExists, "Trigger already exists"));
                }
                let t = self.table_mut(table)?;
                let TriggerBody::Concat { target, sources, .. } = body;
                if let Some(missing) = std::iter::once(target).chain(sources.iter())
                                                              .find(|c| !t.columns.contains_key(c.as_str()))
                {
                    return Err(DbError::new(DbErrorCode::BadField, format!("Unknown column '{missing}' in 'NEW'")));
                }
                self.state.triggers.insert(name.to_string(),
                                           TriggerState { table: table.to_string(),
                                                          event: *event,
                                                          body: body.clone() });
            }
            DdlStatement::DropTrigger { name } => {
                if self.state.triggers.remove(name.as_str()).is_none() {
                    return Err(DbError::new(DbErrorCode::TrgDoesNotExist, "Trigger does not exist"));
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl DdlConnection for InMemoryCatalog {
    async fn table_exists(&mut self, table: &Identifier) -> Result<bool, DbError> {
        Ok(!self.blind_checks && self.state.tables.contains_key(table.as_str()))
    }

    async fn column_exists(&mut self, table: &Identifier, column: &Identifier) -> Result<bool, DbError> {
        Ok(!self.blind_checks
           && self.state
                  .tables
                  .get(table.as_str())
                  .is_some_and(|t| t.columns.contains_key(column.as_str())))
    }

    async fn index_exists(&mut self, table: &Identifier, index: &Identifier) -> Result<bool, DbError> {
        Ok(!self.blind_checks
           && self.state
                  .tables
                  .get(table.as_str())
                  .is_some_and(|t| t.indexes.contains_key(index.as_str())))
    }

    async fn trigger_exists(&mut self, trigger: &Identifier) -> Result<bool, DbError> {
        Ok(!self.blind_checks && self.state.triggers.contains_key(trigger.as_str()))
    }

    async fn column_matches(&mut self, table: &Identifier, column: &ColumnDef) -> Result<bool, DbError> {
        Ok(!self.blind_checks
           && self.state
                  .tables
                  .get(table.as_str())
                  .and_then(|t| t.columns.get(column.name.as_str()))
                  .is_some_and(|c| c == column))
    }

    async fn index_matches(&mut self,
                           table: &Identifier,
                           index: &Identifier,
                           columns: &[Identifier],
                           unique: bool)
                           -> Result<bool, DbError> {
        let Some(state) = self.state.tables.get(table.as_str()).and_then(|t| t.indexes.get(index.as_str())) else {
            return Ok(false);
        };
        Ok(!self.blind_checks
           && state.unique == unique
           && state.columns.iter().map(String::as_str).eq(columns.iter().map(Identifier::as_str)))
    }

    async fn trigger_matches(&mut self,
                             trigger: &Identifier,
                             table: &Identifier,
                             event: TriggerEvent,
                             body: &TriggerBody)
                             -> Result<bool, DbError> {
        Ok(!self.blind_checks
           && self.state
                  .triggers
                  .get(trigger.as_str())
                  .is_some_and(|t| t.table == table.as_str() && t.event == event && &t.body == body))
    }

    async fn execute(&mut self, stmt: &DdlStatement) -> Result<(), DbError> {
        let sql = self.dialect.render(stmt);
        if let Some(err) = self.take_fault(&sql) {
            return Err(err);
        }
        self.apply(stmt)?;
        self.executed.push(sql);
        Ok(())
    }
}
