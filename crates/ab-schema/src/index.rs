//! Índices declarados explícitamente sobre uno o varios campos de un objeto.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::connection::DdlConnection;
use crate::ddl::Identifier;
use crate::error::SchemaError;
use crate::field::FieldDefinition;
use crate::migration::{MigrationEngine, MigrationPlan, MigrationReport, SchemaArtifact};
use crate::naming;
use crate::object::ObjectDefinition;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexDefinition {
    pub id: Uuid,
    /// Etiqueta del builder; el nombre físico siempre se deriva.
    #[serde(default)]
    pub name: String,
    pub field_ids: Vec<Uuid>,
    #[serde(default)]
    pub unique: bool,
}

impl IndexDefinition {
    pub fn new(name: impl Into<String>, field_ids: Vec<Uuid>, unique: bool) -> Self {
        Self { id: Uuid::new_v4(),
               name: name.into(),
               field_ids,
               unique }
    }

    fn columns_from(&self, object: &ObjectDefinition, overrides: &[&FieldDefinition]) -> Result<Vec<String>, SchemaError> {
        if self.field_ids.is_empty() {
            return Err(SchemaError::InvalidDefinition(format!("index {} on `{}` has no fields", self.id, object.name)));
        }
        self.field_ids
            .iter()
            .map(|id| {
                overrides.iter()
                         .copied()
                         .find(|f| f.id == *id)
                         .or_else(|| object.field_by_id(*id))
                         .map(|f| f.column_name.clone())
                         .ok_or_else(|| SchemaError::UnknownField { object: object.name.clone(),
                                                                    field_id: id.to_string() })
            })
            .collect()
    }

    fn derive_name(&self, object: &ObjectDefinition, columns: &[String]) -> String {
        let cols: Vec<&str> = columns.iter().map(String::as_str).collect();
        naming::index_name(&object.db_table_name(), &cols, self.unique)
    }

    pub fn index_name(&self, object: &ObjectDefinition) -> Result<String, SchemaError> {
        let columns = self.columns_from(object, &[])?;
        Ok(self.derive_name(object, &columns))
    }

    pub fn artifacts(&self, object: &ObjectDefinition) -> Result<Vec<SchemaArtifact>, SchemaError> {
        self.artifacts_with(object, &[])
    }

    /// Resuelve las columnas dando prioridad a `overrides` (versiones
    /// anteriores de campos) antes que a los campos actuales del objeto.
    pub fn artifacts_with(&self,
                          object: &ObjectDefinition,
                          overrides: &[&FieldDefinition])
                          -> Result<Vec<SchemaArtifact>, SchemaError> {
        let columns = self.columns_from(object, overrides)?;
        let name = self.derive_name(object, &columns);
        Ok(vec![SchemaArtifact::Index { table: Identifier::new(object.db_table_name())?,
                                        name: Identifier::new(name)?,
                                        columns: columns.into_iter().map(Identifier::new).collect::<Result<_, _>>()?,
                                        unique: self.unique }])
    }

    pub async fn migrate_create<C>(&self, object: &ObjectDefinition, conn: &mut C) -> Result<MigrationReport, SchemaError>
        where C: DdlConnection + ?Sized
    {
        Ok(MigrationEngine::new(conn).apply(&MigrationPlan::create(self.artifacts(object)?)).await?)
    }

    /// Recrea el índice (DROP + ADD) si el catálogo tiene otra definición.
    pub async fn migrate_update<C>(&self, object: &ObjectDefinition, conn: &mut C) -> Result<MigrationReport, SchemaError>
        where C: DdlConnection + ?Sized
    {
        Ok(MigrationEngine::new(conn).apply(&MigrationPlan::update(self.artifacts(object)?)).await?)
    }

    pub async fn migrate_drop<C>(&self, object: &ObjectDefinition, conn: &mut C) -> Result<MigrationReport, SchemaError>
        where C: DdlConnection + ?Sized
    {
        Ok(MigrationEngine::new(conn).apply(&MigrationPlan::drop(self.artifacts(object)?)).await?)
    }
}
