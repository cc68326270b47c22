//! Objeto del builder: una entidad respaldada por una única tabla.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use uuid::Uuid;

use crate::connection::DdlConnection;
use crate::ddl::{ColumnDef, ColumnType, Identifier};
use crate::error::{SchemaError, ValidationError};
use crate::field::{FieldDefinition, FieldKey};
use crate::index::IndexDefinition;
use crate::migration::{MigrationEngine, MigrationReport, ObjectChanges, SchemaArtifact};
use crate::naming;

/// Columnas que toda tabla de objeto trae de serie.
pub const SYSTEM_COLUMNS: [&str; 5] = ["id", "uuid", "created_at", "updated_at", "properties"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectDefinition {
    pub id: Uuid,
    pub name: String,
    /// Nombre físico explícito. Si falta se usa `AB_<name>` saneado.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_name: Option<String>,
    #[serde(default)]
    pub fields: Vec<FieldDefinition>,
    #[serde(default)]
    pub indexes: Vec<IndexDefinition>,
}

impl ObjectDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self { id: Uuid::new_v4(),
               name: name.into(),
               table_name: None,
               fields: Vec::new(),
               indexes: Vec::new() }
    }

    pub fn with_table_name(mut self, table_name: impl Into<String>) -> Self {
        self.table_name = Some(table_name.into());
        self
    }

    pub fn db_table_name(&self) -> String {
        match &self.table_name {
            Some(t) if !t.trim().is_empty() => naming::truncate(t.trim(), naming::MAX_IDENTIFIER_LEN),
            _ => naming::object_table_name(&self.name),
        }
    }

    pub fn field_by_id(&self, id: Uuid) -> Option<&FieldDefinition> {
        self.fields.iter().find(|f| f.id == id)
    }

    pub fn field_by_column(&self, column_name: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|f| f.column_name == column_name)
    }

    pub fn index_by_id(&self, id: Uuid) -> Option<&IndexDefinition> {
        self.indexes.iter().find(|i| i.id == id)
    }

    /// Añade un campo. Rechaza nombres de columna duplicados o reservados.
    pub fn add_field(&mut self, field: FieldDefinition) -> Result<Uuid, SchemaError> {
        Identifier::new(field.column_name.clone())?;
        if SYSTEM_COLUMNS.contains(&field.column_name.as_str()) {
            return Err(SchemaError::ReservedColumn { object: self.name.clone(),
                                                     column: field.column_name });
        }
        if self.field_by_column(&field.column_name).is_some() {
            return Err(SchemaError::DuplicateColumn { object: self.name.clone(),
                                                      column: field.column_name });
        }
        let id = field.id;
        self.fields.push(field);
        Ok(id)
    }

    /// Quita el campo del modelo (no toca la base de datos). Los índices que
    /// lo referencian también se quitan.
    pub fn remove_field(&mut self, id: Uuid) -> Option<FieldDefinition> {
        let pos = self.fields.iter().position(|f| f.id == id)?;
        self.indexes.retain(|i| !i.field_ids.contains(&id));
        Some(self.fields.remove(pos))
    }

    pub fn add_index(&mut self, index: IndexDefinition) -> Result<Uuid, SchemaError> {
        for fid in &index.field_ids {
            if self.field_by_id(*fid).is_none() {
                return Err(SchemaError::UnknownField { object: self.name.clone(),
                                                       field_id: fid.to_string() });
            }
        }
        let name = index.index_name(self)?;
        for other in &self.indexes {
            if other.index_name(self)? == name {
                return Err(SchemaError::DuplicateIndex { object: self.name.clone(),
                                                         index: name });
            }
        }
        let id = index.id;
        self.indexes.push(index);
        Ok(id)
    }

    pub fn remove_index(&mut self, id: Uuid) -> Option<IndexDefinition> {
        let pos = self.indexes.iter().position(|i| i.id == id)?;
        Some(self.indexes.remove(pos))
    }

    /// Tabla con sus columnas de sistema.
    pub fn table_artifact(&self) -> Result<SchemaArtifact, SchemaError> {
        let pk = Identifier::new("id")?;
        let columns = vec![ColumnDef::new(pk.clone(), ColumnType::Int).not_null().auto_increment(),
                           ColumnDef::new(Identifier::new("uuid")?, ColumnType::VarChar(255)).not_null(),
                           ColumnDef::new(Identifier::new("created_at")?, ColumnType::DateTime),
                           ColumnDef::new(Identifier::new("updated_at")?, ColumnType::DateTime),
                           ColumnDef::new(Identifier::new("properties")?, ColumnType::Json)];
        Ok(SchemaArtifact::Table { table: Identifier::new(self.db_table_name())?,
                                   columns,
                                   primary_key: Some(pk) })
    }

    fn uuid_index_artifact(&self) -> Result<SchemaArtifact, SchemaError> {
        let table = self.db_table_name();
        Ok(SchemaArtifact::Index { table: Identifier::new(table.clone())?,
                                   name: Identifier::new(naming::index_name(&table, &["uuid"], true))?,
                                   columns: vec![Identifier::new("uuid")?],
                                   unique: true })
    }

    /// Tabla más su índice único sobre `uuid`. Todo camino que pueda crear
    /// la tabla parte de aquí.
    pub fn table_artifacts(&self) -> Result<Vec<SchemaArtifact>, SchemaError> {
        Ok(vec![self.table_artifact()?, self.uuid_index_artifact()?])
    }

    /// Todos los artefactos del objeto: tabla, campos e índices.
    pub fn artifacts(&self) -> Result<Vec<SchemaArtifact>, SchemaError> {
        let mut out = self.table_artifacts()?;
        for field in &self.fields {
            out.extend(field.artifacts(self)?);
        }
        for index in &self.indexes {
            out.extend(index.artifacts(self)?);
        }
        Ok(out)
    }

    /// Comprueba nombres, referencias y colisiones de nombres derivados.
    pub fn validate(&self) -> Result<(), SchemaError> {
        Identifier::new(self.db_table_name())?;
        let mut columns = HashSet::new();
        for field in &self.fields {
            field.column_identifier()?;
            if SYSTEM_COLUMNS.contains(&field.column_name.as_str()) {
                return Err(SchemaError::ReservedColumn { object: self.name.clone(),
                                                         column: field.column_name.clone() });
            }
            if !columns.insert(field.column_name.as_str()) {
                return Err(SchemaError::DuplicateColumn { object: self.name.clone(),
                                                          column: field.column_name.clone() });
            }
            if field.key == FieldKey::CustomIndex {
                let sources = field.combined_columns(self)?;
                if sources.iter().any(|s| s.as_str() == field.column_name) {
                    return Err(SchemaError::InvalidDefinition(format!("computed field `{}` cannot combine itself",
                                                                      field.column_name)));
                }
            }
        }

        // Nombres derivados (índices, triggers, tablas de unión) únicos
        // dentro del objeto: el truncado a 15 caracteres puede hacerlos
        // colisionar.
        let mut seen = HashSet::new();
        for artifact in self.artifacts()? {
            if matches!(artifact, SchemaArtifact::Column { .. }) {
                continue;
            }
            let (rank, _, name) = artifact.key();
            if !seen.insert((rank, name.clone())) {
                return Err(SchemaError::DuplicateIndex { object: self.name.clone(),
                                                         index: name });
            }
        }
        Ok(())
    }

    /// Valida una fila (clave = nombre de columna) contra todos los campos.
    pub fn is_valid_data(&self, row: &Map<String, Value>) -> Vec<ValidationError> {
        self.fields.iter().flat_map(|f| f.is_valid_data(row)).collect()
    }

    pub async fn migrate_create<C>(&self, conn: &mut C) -> Result<MigrationReport, SchemaError>
        where C: DdlConnection + ?Sized
    {
        MigrationEngine::new(conn).migrate_create_object(self).await
    }

    pub async fn migrate_update<C>(&self, changes: &ObjectChanges, conn: &mut C) -> Result<MigrationReport, SchemaError>
        where C: DdlConnection + ?Sized
    {
        MigrationEngine::new(conn).migrate_update_object(self, changes).await
    }

    pub async fn migrate_drop<C>(&self, conn: &mut C) -> Result<MigrationReport, SchemaError>
        where C: DdlConnection + ?Sized
    {
        MigrationEngine::new(conn).migrate_drop_object(self).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::LinkType;
    use serde_json::json;

    #[test]
    fn table_name_defaults_to_prefixed_sanitized_name() {
        assert_eq!(ObjectDefinition::new("Purchase Order").db_table_name(), "AB_Purchase_Order");
        assert_eq!(ObjectDefinition::new("x").with_table_name("legacy_orders").db_table_name(), "legacy_orders");
    }

    #[test]
    fn add_field_rejects_duplicates_and_reserved_columns() {
        let mut o = ObjectDefinition::new("Invoice");
        o.add_field(FieldDefinition::new("total", FieldKey::Number)).unwrap();
        assert!(matches!(o.add_field(FieldDefinition::new("total", FieldKey::Text)),
                         Err(SchemaError::DuplicateColumn { .. })));
        assert!(matches!(o.add_field(FieldDefinition::new("uuid", FieldKey::Text)),
                         Err(SchemaError::ReservedColumn { .. })));
    }

    #[test]
    fn remove_field_drops_dependent_indexes() {
        let mut o = ObjectDefinition::new("Invoice");
        let a = o.add_field(FieldDefinition::new("a", FieldKey::Text)).unwrap();
        let b = o.add_field(FieldDefinition::new("b", FieldKey::Text)).unwrap();
        o.add_index(IndexDefinition::new("ab", vec![a, b], false)).unwrap();
        assert!(o.remove_field(a).is_some());
        assert!(o.indexes.is_empty());
        assert!(o.field_by_id(b).is_some());
    }

    #[test]
    fn validate_reports_unresolved_combined_fields() {
        let mut o = ObjectDefinition::new("Invoice");
        let mut f = FieldDefinition::new("fullName", FieldKey::CustomIndex);
        f.settings.combined_fields = Some(Uuid::new_v4().to_string());
        o.add_field(f).unwrap();
        assert!(matches!(o.validate(), Err(SchemaError::UnresolvedCombinedField { .. })));
    }

    #[test]
    fn validate_rejects_combining_a_field_without_column() {
        let mut o = ObjectDefinition::new("Invoice");
        let name = o.add_field(FieldDefinition::new("name", FieldKey::Text)).unwrap();
        let mut tags = FieldDefinition::new("tags", FieldKey::ConnectObject);
        tags.settings.link_type = Some(LinkType::Many);
        let tags = o.add_field(tags).unwrap();
        let mut f = FieldDefinition::new("label", FieldKey::CustomIndex);
        f.settings.combined_fields = Some(format!("{name},{tags}"));
        o.add_field(f).unwrap();
        match o.validate() {
            Err(SchemaError::CombinedFieldWithoutColumn { field, reference }) => {
                assert_eq!(field, "label");
                assert_eq!(reference, "tags");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn validate_reports_truncation_collisions_within_a_table() {
        let mut o = ObjectDefinition::new("Invoice");
        let mut a = FieldDefinition::new("customerFullName_a", FieldKey::Text);
        a.settings.unique = true;
        let mut b = FieldDefinition::new("customerFullName_b", FieldKey::Text);
        b.settings.unique = true;
        o.add_field(a).unwrap();
        o.add_field(b).unwrap();
        assert!(matches!(o.validate(), Err(SchemaError::DuplicateIndex { .. })));
    }

    #[test]
    fn is_valid_data_aggregates_field_errors() {
        let mut o = ObjectDefinition::new("Contact");
        let mut name = FieldDefinition::new("name", FieldKey::Text);
        name.settings.required = true;
        o.add_field(name).unwrap();
        o.add_field(FieldDefinition::new("mail", FieldKey::Email)).unwrap();
        let row = json!({"mail": "nope"}).as_object().cloned().unwrap();
        let errors = o.is_valid_data(&row);
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].column, "name");
        assert_eq!(errors[1].column, "mail");
    }
}
