use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

use super::artifact::SchemaArtifact;
use super::plan::{MigrationOp, MigrationPlan};
use crate::error::SchemaError;
use crate::field::{FieldDefinition, FieldKey};
use crate::index::IndexDefinition;
use crate::object::ObjectDefinition;

/// Cambios de un objeto entre dos versiones de su definición.
///
/// Los campos/índices eliminados o modificados se describen con su versión
/// anterior (ya no forman parte del objeto actual); los añadidos se
/// referencian por id dentro del objeto actual.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectChanges {
    #[serde(default)]
    pub added_fields: Vec<Uuid>,
    #[serde(default)]
    pub removed_fields: Vec<FieldDefinition>,
    #[serde(default)]
    pub changed_fields: Vec<FieldDefinition>,
    #[serde(default)]
    pub added_indexes: Vec<Uuid>,
    #[serde(default)]
    pub removed_indexes: Vec<IndexDefinition>,
    #[serde(default)]
    pub changed_indexes: Vec<IndexDefinition>,
}

impl ObjectChanges {
    /// Compara dos versiones de un objeto por id de campo/índice.
    pub fn diff(previous: &ObjectDefinition, current: &ObjectDefinition) -> Self {
        let mut changes = Self::default();
        for field in &current.fields {
            match previous.field_by_id(field.id) {
                None => changes.added_fields.push(field.id),
                Some(old) if old != field => changes.changed_fields.push(old.clone()),
                Some(_) => {}
            }
        }
        for old in &previous.fields {
            if current.field_by_id(old.id).is_none() {
                changes.removed_fields.push(old.clone());
            }
        }
        for index in &current.indexes {
            match previous.index_by_id(index.id) {
                None => changes.added_indexes.push(index.id),
                Some(old) if old != index => changes.changed_indexes.push(old.clone()),
                Some(_) => {}
            }
        }
        for old in &previous.indexes {
            if current.index_by_id(old.id).is_none() {
                changes.removed_indexes.push(old.clone());
            }
        }
        changes
    }

    pub fn is_empty(&self) -> bool {
        self.added_fields.is_empty()
        && self.removed_fields.is_empty()
        && self.changed_fields.is_empty()
        && self.added_indexes.is_empty()
        && self.removed_indexes.is_empty()
        && self.changed_indexes.is_empty()
    }

    /// Plan completo: borrados primero (orden inverso), después altas y
    /// modificaciones (orden de dependencias, precedidas por la tabla).
    ///
    /// Los campos calculados y los índices que leen un campo modificado o
    /// eliminado también se reconstruyen, aunque su propia definición no
    /// haya cambiado: sus triggers y columnas indexadas cambian con él.
    pub fn plan(&self, object: &ObjectDefinition) -> Result<MigrationPlan, SchemaError> {
        let mut drops: Vec<SchemaArtifact> = Vec::new();
        let mut forward = MigrationPlan::tag(MigrationOp::Create, object.table_artifacts()?);

        for old in &self.removed_fields {
            drops.extend(old.drop_artifacts(object)?);
        }
        // Los índices anteriores se nombran con las columnas anteriores.
        let previous: Vec<&FieldDefinition> = self.changed_fields.iter().chain(self.removed_fields.iter()).collect();
        for old in &self.removed_indexes {
            drops.extend(old.artifacts_with(object, &previous)?);
        }

        for id in &self.added_fields {
            let field = Self::current_field(object, *id)?;
            forward.extend(MigrationPlan::tag(MigrationOp::Create, field.artifacts(object)?));
        }
        for old in &self.changed_fields {
            let field = Self::current_field(object, old.id)?;
            let next = field.artifacts(object)?;
            let keep: HashSet<_> = next.iter().map(SchemaArtifact::key).collect();
            drops.extend(old.drop_artifacts(object)?.into_iter().filter(|a| !keep.contains(&a.key())));
            forward.extend(MigrationPlan::tag(MigrationOp::Update, next));
        }
        for field in self.dependent_fields(object)? {
            forward.extend(MigrationPlan::tag(MigrationOp::Update, field.artifacts(object)?));
        }

        for id in &self.added_indexes {
            let index = Self::current_index(object, *id)?;
            forward.extend(MigrationPlan::tag(MigrationOp::Create, index.artifacts(object)?));
        }
        let dependent_indexes = self.dependent_indexes(object);
        for old in self.changed_indexes.iter().chain(dependent_indexes) {
            let index = Self::current_index(object, old.id)?;
            let next = index.artifacts(object)?;
            let keep: HashSet<_> = next.iter().map(SchemaArtifact::key).collect();
            drops.extend(old.artifacts_with(object, &previous)?
                            .into_iter()
                            .filter(|a| !keep.contains(&a.key())));
            forward.extend(MigrationPlan::tag(MigrationOp::Update, next));
        }

        Ok(MigrationPlan::drop(drops).then(MigrationPlan::forward(forward)))
    }

    /// Ids de campos cuya columna cambió o desapareció.
    fn touched_field_ids(&self) -> HashSet<Uuid> {
        self.changed_fields.iter().chain(self.removed_fields.iter()).map(|f| f.id).collect()
    }

    /// Campos calculados sin cambios propios que combinan algún campo tocado.
    fn dependent_fields<'o>(&self, object: &'o ObjectDefinition) -> Result<Vec<&'o FieldDefinition>, SchemaError> {
        let touched = self.touched_field_ids();
        if touched.is_empty() {
            return Ok(Vec::new());
        }
        let mut out = Vec::new();
        for field in object.fields.iter().filter(|f| f.key == FieldKey::CustomIndex) {
            if touched.contains(&field.id) || self.added_fields.contains(&field.id) {
                continue;
            }
            if field.combined_field_ids()?.iter().any(|id| touched.contains(id)) {
                out.push(field);
            }
        }
        Ok(out)
    }

    /// Índices sin cambios propios que cubren algún campo tocado.
    fn dependent_indexes<'o>(&self, object: &'o ObjectDefinition) -> Vec<&'o IndexDefinition> {
        let touched = self.touched_field_ids();
        object.indexes
              .iter()
              .filter(|i| !self.added_indexes.contains(&i.id) && !self.changed_indexes.iter().any(|c| c.id == i.id))
              .filter(|i| i.field_ids.iter().any(|id| touched.contains(id)))
              .collect()
    }

    fn current_index(object: &ObjectDefinition, id: Uuid) -> Result<&IndexDefinition, SchemaError> {
        object.index_by_id(id)
              .ok_or_else(|| SchemaError::UnknownField { object: object.name.clone(),
                                                         field_id: id.to_string() })
    }

    fn current_field(object: &ObjectDefinition, id: Uuid) -> Result<&FieldDefinition, SchemaError> {
        object.field_by_id(id)
              .ok_or_else(|| SchemaError::UnknownField { object: object.name.clone(),
                                                         field_id: id.to_string() })
    }
}
