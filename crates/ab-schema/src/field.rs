//! Definición de campos (columnas) de un objeto.
//!
//! Un `FieldDefinition` es un valor puro: describe tipo, reglas de
//! almacenamiento y de validez. Su ciclo de vida en la base de datos
//! (`migrate_create` / `migrate_update` / `migrate_drop`) se expresa como
//! artefactos de esquema que aplica el `MigrationEngine`.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::connection::DdlConnection;
use crate::ddl::{ColumnDef, ColumnType, DefaultValue, Identifier, TriggerBody, TriggerEvent};
use crate::error::{SchemaError, ValidationError};
use crate::migration::{MigrationEngine, MigrationPlan, MigrationReport, SchemaArtifact};
use crate::naming;
use crate::object::ObjectDefinition;

/// Longitud de la columna de un campo calculado (customIndex).
pub const COMBINED_COLUMN_LEN: u16 = 535;
/// Separador por defecto de los valores concatenados.
pub const DEFAULT_COMBINED_DELIMITER: &str = "+";
const DEFAULT_VARCHAR_LEN: u16 = 255;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldKey {
    Text,
    LongText,
    Number,
    Boolean,
    Date,
    DateTime,
    Email,
    List,
    Json,
    ConnectObject,
    CustomIndex,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkType {
    #[default]
    One,
    Many,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListOption {
    pub id: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Translation {
    pub language_code: String,
    pub label: String,
}

/// Settings específicos por tipo. Las claves desconocidas se conservan en
/// `extra` para no perder información del builder.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldSettings {
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub unique: bool,
    #[serde(default, rename = "default", skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decimals: Option<u8>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<ListOption>,
    #[serde(default)]
    pub is_multiple: bool,
    /// Ids de campos separados por coma (`"id1,id2"`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub combined_fields: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delimiter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_object: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_type: Option<LinkType>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDefinition {
    pub id: Uuid,
    pub column_name: String,
    pub key: FieldKey,
    #[serde(default)]
    pub settings: FieldSettings,
    #[serde(default)]
    pub translations: Vec<Translation>,
}

impl FieldDefinition {
    pub fn new(column_name: impl Into<String>, key: FieldKey) -> Self {
        Self { id: Uuid::new_v4(),
               column_name: column_name.into(),
               key,
               settings: FieldSettings::default(),
               translations: Vec::new() }
    }

    pub fn with_settings(mut self, settings: FieldSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_label(mut self, language_code: &str, label: &str) -> Self {
        self.translations.push(Translation { language_code: language_code.to_string(),
                                             label: label.to_string() });
        self
    }

    /// Etiqueta en el idioma pedido; si no existe, la primera traducción y,
    /// en último caso, el nombre de columna.
    pub fn label(&self, language_code: &str) -> &str {
        self.translations
            .iter()
            .find(|t| t.language_code == language_code)
            .or_else(|| self.translations.first())
            .map(|t| t.label.as_str())
            .unwrap_or(&self.column_name)
    }

    pub fn column_identifier(&self) -> Result<Identifier, SchemaError> {
        Identifier::new(self.column_name.clone())
    }

    pub fn link_type(&self) -> LinkType {
        self.settings.link_type.unwrap_or_default()
    }

    /// Ids declarados en `combinedFields`, en orden.
    pub fn combined_field_ids(&self) -> Result<Vec<Uuid>, SchemaError> {
        let raw = self.settings.combined_fields.as_deref().unwrap_or("");
        raw.split(',')
           .map(str::trim)
           .filter(|s| !s.is_empty())
           .map(|s| {
               Uuid::parse_str(s).map_err(|_| SchemaError::UnresolvedCombinedField { field: self.column_name.clone(),
                                                                                    reference: s.to_string() })
           })
           .collect()
    }

    /// Columnas origen de un campo calculado, resueltas contra el objeto.
    /// Un origen sin columna propia (connectObject many) no se puede combinar.
    pub fn combined_columns(&self, object: &ObjectDefinition) -> Result<Vec<Identifier>, SchemaError> {
        let ids = self.combined_field_ids()?;
        if ids.is_empty() {
            return Err(SchemaError::UnresolvedCombinedField { field: self.column_name.clone(),
                                                              reference: String::new() });
        }
        ids.into_iter()
           .map(|id| {
               let source = object.field_by_id(id)
                                  .ok_or_else(|| SchemaError::UnresolvedCombinedField { field: self.column_name.clone(),
                                                                                       reference: id.to_string() })?;
               if source.column_def()?.is_none() {
                   return Err(SchemaError::CombinedFieldWithoutColumn { field: self.column_name.clone(),
                                                                        reference: source.column_name.clone() });
               }
               source.column_identifier()
           })
           .collect()
    }

    fn default_value(&self) -> Option<DefaultValue> {
        let v = self.settings.default_value.as_ref()?;
        match (self.key, v) {
            (FieldKey::Boolean, Value::Bool(b)) => Some(DefaultValue::Bool(*b)),
            (FieldKey::Number, Value::Number(n)) => {
                n.as_i64().map(DefaultValue::Integer).or_else(|| n.as_f64().map(DefaultValue::Float))
            }
            (_, Value::String(s)) if !s.is_empty() => Some(DefaultValue::Text(s.clone())),
            _ => None,
        }
    }

    /// Columna en la tabla propia del objeto (`None` para connectObject many).
    pub fn column_def(&self) -> Result<Option<ColumnDef>, SchemaError> {
        let ty = match self.key {
            FieldKey::Text => ColumnType::VarChar(self.settings.max_length.unwrap_or(DEFAULT_VARCHAR_LEN)),
            FieldKey::LongText => ColumnType::LongText,
            FieldKey::Number => match self.settings.decimals {
                Some(scale) if scale > 0 => ColumnType::Decimal { precision: 65,
                                                                  scale: scale.min(30) },
                _ => ColumnType::Double,
            },
            FieldKey::Boolean => ColumnType::Boolean,
            FieldKey::Date => ColumnType::Date,
            FieldKey::DateTime => ColumnType::DateTime,
            FieldKey::Email => ColumnType::VarChar(DEFAULT_VARCHAR_LEN),
            FieldKey::List if self.settings.is_multiple => ColumnType::Json,
            FieldKey::List => ColumnType::VarChar(DEFAULT_VARCHAR_LEN),
            FieldKey::Json => ColumnType::Json,
            FieldKey::ConnectObject if self.link_type() == LinkType::Many => return Ok(None),
            FieldKey::ConnectObject => ColumnType::VarChar(DEFAULT_VARCHAR_LEN),
            FieldKey::CustomIndex => ColumnType::VarChar(COMBINED_COLUMN_LEN),
        };
        Ok(Some(ColumnDef::new(self.column_identifier()?, ty).with_default(self.default_value())))
    }

    fn build_artifacts(&self, object: &ObjectDefinition, resolve_sources: bool) -> Result<Vec<SchemaArtifact>, SchemaError> {
        let table_name = object.db_table_name();
        let table = Identifier::new(table_name.clone())?;
        let column = self.column_identifier()?;
        let mut out = Vec::new();

        if self.key == FieldKey::ConnectObject && self.link_type() == LinkType::Many {
            let join_name = naming::join_table_name(&table_name, &self.column_name);
            let join = Identifier::new(join_name.clone())?;
            let source = Identifier::new("source_uuid")?;
            let target = Identifier::new("target_uuid")?;
            let pk = Identifier::new("id")?;
            out.push(SchemaArtifact::Table { table: join.clone(),
                                             columns: vec![ColumnDef::new(pk.clone(), ColumnType::Int).auto_increment(),
                                                           ColumnDef::new(source.clone(), ColumnType::VarChar(DEFAULT_VARCHAR_LEN)).not_null(),
                                                           ColumnDef::new(target.clone(), ColumnType::VarChar(DEFAULT_VARCHAR_LEN)).not_null()],
                                             primary_key: Some(pk) });
            out.push(SchemaArtifact::Index { table: join,
                                             name: Identifier::new(naming::index_name(&join_name, &["source_uuid", "target_uuid"], true))?,
                                             columns: vec![source, target],
                                             unique: true });
            return Ok(out);
        }

        if let Some(col) = self.column_def()? {
            out.push(SchemaArtifact::Column { table: table.clone(),
                                              column: col });
        }

        let unique = self.settings.unique || self.key == FieldKey::CustomIndex;
        if unique || self.key == FieldKey::ConnectObject {
            out.push(SchemaArtifact::Index { table: table.clone(),
                                             name: Identifier::new(naming::index_name(&table_name, &[&self.column_name], unique))?,
                                             columns: vec![column.clone()],
                                             unique });
        }

        if self.key == FieldKey::CustomIndex {
            let sources = if resolve_sources { self.combined_columns(object)? } else { Vec::new() };
            let separator = self.settings
                                .delimiter
                                .clone()
                                .unwrap_or_else(|| DEFAULT_COMBINED_DELIMITER.to_string());
            let body = TriggerBody::Concat { target: column,
                                             sources,
                                             separator };
            out.push(SchemaArtifact::Trigger { table: table.clone(),
                                               name: Identifier::new(naming::update_trigger_name(&table_name, &self.column_name))?,
                                               event: TriggerEvent::Update,
                                               body: body.clone() });
            out.push(SchemaArtifact::Trigger { table,
                                               name: Identifier::new(naming::insert_trigger_name(&table_name, &self.column_name))?,
                                               event: TriggerEvent::Insert,
                                               body });
        }
        Ok(out)
    }

    /// Artefactos de esquema que este campo materializa en `object`.
    pub fn artifacts(&self, object: &ObjectDefinition) -> Result<Vec<SchemaArtifact>, SchemaError> {
        self.build_artifacts(object, true)
    }

    /// Igual que `artifacts` pero sin resolver las columnas origen de los
    /// triggers: para borrar sólo hacen falta los nombres.
    pub fn drop_artifacts(&self, object: &ObjectDefinition) -> Result<Vec<SchemaArtifact>, SchemaError> {
        self.build_artifacts(object, false)
    }

    /// Crea la columna (y su índice/triggers) si no existen. Asegura antes la
    /// tabla del objeto.
    pub async fn migrate_create<C>(&self, object: &ObjectDefinition, conn: &mut C) -> Result<MigrationReport, SchemaError>
        where C: DdlConnection + ?Sized
    {
        let mut artifacts = object.table_artifacts()?;
        artifacts.extend(self.artifacts(object)?);
        Ok(MigrationEngine::new(conn).apply(&MigrationPlan::create(artifacts)).await?)
    }

    /// Ajusta la columna y recrea los índices/triggers que difieran del
    /// catálogo.
    pub async fn migrate_update<C>(&self, object: &ObjectDefinition, conn: &mut C) -> Result<MigrationReport, SchemaError>
        where C: DdlConnection + ?Sized
    {
        let table = MigrationPlan::create(object.table_artifacts()?);
        let plan = table.then(MigrationPlan::update(self.artifacts(object)?));
        Ok(MigrationEngine::new(conn).apply(&plan).await?)
    }

    /// Elimina triggers, índice y columna. Lo ya ausente se ignora.
    pub async fn migrate_drop<C>(&self, object: &ObjectDefinition, conn: &mut C) -> Result<MigrationReport, SchemaError>
        where C: DdlConnection + ?Sized
    {
        let plan = MigrationPlan::drop(self.drop_artifacts(object)?);
        Ok(MigrationEngine::new(conn).apply(&plan).await?)
    }

    /// Valida el valor de este campo dentro de `row` (clave = nombre de
    /// columna). Nunca falla: devuelve la lista de errores encontrados.
    pub fn is_valid_data(&self, row: &Map<String, Value>) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        let value = row.get(&self.column_name).filter(|v| !is_blank(v));
        let Some(value) = value else {
            if self.settings.required && self.key != FieldKey::CustomIndex {
                errors.push(ValidationError::new(&self.column_name, "This is a required field."));
            }
            return errors;
        };

        let problem = match self.key {
            FieldKey::Text | FieldKey::LongText => match value.as_str() {
                None => Some("Must be text.".to_string()),
                Some(s) => self.settings
                               .max_length
                               .filter(|max| s.chars().count() > usize::from(*max))
                               .map(|max| format!("Must be at most {max} characters.")),
            },
            FieldKey::Number => (!is_numeric(value)).then(|| "Must be a number.".to_string()),
            FieldKey::Boolean => (!is_boolean(value)).then(|| "Must be true or false.".to_string()),
            FieldKey::Date => (!value.as_str().is_some_and(is_date)).then(|| "Must be a valid date.".to_string()),
            FieldKey::DateTime => {
                (!value.as_str().is_some_and(is_datetime)).then(|| "Must be a valid date and time.".to_string())
            }
            FieldKey::Email => {
                (!value.as_str().is_some_and(|s| EMAIL_RE.is_match(s))).then(|| "Must be a valid email.".to_string())
            }
            FieldKey::List => self.check_list(value),
            FieldKey::Json | FieldKey::ConnectObject | FieldKey::CustomIndex => None,
        };
        if let Some(message) = problem {
            errors.push(ValidationError::new(&self.column_name, message));
        }
        errors
    }

    fn check_list(&self, value: &Value) -> Option<String> {
        if self.settings.options.is_empty() {
            return None;
        }
        let known = |s: &str| self.settings.options.iter().any(|o| o.id == s);
        let ok = match value {
            Value::String(s) => known(s),
            Value::Array(items) if self.settings.is_multiple => items.iter().all(|i| i.as_str().is_some_and(known)),
            _ => false,
        };
        (!ok).then(|| "Must be one of the listed options.".to_string())
    }
}

fn is_blank(v: &Value) -> bool {
    match v {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

fn is_numeric(v: &Value) -> bool {
    match v {
        Value::Number(_) => true,
        Value::String(s) => s.trim().parse::<f64>().is_ok_and(f64::is_finite),
        _ => false,
    }
}

fn is_boolean(v: &Value) -> bool {
    match v {
        Value::Bool(_) => true,
        Value::Number(n) => matches!(n.as_i64(), Some(0) | Some(1)),
        Value::String(s) => matches!(s.as_str(), "true" | "false" | "1" | "0"),
        _ => false,
    }
}

fn is_date(s: &str) -> bool {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok() || is_datetime(s)
}

fn is_datetime(s: &str) -> bool {
    DateTime::parse_from_rfc3339(s).is_ok() || NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").is_ok()
}
