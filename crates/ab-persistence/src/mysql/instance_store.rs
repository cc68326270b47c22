use ab_core::{InstanceStatus, InstanceStore, LogEntry, ProcessContext, ProcessError, ProcessInstance};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::debug;
use sqlx::mysql::{MySqlPool, MySqlRow};
use sqlx::Row;
use uuid::Uuid;

use super::with_retry;
use crate::error::PersistenceError;

/// Tabla propia del motor de procesos.
pub const INSTANCE_TABLE: &str = "ab_process_instance";

const UPSERT_SQL: &str = "INSERT INTO `ab_process_instance` \
                          (id, process_id, definition_hash, status, context, log, created_at, updated_at) \
                          VALUES (?, ?, ?, ?, ?, ?, ?, ?) \
                          ON DUPLICATE KEY UPDATE definition_hash = VALUES(definition_hash), \
                          status = VALUES(status), context = VALUES(context), log = VALUES(log), \
                          updated_at = VALUES(updated_at)";

const SELECT_COLUMNS: &str = "id, process_id, definition_hash, status, context, log, created_at, updated_at";

/// Implementación MySQL de `InstanceStore`.
///
/// El contexto se guarda como texto JSON (LONGTEXT): el blob persistido es
/// exactamente el que `ProcessContext::from_value` valida al cargar.
#[derive(Debug, Clone)]
pub struct MySqlInstanceStore {
    pool: MySqlPool,
}

impl MySqlInstanceStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }

    pub async fn delete(&self, id: Uuid) -> Result<bool, PersistenceError> {
        let id = id.to_string();
        let pool = &self.pool;
        let id = id.as_str();
        let res = with_retry(|| async move {
                      let res = sqlx::query("DELETE FROM `ab_process_instance` WHERE id = ?").bind(id)
                                                                                           .execute(pool)
                                                                                           .await?;
                      Ok::<_, PersistenceError>(res)
                  }).await?;
        Ok(res.rows_affected() > 0)
    }

    async fn upsert(&self, instance: &ProcessInstance) -> Result<(), PersistenceError> {
        let id = instance.id.to_string();
        let process_id = instance.process_id.to_string();
        let context = serde_json::to_string(&instance.context)?;
        let log = serde_json::to_string(&instance.log)?;
        let pool = &self.pool;
        let (id, process_id, context, log) = (id.as_str(), process_id.as_str(), context.as_str(), log.as_str());
        with_retry(|| async move {
            sqlx::query(UPSERT_SQL).bind(id)
                                   .bind(process_id)
                                   .bind(instance.definition_hash.as_str())
                                   .bind(instance.status.as_str())
                                   .bind(context)
                                   .bind(log)
                                   .bind(instance.created_at)
                                   .bind(instance.updated_at)
                                   .execute(pool)
                                   .await?;
            Ok::<_, PersistenceError>(())
        }).await?;
        debug!("instance {} saved status={}", instance.id, instance.status);
        Ok(())
    }

    async fn fetch_one(&self, id: Uuid) -> Result<Option<ProcessInstance>, PersistenceError> {
        let sql = format!("SELECT {SELECT_COLUMNS} FROM `ab_process_instance` WHERE id = ?");
        let id = id.to_string();
        let (pool, sql, id) = (&self.pool, sql.as_str(), id.as_str());
        let row = with_retry(|| async move {
                      let row = sqlx::query(sql).bind(id).fetch_optional(pool).await?;
                      Ok::<_, PersistenceError>(row)
                  }).await?;
        row.as_ref().map(instance_from_row).transpose()
    }

    async fn fetch_by_status(&self, status: InstanceStatus) -> Result<Vec<ProcessInstance>, PersistenceError> {
        let sql = format!("SELECT {SELECT_COLUMNS} FROM `ab_process_instance` WHERE status = ? ORDER BY created_at, id");
        let (pool, sql, status) = (&self.pool, sql.as_str(), status.as_str());
        let rows = with_retry(|| async move {
                       let rows = sqlx::query(sql).bind(status).fetch_all(pool).await?;
                       Ok::<_, PersistenceError>(rows)
                   }).await?;
        rows.iter().map(instance_from_row).collect()
    }
}

fn parse_uuid(row: &MySqlRow, column: &str) -> Result<Uuid, PersistenceError> {
    let raw: String = row.try_get(column)?;
    Uuid::parse_str(&raw).map_err(|e| PersistenceError::Decode(format!("{column}: {e}")))
}

fn instance_from_row(row: &MySqlRow) -> Result<ProcessInstance, PersistenceError> {
    let status: String = row.try_get("status")?;
    let status = status.parse::<InstanceStatus>()
                       .map_err(|e| PersistenceError::Decode(e.to_string()))?;
    let context: String = row.try_get("context")?;
    let context: serde_json::Value = serde_json::from_str(&context)?;
    let context = ProcessContext::from_value(context).map_err(|e| PersistenceError::Decode(e.to_string()))?;
    let log: String = row.try_get("log")?;
    let log: Vec<LogEntry> = serde_json::from_str(&log)?;
    let created_at: DateTime<Utc> = row.try_get("created_at")?;
    let updated_at: DateTime<Utc> = row.try_get("updated_at")?;
    Ok(ProcessInstance { id: parse_uuid(row, "id")?,
                         process_id: parse_uuid(row, "process_id")?,
                         definition_hash: row.try_get("definition_hash")?,
                         context,
                         status,
                         log,
                         created_at,
                         updated_at })
}

#[async_trait]
impl InstanceStore for MySqlInstanceStore {
    async fn save(&self, instance: &ProcessInstance) -> Result<(), ProcessError> {
        Ok(self.upsert(instance).await?)
    }

    async fn load(&self, id: Uuid) -> Result<Option<ProcessInstance>, ProcessError> {
        Ok(self.fetch_one(id).await?)
    }

    async fn list_by_status(&self, status: InstanceStatus) -> Result<Vec<ProcessInstance>, ProcessError> {
        Ok(self.fetch_by_status(status).await?)
    }
}
