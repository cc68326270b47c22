//! Tablas propias del motor (no derivadas de objetos del builder).

use log::info;
use sqlx::mysql::MySqlPool;

use crate::error::PersistenceError;

const CREATE_INSTANCE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS `ab_process_instance` (
    `id` CHAR(36) NOT NULL,
    `process_id` CHAR(36) NOT NULL,
    `definition_hash` VARCHAR(64) NOT NULL,
    `status` VARCHAR(16) NOT NULL,
    `context` LONGTEXT NOT NULL,
    `log` LONGTEXT NOT NULL,
    `created_at` DATETIME(6) NOT NULL,
    `updated_at` DATETIME(6) NOT NULL,
    PRIMARY KEY (`id`),
    KEY `IDX_ab_process_instance_status` (`status`),
    KEY `IDX_ab_process_instance_process` (`process_id`)
) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4
"#;

/// Crea (si faltan) las tablas del motor. Idempotente.
pub async fn ensure_schema(pool: &MySqlPool) -> Result<(), PersistenceError> {
    sqlx::raw_sql(CREATE_INSTANCE_TABLE).execute(pool).await?;
    info!("engine tables ready");
    Ok(())
}
