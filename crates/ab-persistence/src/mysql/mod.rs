//! Implementaciones MySQL (sqlx) de los traits de `ab-schema` y `ab-core`.
//!
//! - `MySqlDdlConnection`: `DdlConnection` sobre una conexión dedicada del
//!   pool. Las comprobaciones de existencia leen `information_schema`.
//! - `MySqlInstanceStore`: `InstanceStore` con upsert por `id` en
//!   `ab_process_instance` y reintento ante errores transitorios.
//! - `MySqlQueryRunner`: `QueryRunner` que traduce el QL de las tareas
//!   ServiceQuery a un `SELECT` parametrizado.

mod ddl;
mod instance_store;
mod query_runner;

use log::warn;
use sqlx::mysql::{MySqlPool, MySqlPoolOptions};
use std::future::Future;
use std::time::Duration;

use crate::config::DbConfig;
use crate::error::PersistenceError;

pub use ddl::MySqlDdlConnection;
pub use instance_store::{MySqlInstanceStore, INSTANCE_TABLE};
pub use query_runner::{MySqlQueryRunner, QlQuery};

/// Construye el pool MySQL con los límites dados.
pub async fn build_pool(url: &str, min_connections: u32, max_connections: u32) -> Result<MySqlPool, PersistenceError> {
    let pool = MySqlPoolOptions::new().min_connections(min_connections)
                                      .max_connections(max_connections)
                                      .acquire_timeout(Duration::from_secs(10))
                                      .connect(url)
                                      .await?;
    Ok(pool)
}

/// Pool a partir de `DATABASE_URL` y variables asociadas.
pub async fn build_pool_from_env() -> Result<MySqlPool, PersistenceError> {
    let cfg = DbConfig::from_env()?;
    build_pool(&cfg.url, cfg.min_connections, cfg.max_connections).await
}

/// Determina si un error es transitorio (recomendado reintentar con backoff).
///
/// Cubre deadlocks/lock wait (1213/1205), errores de IO del pool y mensajes
/// comunes de desconexión detectados por texto (best-effort).
pub(crate) fn is_retryable(e: &PersistenceError) -> bool {
    match e {
        PersistenceError::SerializationConflict => true,
        PersistenceError::TransientIo(_) => true,
        // 2006 server has gone away, 2013 lost connection
        PersistenceError::Database { number: 2006 | 2013, .. } => true,
        PersistenceError::Unknown(msg) => {
            let m = msg.to_lowercase();
            m.contains("connection closed")
            || m.contains("connection refused")
            || m.contains("broken pipe")
            || m.contains("timeout")
        }
        _ => false,
    }
}

/// Retry simple con backoff lineal (hasta 3 reintentos: 15ms, 30ms, 45ms).
/// Emite `warn!` por intento. Sólo repite la unidad de trabajo de `f`.
pub(crate) async fn with_retry<F, Fut, T>(mut f: F) -> Result<T, PersistenceError>
    where F: FnMut() -> Fut,
          Fut: Future<Output = Result<T, PersistenceError>>
{
    let mut attempts = 0;
    loop {
        match f().await {
            Err(e) if is_retryable(&e) && attempts < 3 => {
                let delay_ms = 15 * ((attempts + 1) as u64);
                warn!("retryable error (attempt {}): {:?} -> sleeping {}ms", attempts + 1, e, delay_ms);
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                attempts += 1;
            }
            r => return r,
        }
    }
}
