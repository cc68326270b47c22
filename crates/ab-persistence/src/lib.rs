//! ab-persistence
//!
//! Implementaciones MySQL (sqlx) de los contratos de `ab-schema` y `ab-core`.
//!
//! Módulos:
//! - `mysql`: `MySqlDdlConnection`, `MySqlInstanceStore`, `MySqlQueryRunner`,
//!   construcción del pool y reintentos.
//! - `bootstrap`: tablas propias del motor (`ab_process_instance`).
//! - `config`: carga de configuración desde .env.
//! - `error`: `PersistenceError` y su mapeo a `DbError` / `ProcessError`.

pub mod bootstrap;
pub mod config;
pub mod error;
pub mod mysql;

pub use bootstrap::ensure_schema;
pub use config::{init_dotenv, DbConfig};
pub use error::PersistenceError;
pub use mysql::{build_pool, build_pool_from_env, MySqlDdlConnection, MySqlInstanceStore, MySqlQueryRunner, QlQuery};
pub use sqlx::mysql::MySqlPool;
