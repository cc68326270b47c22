//! AppBuilder Rust Library
//!
//! Fachada del workspace:
//! - `schema` (ab-schema): objetos, campos, índices y migración DDL.
//! - `process` (ab-core): definiciones y runtime de procesos.
//! - `persistence` (ab-persistence): backend MySQL.
//! - `config`, `errors`, `loader`: configuración, error de aplicación y
//!   lectura de definiciones JSON, compartidos por la CLI y la demo.

pub mod config;
pub mod errors;
pub mod loader;

pub use ab_core as process;
pub use ab_persistence as persistence;
pub use ab_schema as schema;

pub use config::{AppConfig, Dialect};
pub use errors::AppError;

/// Instala el subscriber de `tracing` (filtro por `RUST_LOG`, `info` por
/// defecto). Los registros del facade `log` se reenvían al mismo subscriber.
pub fn init_logging() {
    use tracing_subscriber::EnvFilter;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
