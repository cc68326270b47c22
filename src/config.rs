//! Configuración central de la aplicación.
//! Carga variables de entorno (.env) y expone una estructura inmutable.
//! La base de datos es opcional: sin `DATABASE_URL` se trabaja contra el
//! catálogo y el store en memoria.

use ab_core::constants::DEFAULT_MAX_TASK_STEPS;
use ab_core::{InstanceStore, ProcessRuntime, TaskServices};
use ab_persistence::{DbConfig, MySqlPool};
use ab_schema::{DdlDialect, MySqlDialect};
use std::env;

use crate::errors::AppError;

/// Motores SQL soportados para el DDL generado.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    MySql,
}

impl Dialect {
    pub fn parse(value: &str) -> Result<Self, AppError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "mysql" | "mariadb" => Ok(Self::MySql),
            other => Err(AppError::Config(format!("AB_DIALECT no soportado: `{other}`"))),
        }
    }

    pub fn ddl(&self) -> Box<dyn DdlDialect> {
        match self {
            Self::MySql => Box::new(MySqlDialect),
        }
    }
}

/// Configuración global de la aplicación.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// `AB_DIALECT` (por defecto `mysql`).
    pub dialect: Dialect,
    /// `AB_MAX_TASK_STEPS`: tareas ejecutadas como máximo por cada `run`.
    pub max_task_steps: usize,
    /// Sólo presente si `DATABASE_URL` está definido.
    pub database: Option<DbConfig>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        ab_persistence::init_dotenv();
        let dialect = match env::var("AB_DIALECT") {
            Ok(v) => Dialect::parse(&v)?,
            Err(_) => Dialect::MySql,
        };
        let max_task_steps = match env::var("AB_MAX_TASK_STEPS") {
            Ok(v) => v.parse::<usize>()
                      .ok()
                      .filter(|n| *n > 0)
                      .ok_or_else(|| AppError::Config(format!("AB_MAX_TASK_STEPS inválido: `{v}`")))?,
            Err(_) => DEFAULT_MAX_TASK_STEPS,
        };
        let database = match env::var("DATABASE_URL") {
            Ok(_) => Some(DbConfig::from_env()?),
            Err(_) => None,
        };
        Ok(Self { dialect,
                  max_task_steps,
                  database })
    }

    /// Runtime de procesos con el presupuesto de pasos configurado.
    pub fn runtime<S>(&self, store: S, services: TaskServices) -> ProcessRuntime<S>
        where S: InstanceStore
    {
        ProcessRuntime::new(store, services).with_max_steps(self.max_task_steps)
    }

    /// Crea el pool MySQL y las tablas del motor. Error si no hay base de
    /// datos configurada.
    pub async fn create_pool(&self) -> Result<MySqlPool, AppError> {
        let db = self.database
                     .as_ref()
                     .ok_or_else(|| AppError::Config("DATABASE_URL no definido".into()))?;
        let pool = ab_persistence::build_pool(&db.url, db.min_connections, db.max_connections).await?;
        ab_persistence::ensure_schema(&pool).await?;
        Ok(pool)
    }
}
