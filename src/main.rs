//! Demo de extremo a extremo: migra el objeto `Invoice` y ejecuta una
//! instancia del proceso de aprobación hasta completarla.
//!
//! Por defecto usa el catálogo y el store en memoria. Con la feature
//! `mysql_demo` y `DATABASE_URL` definido trabaja contra MySQL.

use appbuilder::loader::{load_object, load_process};
use appbuilder::process::{InMemoryInstanceStore, InstanceStatus, InstanceStore, ProcessDefinition, ProcessRuntime,
                          TaskServices};
use appbuilder::schema::{InMemoryCatalog, ObjectDefinition};
use appbuilder::{init_logging, AppConfig, AppError};
use log::{error, info};
use serde_json::json;

const OBJECT_FILE: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/demos/invoice.object.json");
const PROCESS_FILE: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/demos/invoice_approval.process.json");

async fn migrate_in_memory(object: &ObjectDefinition) -> Result<(), AppError> {
    let mut catalog = InMemoryCatalog::new();
    let report = object.migrate_create(&mut catalog).await?;
    info!("migración de `{}`: {} aplicados, {} omitidos", object.name, report.applied.len(), report.skipped.len());
    for sql in catalog.executed() {
        println!("{sql};");
    }
    let again = object.migrate_create(&mut catalog).await?;
    info!("segunda migración sin cambios: {}", again.is_noop());
    Ok(())
}

#[cfg(feature = "mysql_demo")]
async fn migrate_mysql(config: &AppConfig, object: &ObjectDefinition) -> Result<(), AppError> {
    let pool = config.create_pool().await?;
    let mut conn = appbuilder::persistence::MySqlDdlConnection::acquire(&pool).await?
                                                                          .with_dialect(config.dialect.ddl());
    let report = object.migrate_create(&mut conn).await?;
    info!("migración MySQL de `{}`: {} aplicados, {} omitidos", object.name, report.applied.len(), report.skipped.len());
    Ok(())
}

async fn approve_invoice<S>(runtime: &ProcessRuntime<S>, def: &ProcessDefinition) -> Result<(), AppError>
    where S: InstanceStore
{
    let data = json!({
        "number": "F-2024-001",
        "total": 1250.5,
        "customer": {"name": "Ada Lovelace", "email": "ada@example.com"}
    });
    let instance = runtime.trigger(def, "invoice.created", data).await?;
    info!("instancia {} en estado {}", instance.id, instance.status);

    let roles = vec!["accounting".to_string()];
    for item in runtime.inbox(std::slice::from_ref(def), &roles, &[]).await? {
        info!("inbox: {} / {} ({})", item.process_name, item.task_name, item.instructions);
        let done = runtime.respond(def, item.instance_id, &item.task_id, json!({"decision": "approved"}))
                          .await?;
        for entry in &done.log {
            println!("[{}] {} {}", entry.ts.to_rfc3339(), entry.task.as_deref().unwrap_or("-"), entry.message);
        }
        if done.status != InstanceStatus::Completed {
            error!("la instancia {} terminó en {}", done.id, done.status);
        }
    }
    Ok(())
}

async fn run() -> Result<(), AppError> {
    let config = AppConfig::from_env()?;
    let object = load_object(OBJECT_FILE)?;
    let process = load_process(PROCESS_FILE)?;

    #[cfg(feature = "mysql_demo")]
    if config.database.is_some() {
        migrate_mysql(&config, &object).await?;
        let pool = config.create_pool().await?;
        let runtime = config.runtime(appbuilder::persistence::MySqlInstanceStore::new(pool), TaskServices::default());
        return approve_invoice(&runtime, &process).await;
    }

    migrate_in_memory(&object).await?;
    let runtime = config.runtime(InMemoryInstanceStore::new(), TaskServices::default());
    approve_invoice(&runtime, &process).await
}

#[tokio::main]
async fn main() {
    init_logging();
    if let Err(e) = run().await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
