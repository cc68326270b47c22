//! Implementación de cada subcomando.
//!
//! Los comandos de esquema funcionan sin base de datos (dry-run contra el
//! catálogo en memoria, imprimiendo el DDL). Los comandos de proceso operan
//! sobre instancias persistidas y requieren `DATABASE_URL`.

use ab_core::{ProcessDefinition, ProcessRuntime, TaskServices};
use ab_persistence::{MySqlDdlConnection, MySqlInstanceStore, MySqlQueryRunner};
use ab_schema::{DdlConnection, InMemoryCatalog, MigrationReport, ObjectChanges, ObjectDefinition};
use appbuilder::loader::{load_object, load_process};
use appbuilder::{AppConfig, AppError};
use log::{info, warn};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

use crate::args::ParsedArgs;
use crate::error::CliError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SchemaAction {
    Migrate,
    Drop,
}

fn print_json<T: Serialize>(value: &T) -> Result<(), CliError> {
    let out = serde_json::to_string_pretty(value).map_err(|e| CliError::Backend(e.to_string()))?;
    println!("{out}");
    Ok(())
}

fn parse_uuid(args: &ParsedArgs, name: &str) -> Result<Uuid, CliError> {
    let raw = args.required(name)?;
    Uuid::parse_str(raw).map_err(|e| CliError::Input(format!("--{name} `{raw}`: {e}")))
}

fn parse_json(args: &ParsedArgs, name: &str, default: Option<Value>) -> Result<Value, CliError> {
    match (args.optional(name), default) {
        (Some(raw), _) => serde_json::from_str(raw).map_err(|e| CliError::Input(format!("--{name}: {e}"))),
        (None, Some(d)) => Ok(d),
        (None, None) => Err(CliError::Usage(format!("{} requiere --{name}", args.command))),
    }
}

async fn apply<C>(action: SchemaAction,
                  object: &ObjectDefinition,
                  previous: Option<&ObjectDefinition>,
                  conn: &mut C)
                  -> Result<MigrationReport, AppError>
    where C: DdlConnection + ?Sized
{
    let report = match (action, previous) {
        (SchemaAction::Drop, _) => object.migrate_drop(conn).await?,
        (SchemaAction::Migrate, Some(prev)) => {
            let changes = ObjectChanges::diff(prev, object);
            object.migrate_update(&changes, conn).await?
        }
        (SchemaAction::Migrate, None) => object.migrate_create(conn).await?,
    };
    Ok(report)
}

/// `migrate --object <file> [--previous <file>] [--dry-run]` y
/// `drop-object --object <file> [--dry-run]`.
async fn schema_command(action: SchemaAction, args: &ParsedArgs, config: &AppConfig) -> Result<(), CliError> {
    let object = load_object(args.required("object")?)?;
    let previous = match args.optional("previous") {
        Some(path) if action == SchemaAction::Migrate => Some(load_object(path)?),
        _ => None,
    };
    if previous.as_ref().is_some_and(|p| p.id != object.id) {
        return Err(CliError::Input("--previous describe otro objeto (ids distintos)".into()));
    }

    let dry_run = args.switch("dry-run") || config.database.is_none();
    let report = if dry_run {
        if !args.switch("dry-run") {
            warn!("DATABASE_URL no definido: se muestra el DDL sin aplicarlo");
        }
        let mut catalog = InMemoryCatalog::new();
        // El dry-run parte del estado que dejaría la versión previa.
        let base = match action {
            SchemaAction::Drop => Some(&object),
            SchemaAction::Migrate => previous.as_ref(),
        };
        if let Some(base) = base {
            base.migrate_create(&mut catalog).await.map_err(AppError::from)?;
            catalog.clear_log();
        }
        let report = apply(action, &object, previous.as_ref(), &mut catalog).await?;
        for sql in catalog.executed() {
            println!("{sql};");
        }
        report
    } else {
        let pool = config.create_pool().await?;
        let mut conn = MySqlDdlConnection::acquire(&pool).await
                                                         .map_err(AppError::from)?
                                                         .with_dialect(config.dialect.ddl());
        apply(action, &object, previous.as_ref(), &mut conn).await?
    };
    info!("{} `{}`: {} aplicados, {} omitidos",
          if action == SchemaAction::Drop { "drop" } else { "migrate" },
          object.name,
          report.applied.len(),
          report.skipped.len());
    print_json(&report)
}

pub async fn migrate(args: &ParsedArgs, config: &AppConfig) -> Result<(), CliError> {
    schema_command(SchemaAction::Migrate, args, config).await
}

pub async fn drop_object(args: &ParsedArgs, config: &AppConfig) -> Result<(), CliError> {
    schema_command(SchemaAction::Drop, args, config).await
}

/// `validate [--object <file>] [--process <file>]`: sólo comprueba las
/// definiciones, sin tocar la base de datos.
pub fn validate(args: &ParsedArgs) -> Result<(), CliError> {
    let (object, process) = (args.optional("object"), args.optional("process"));
    if object.is_none() && process.is_none() {
        return Err(CliError::Usage("validate requiere --object o --process".into()));
    }
    if let Some(path) = object {
        let o = load_object(path)?;
        println!("object `{}` ok (tabla {})", o.name, o.db_table_name());
    }
    if let Some(path) = process {
        let p = load_process(path)?;
        if !p.is_startable() {
            return Err(CliError::Input(format!("process `{}` has no trigger", p.name)));
        }
        println!("process `{}` ok ({} elementos, {} flujos)", p.name, p.elements.len(), p.flows.len());
    }
    Ok(())
}

async fn mysql_runtime(config: &AppConfig) -> Result<ProcessRuntime<MySqlInstanceStore>, CliError> {
    if config.database.is_none() {
        return Err(CliError::Rejected("requiere DATABASE_URL para operar contra backend persistente".into()));
    }
    let pool = config.create_pool().await?;
    let services = TaskServices::default().with_query_runner(Arc::new(MySqlQueryRunner::new(pool.clone())));
    Ok(config.runtime(MySqlInstanceStore::new(pool), services))
}

fn process_arg(args: &ParsedArgs) -> Result<ProcessDefinition, CliError> {
    Ok(load_process(args.required("process")?)?)
}

/// `trigger --process <file> --key <K> [--data '<JSON>']`
pub async fn trigger(args: &ParsedArgs, config: &AppConfig) -> Result<(), CliError> {
    let def = process_arg(args)?;
    let key = args.required("key")?;
    let data = parse_json(args, "data", Some(Value::Object(Default::default())))?;
    let runtime = mysql_runtime(config).await?;
    let instance = runtime.trigger(&def, key, data).await?;
    print_json(&instance)
}

/// `resume --process <file> --instance <UUID>`
pub async fn resume(args: &ParsedArgs, config: &AppConfig) -> Result<(), CliError> {
    let def = process_arg(args)?;
    let id = parse_uuid(args, "instance")?;
    let instance = mysql_runtime(config).await?.resume(&def, id).await?;
    print_json(&instance)
}

/// `respond --process <file> --instance <UUID> --task <ID> --response '<JSON>'`
pub async fn respond(args: &ParsedArgs, config: &AppConfig) -> Result<(), CliError> {
    let def = process_arg(args)?;
    let id = parse_uuid(args, "instance")?;
    let task = args.required("task")?;
    let response = parse_json(args, "response", None)?;
    let instance = mysql_runtime(config).await?.respond(&def, id, task, response).await?;
    print_json(&instance)
}

/// `retry --process <file> --instance <UUID> --task <ID>`
pub async fn retry(args: &ParsedArgs, config: &AppConfig) -> Result<(), CliError> {
    let def = process_arg(args)?;
    let id = parse_uuid(args, "instance")?;
    let task = args.required("task")?;
    let instance = mysql_runtime(config).await?.retry_task(&def, id, task).await?;
    print_json(&instance)
}

/// `inbox --process <file>[,<file>...] [--roles a,b] [--users x,y]`
pub async fn inbox(args: &ParsedArgs, config: &AppConfig) -> Result<(), CliError> {
    let files = args.list("process");
    if files.is_empty() {
        return Err(CliError::Usage("inbox requiere --process".into()));
    }
    let defs = files.iter().map(load_process).collect::<Result<Vec<_>, _>>()?;
    let items = mysql_runtime(config).await?
                                     .inbox(&defs, &args.list("roles"), &args.list("users"))
                                     .await?;
    print_json(&items)
}
