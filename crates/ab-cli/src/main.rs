//! `ab-cli`: operaciones de esquema y de procesos desde la línea de
//! comandos. Códigos de salida: 0 ok, 2 uso, 3 entrada inválida,
//! 4 rechazado (estado/no encontrado), 5 error de backend.

mod args;
mod commands;
mod error;

use appbuilder::AppConfig;

use crate::args::ParsedArgs;
use crate::error::CliError;

const USAGE: &str = "\
Uso:
  ab-cli validate [--object <file>] [--process <file>]
  ab-cli migrate --object <file> [--previous <file>] [--dry-run]
  ab-cli drop-object --object <file> [--dry-run]
  ab-cli trigger --process <file> --key <KEY> [--data '<JSON>']
  ab-cli resume --process <file> --instance <UUID>
  ab-cli respond --process <file> --instance <UUID> --task <ID> --response '<JSON>'
  ab-cli retry --process <file> --instance <UUID> --task <ID>
  ab-cli inbox --process <file>[,<file>] [--roles a,b] [--users x,y]";

async fn run(argv: &[String]) -> Result<(), CliError> {
    let args = ParsedArgs::parse(argv)?;
    if matches!(args.command.as_str(), "help" | "--help" | "-h") {
        println!("{USAGE}");
        return Ok(());
    }
    let config = AppConfig::from_env()?;
    match args.command.as_str() {
        "validate" => commands::validate(&args),
        "migrate" => commands::migrate(&args, &config).await,
        "drop-object" => commands::drop_object(&args, &config).await,
        "trigger" => commands::trigger(&args, &config).await,
        "resume" => commands::resume(&args, &config).await,
        "respond" => commands::respond(&args, &config).await,
        "retry" => commands::retry(&args, &config).await,
        "inbox" => commands::inbox(&args, &config).await,
        other => Err(CliError::Usage(format!("comando desconocido `{other}`"))),
    }
}

#[tokio::main]
async fn main() {
    appbuilder::init_logging();
    let argv: Vec<String> = std::env::args().skip(1).collect();
    let code = match run(&argv).await {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("[ab-cli] {e}");
            if matches!(e, CliError::Usage(_)) {
                eprintln!("{USAGE}");
            }
            e.exit_code()
        }
    };
    std::process::exit(code);
}
