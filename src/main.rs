use std::path::{Path, PathBuf};
use chrono::Local;
use pgphase::{
    cli::{Cli, Commands},
    commands::{
        execute_analyze, execute_backup, execute_dump, execute_extract, execute_init,
        execute_restore, execute_verify, print_analyze_summary, print_backup_summary,
        print_dump_summary, print_extract_summary, print_restore_summary, print_verify_summary,
        BackupOptions, RestoreOptions,
    },
    config::{CliOverrides, PgphaseConfig},
    dump::{ArtifactStore, CommandDumpSource},
    error::{format_error_chain, suggest_fix, Result},
    logging,
    output::CliOutputHandler,
};
use tracing::{debug, info};

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    let cli = Cli::parse_args();

    // 0 = warn, 1 = info, 2 = debug, 3+ = trace
    logging::init(cli.verbose).map_err(|e| color_eyre::eyre::eyre!(e))?;

    info!("Starting pgphase v{}", env!("CARGO_PKG_VERSION"));
    debug!("Command: {:?}", cli.command);

    if let Err(e) = run(cli).await {
        logging::output::error(format_error_chain(&e));
        if let Some(suggestion) = suggest_fix(&e) {
            logging::output::suggestion(suggestion);
        }
        std::process::exit(1);
    }

    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    let config_file = PgphaseConfig::load_from(&cli.config)?;
    if config_file.is_some() {
        info!("Loaded configuration from {}", cli.config.display());
    }

    let root = Path::new(".");
    let output = CliOutputHandler;

    match cli.command {
        Commands::Init => {
            execute_init(root, &output)?;
            Ok(())
        }

        Commands::Dump { db_url, dump_command, schema_only, timeout_secs } => {
            logging::output::header("Dumping Database");
            let config = PgphaseConfig::merge_with_cli(
                config_file,
                CliOverrides { db_url, dump_command, timeout_secs, ..Default::default() },
            );
            let source = CommandDumpSource::from_config(&config)?;
            let store = ArtifactStore::new(config.layout(root), Local::now());

            let result = execute_dump(&source, &store, schema_only, &output).await?;
            print_dump_summary(&result);
            Ok(())
        }

        Commands::Extract { dump, json, boundary } => {
            let config = PgphaseConfig::merge_with_cli(
                config_file,
                CliOverrides { statement_boundary: boundary, ..Default::default() },
            );
            let layout = config.layout(root);
            let dump = dump.unwrap_or_else(|| current_schema(&layout.schemas_dir));
            let store = ArtifactStore::new(layout, Local::now());

            let result = execute_extract(&dump, &store, config.statement_boundary(), json, &output)?;
            print_extract_summary(&result);
            Ok(())
        }

        Commands::Analyze { dump } => {
            let config = PgphaseConfig::merge_with_cli(config_file, CliOverrides::default());
            let layout = config.layout(root);
            let dump = dump.unwrap_or_else(|| current_schema(&layout.schemas_dir));
            let store = ArtifactStore::new(layout, Local::now());

            let result = execute_analyze(&dump, &store, config.statement_boundary(), &output)?;
            print_analyze_summary(&result);
            Ok(())
        }

        Commands::Restore { dump, report, output: output_path, missing, boundary } => {
            let config = PgphaseConfig::merge_with_cli(
                config_file,
                CliOverrides {
                    missing_objects: missing,
                    statement_boundary: boundary,
                    ..Default::default()
                },
            );
            let layout = config.layout(root);
            let dump = dump.unwrap_or_else(|| current_schema(&layout.schemas_dir));
            let store = ArtifactStore::new(layout, Local::now());

            let options = RestoreOptions {
                report,
                missing: config.missing_objects(),
                boundary: config.statement_boundary(),
                output_path,
            };
            let result = execute_restore(&dump, &store, &options, &output)?;
            print_restore_summary(&result);
            Ok(())
        }

        Commands::Backup { db_url, dump_command, analyze_only, retention_days, timeout_secs } => {
            let config = PgphaseConfig::merge_with_cli(
                config_file,
                CliOverrides {
                    db_url,
                    dump_command,
                    timeout_secs,
                    retention_days,
                    ..Default::default()
                },
            );
            let source = CommandDumpSource::from_config(&config)?;
            let store = ArtifactStore::new(config.layout(root), Local::now());

            let options = BackupOptions {
                analyze_only,
                retention_days: config.retention_days(),
                boundary: config.statement_boundary(),
                missing: config.missing_objects(),
            };
            let result = execute_backup(&source, &store, &options, &output).await?;
            print_backup_summary(&result);
            Ok(())
        }

        Commands::Verify { session } => {
            let result = execute_verify(&session, root, &output)?;
            print_verify_summary(&result);
            match result.first_failure() {
                Some(e) => Err(e),
                None => Ok(()),
            }
        }
    }
}

fn current_schema(schemas_dir: &Path) -> PathBuf {
    schemas_dir.join(pgphase::commands::aliases::SCHEMA)
}
