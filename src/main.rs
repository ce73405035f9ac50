//! uiforge CLI - A virtual project workspace built by agent tool calls.

use clap::Parser;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::process;
use tokio_util::sync::CancellationToken;
use uiforge::cli::{
    Cli, Commands, ConfigCommands, FsCommands, ProjectCommands, SessionCommands, SystemCommands,
    ToolCommands,
};
use uiforge::commands::{self, Output, ReplayOptions};
use uiforge::config::{ConfigOverrides, OutputFormat, ResolvedConfig, resolve_config};
use uiforge::{Error, logging, storage};

fn main() {
    let cli = Cli::parse();
    let mut human = cli.human_readable;

    let result = match prepare(cli.data_dir.as_deref(), config_overrides(&cli)) {
        Ok((data_dir, config)) => {
            human = human || config.output_format() == OutputFormat::Human;
            run_command(cli.command, &data_dir, config, human)
        }
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        tracing::debug!(error = %e, "command failed");
        if human {
            eprintln!("Error: {}", e);
        } else {
            eprintln!("{}", serde_json::json!({ "error": e.to_string() }));
        }
        process::exit(1);
    }
}

/// CLI flags that take precedence over every other configuration layer.
fn config_overrides(cli: &Cli) -> ConfigOverrides {
    let mut overrides = ConfigOverrides::new();
    if let Some(ref level) = cli.log_level {
        overrides = overrides.with_log_level(level.clone());
    }
    if let Some(capacity) = cli.queue_capacity {
        overrides = overrides.with_event_queue_capacity(capacity);
    }
    if cli.human_readable {
        overrides = overrides.with_output_format(OutputFormat::Human);
    }
    overrides
}

/// Resolve the data directory and configuration, then install logging.
fn prepare(
    explicit_data_dir: Option<&Path>,
    overrides: ConfigOverrides,
) -> uiforge::Result<(PathBuf, ResolvedConfig)> {
    let data_dir = storage::get_data_dir(explicit_data_dir)?;
    let config = resolve_config(&data_dir, &overrides)?;

    logging::init(config.log_level());
    tracing::debug!(
        data_dir = %data_dir.display(),
        log_level = %config.log_level(),
        "configuration resolved"
    );
    Ok((data_dir, config))
}

fn run_command(
    command: Commands,
    data_dir: &Path,
    config: ResolvedConfig,
    human: bool,
) -> uiforge::Result<()> {
    match command {
        Commands::Tool { command } => match command {
            ToolCommands::Apply {
                snapshot,
                dry_run,
                invocation,
            } => {
                let invocation = commands::read_arg(&invocation)?;
                let result = commands::tool_apply(&snapshot, &invocation, dry_run)?;
                output(&result, human);
            }
            ToolCommands::Manifest => {
                output(&commands::tool_manifest(), human);
            }
            ToolCommands::Label { invocation } => {
                let invocation = commands::read_arg(&invocation)?;
                let result = commands::tool_label(&invocation)?;
                output(&result, human);
            }
        },

        Commands::Fs { command } => match command {
            FsCommands::Ls { snapshot, path } => {
                let result = commands::fs_ls(&snapshot, &path)?;
                output(&result, human);
            }
            FsCommands::Cat { snapshot, path } => {
                let result = commands::fs_cat(&snapshot, &path)?;
                output(&result, human);
            }
        },

        Commands::Session { command } => match command {
            SessionCommands::Replay {
                events,
                snapshot,
                project,
                message,
                anon_out,
            } => {
                let opts = ReplayOptions {
                    events,
                    snapshot,
                    project,
                    message,
                    anon_out,
                    queue_capacity: config.event_queue_capacity(),
                };
                let cancel = CancellationToken::new();
                let on_interrupt = cancel.clone();
                ctrlc::set_handler(move || on_interrupt.cancel())
                    .map_err(|e| Error::Other(format!("Failed to set Ctrl-C handler: {}", e)))?;
                let result = block_on(commands::session_replay(data_dir, opts, &cancel))??;
                output(&result, human);
            }
            SessionCommands::Migrate { anon } => {
                let result = block_on(commands::session_migrate(data_dir, anon.as_deref()))??;
                output(&result, human);
            }
        },

        Commands::Project { command } => match command {
            ProjectCommands::List => {
                let result = commands::project_list(data_dir)?;
                output(&result, human);
            }
            ProjectCommands::Show { id } => {
                let result = commands::project_show(data_dir, &id)?;
                output(&result, human);
            }
            ProjectCommands::Create { name, snapshot } => {
                let result = commands::project_create(data_dir, name, snapshot.as_deref())?;
                output(&result, human);
            }
        },

        Commands::Prompt => {
            output(&commands::prompt(), human);
        }

        Commands::Config { command } => match command {
            ConfigCommands::Show => {
                output(&commands::config_show(data_dir, config), human);
            }
        },

        Commands::System { command } => match command {
            SystemCommands::Info => {
                output(&commands::system_info(data_dir), human);
            }
        },
    }

    Ok(())
}

/// Run a future to completion on a single-threaded runtime.
fn block_on<F: Future>(future: F) -> uiforge::Result<F::Output> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| Error::Other(format!("Failed to create runtime: {}", e)))?;
    Ok(runtime.block_on(future))
}

fn output<T: Output>(result: &T, human: bool) {
    if human {
        println!("{}", result.to_human());
    } else {
        println!("{}", result.to_json());
    }
}
