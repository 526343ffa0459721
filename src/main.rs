use clap::{ArgAction, Parser, Subcommand};
use miscrit_farmer_lib::services::config::ConfigManager;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::Level;

#[derive(Parser, Debug)]
#[command(about = "Miscrits farming and battle automation", version)]
struct Args {
    /// Settings file (default: platform config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,
    /// Log scores and OCR reads
    #[arg(long, short, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Farm until interrupted, launching a battle run for each encounter
    Farm(FarmArgs),
    /// Play the battle currently on screen
    Battle,
}

#[derive(Parser, Debug)]
struct FarmArgs {
    /// Creature to hunt, overrides the settings file
    #[arg(long)]
    target: Option<String>,
    /// Confirm training with platinum, overrides the settings file
    #[arg(long, action = ArgAction::Set)]
    platinum: Option<bool>,
    /// Write the overrides back to the settings file
    #[arg(long)]
    save: bool,
}

fn init_logging(json: bool, verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let builder = tracing_subscriber::fmt().with_max_level(level);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.json_logs, args.verbose);

    let manager = match &args.config {
        Some(path) => ConfigManager::with_path(path),
        None => match ConfigManager::new() {
            Ok(manager) => manager,
            Err(e) => {
                tracing::error!("{}", e);
                return ExitCode::FAILURE;
            }
        },
    };

    let mut config = match manager.load() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let result = match args.command {
        Command::Farm(farm) => {
            if let Some(target) = farm.target {
                config.target.name = target;
            }
            if let Some(platinum) = farm.platinum {
                config.target.platinum_training = platinum;
            }
            if farm.save {
                match manager.save(&config) {
                    Ok(()) => tracing::info!("Settings saved to {}", manager.config_file_path().display()),
                    Err(e) => tracing::warn!("{}", e),
                }
            }
            miscrit_farmer_lib::run_farm(config, manager.config_file_path()).await
        }
        Command::Battle => miscrit_farmer_lib::run_battle(config).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
