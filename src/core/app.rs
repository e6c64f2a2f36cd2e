use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use log::{debug, warn};

use crate::core::cli::{Args, Commands, PrintArgs};
use crate::core::cmds;
use crate::core::logging::init_logging;
use crate::types::AppResult;
use crate::types::config::{CliOverrides, init_with_overrides};

pub async fn run_main() -> AppResult<()> {
    let args = Args::parse();

    // Handle global arguments
    if let Some(cwd_arg) = args.cwd.as_ref() {
        let cwd = PathBuf::from(cwd_arg).canonicalize()?;
        let _ = env::set_current_dir(&cwd);
    }

    // Build CLI overrides for config precedence
    let cli_overrides = CliOverrides {
        log_level: args.log_level.clone(),
        log_color: args.log_color.clone(),
    };

    // Initialize configuration (file, then CLI overrides)
    init_with_overrides(args.config.as_deref().map(Path::new), &cli_overrides)?;

    // Initialize logging after config so level/color are applied
    init_logging();
    debug!(
        "Current working directory: {}",
        env::current_dir()?.display()
    );

    // Setup running flag to handle signals from ctrl-c
    let running = Arc::new(AtomicBool::new(true));
    let running_ctrlc = Arc::clone(&running);

    ctrlc::set_handler(move || {
        warn!("Received Ctrl-C, cleaning up..");
        running_ctrlc.store(false, Ordering::SeqCst);
    })
    .expect("Error creating a Ctrl-C handler");

    // Dispatch to appropriate command
    let exit_code = match args.command {
        Commands::Init => {
            cmds::execute_init().await?;
            0
        }
        Commands::Edges(analysis_args) => {
            cmds::execute_edges(analysis_args, Arc::clone(&running)).await?
        }
        Commands::Crashes(analysis_args) => {
            cmds::execute_crashes(analysis_args, Arc::clone(&running)).await?
        }
        Commands::Paths(analysis_args) => {
            cmds::execute_paths(analysis_args, Arc::clone(&running)).await?
        }
        Commands::Print {
            command: print_args,
        } => {
            match print_args {
                PrintArgs::Config(args) => {
                    cmds::execute_print(cmds::PrintCommand::Config(args.format)).await?
                }
                PrintArgs::Targets(args) => {
                    cmds::execute_print(cmds::PrintCommand::Targets(args.format)).await?
                }
            }
            0
        }
    };

    // Exit with appropriate code
    if exit_code != 0 {
        std::process::exit(exit_code);
    }

    Ok(())
}
