mod cmd;
mod util;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use stm32tool::config::Config;
use stm32tool::interrupt::CancelFlag;

use crate::util::logging::{setup_logging, LevelFilter};
use crate::util::{console, App};

#[derive(clap::Parser)]
#[clap(
    name = "stm32tool",
    about = "Creates, builds and flashes STM32 projects from STM32Cube packages",
    version
)]
struct Cli {
    /// Log level, overrides RUST_LOG
    #[clap(long, global = true, value_enum, help_heading = "LOG CONFIGURATION")]
    log_level: Option<LevelFilter>,
    /// Also write a JSON log to this file
    #[clap(long, global = true, help_heading = "LOG CONFIGURATION")]
    log_file: Option<PathBuf>,

    #[clap(subcommand)]
    subcommand: Subcommand,
}

impl Cli {
    fn run(self, app: &App) -> Result<()> {
        match self.subcommand {
            Subcommand::New(cmd) => cmd.run(app),
            Subcommand::Info(cmd) => cmd.run(),
            Subcommand::Build(cmd) => cmd.run(app, false),
            Subcommand::Rebuild(cmd) => cmd.run(app, true),
            Subcommand::Flash(cmd) => cmd.run(app),
            Subcommand::FlashBtl(cmd) => cmd.run_bootloader(app),
            Subcommand::Acquire(cmd) => cmd.run(app),
            Subcommand::Download(cmd) => cmd.run(app),
            Subcommand::Database(cmd) => cmd.run(app),
        }
    }
}

#[derive(clap::Subcommand)]
enum Subcommand {
    /// Create a new project for an MCU
    New(cmd::new::Cmd),
    /// Show the MCU and size statistics of a project
    Info(cmd::info::Cmd),
    /// Build a project and show its memory usage
    Build(cmd::build::Cmd),
    /// Clean and build a project
    Rebuild(cmd::build::Cmd),
    /// Build a project and flash it with the debugger
    Flash(cmd::flash::Cmd),
    /// Flash a project through the serial bootloader
    #[clap(name = "flash-btl")]
    FlashBtl(cmd::flash::Cmd),
    /// Turn a downloaded STM32Cube package into a project template
    Acquire(cmd::acquire::Cmd),
    /// Download the STM32Cube package of a series and acquire it
    Download(cmd::download::Cmd),
    /// Manage the local MCU database
    Database(cmd::database::Cmd),
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            console::error(format!("{error:#}"));
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let mut matches = Cli::parse();

    let log_file = matches.log_file.take();
    let _logger_guard = setup_logging(log_file.as_deref(), matches.log_level)
        .context("Failed to set up logging.")?;

    let working_dir = std::env::current_dir().context("Failed to get the working directory.")?;
    let config = Config::load(&working_dir).context("Failed to load configuration.")?;
    tracing::debug!("Using the store at {}", config.store_dir.display());

    let cancel = CancelFlag::on_sigint().context("Failed to install the SIGINT handler.")?;
    let app = App::new(config, cancel)?;

    matches.run(&app)
}
