use std::path::{Path, PathBuf};

use anyhow::Context;
use stm32tool::build_config::BuildSettings;
use stm32tool::instantiate::Instantiator;
use stm32tool::resolve::{RamSource, Resolver};
use stm32tool::toolchain::BuildInvoker;
use stm32tool_target::McuDescriptor;

use crate::cmd::{acquire, download};
use crate::util::{console, App};

#[derive(clap::Parser)]
pub struct Cmd {
    /// The name of the project directory to create
    project: PathBuf,
    /// The MCU model, e.g. STM32F051K8
    #[arg(short, long)]
    mcu: String,
    /// The RAM size in kB, skips the MCU database lookup
    #[arg(short, long)]
    ram: Option<u32>,
    /// Don't run a test build of the new project
    #[arg(long)]
    skip_build: bool,
}

impl Cmd {
    pub fn run(self, app: &App) -> anyhow::Result<()> {
        let database = app.capacity_database();
        let source = app.capacity_source();
        let resolution = Resolver::new(&database, &source)
            .resolve(&self.mcu, self.ram)
            .context("Failed to resolve the MCU.")?;
        let descriptor = resolution.descriptor;

        if resolution.ram_source == RamSource::Explicit {
            console::warning(
                "The MCU RAM size has been manually specified, if it's wrong you're going to have problems",
            );
        }
        console::info(format!("Creating the project {}", self.project.display()));
        console::info(format!("MCU: {descriptor}"));

        ensure_template(app, &descriptor)?;

        let common = app.paths().common();
        let project = Instantiator::new(app.store(), common, BuildSettings::from(&app.config), &app.cancel)
            .instantiate(&descriptor, &self.project)
            .context("Failed to create the project.")?;
        console::info(format!(
            "The project is ready, configured for {}",
            project.model
        ));

        if self.skip_build {
            return Ok(());
        }

        console::info("Running a test build");
        let make = app.make();
        match make.build(&project.dir) {
            Ok(outcome) if outcome.success => {
                console::info("All went fine! Your new project is ready, it's time to code!")
            }
            Ok(outcome) => {
                tracing::debug!("Test build log:\n{}", outcome.log);
                console::warning(
                    "Something went wrong with the test build, you must check the project manually",
                );
            }
            Err(error) => console::warning(format!("The test build could not be run: {error}")),
        }
        make.clean(&project.dir)
            .context("Failed to clean the test build.")?;

        Ok(())
    }
}

/// Downloads and acquires the package for `descriptor` when the store has no template for it.
fn ensure_template(app: &App, descriptor: &McuDescriptor) -> anyhow::Result<()> {
    let (family, series) = (descriptor.family, descriptor.series);
    if app.store().find(family, series)?.is_some() {
        return Ok(());
    }

    console::info("Couldn't find a suitable local template, trying to download the package");
    let package = download::download_package(app, family, series, Path::new("."))?;
    acquire::acquire_package(app, &package)
}
