use std::path::PathBuf;

use stm32tool::toolchain::BuildInvoker;

use crate::cmd::build::build_project;
use crate::util::{console, existing_project, App};

#[derive(clap::Parser)]
pub struct Cmd {
    /// The project directory
    project: PathBuf,
}

impl Cmd {
    /// Builds the project and flashes it with the debugger.
    pub fn run(self, app: &App) -> anyhow::Result<()> {
        let project = existing_project(&self.project)?;
        let make = app.make();

        build_project(&make, &project)?;

        console::info("Flashing");
        anyhow::ensure!(make.flash(&project)?, "Flashing failed.");
        Ok(())
    }

    /// Flashes the last build through the serial bootloader.
    pub fn run_bootloader(self, app: &App) -> anyhow::Result<()> {
        let project = existing_project(&self.project)?;

        console::info(format!(
            "Flashing through the bootloader on {}",
            app.config.bootloader_port
        ));
        anyhow::ensure!(
            app.make().flash_bootloader(&project)?,
            "Flashing through the bootloader failed."
        );
        Ok(())
    }
}
