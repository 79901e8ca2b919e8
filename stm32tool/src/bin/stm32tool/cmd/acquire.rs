use std::path::{Path, PathBuf};

use anyhow::Context;
use stm32tool::normalize::NormalizeOutcome;

use crate::util::{console, App};

#[derive(clap::Parser)]
pub struct Cmd {
    /// The STM32Cube package downloaded from the ST website
    package: PathBuf,
}

impl Cmd {
    pub fn run(self, app: &App) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.package.is_file(),
            "The package {} does not exist.",
            self.package.display()
        );

        acquire_package(app, &self.package)
    }
}

/// Turns a vendor package into a template of the store.
pub fn acquire_package(app: &App, package: &Path) -> anyhow::Result<()> {
    console::info(format!("Acquiring the package {}", package.display()));

    let outcome = app
        .normalizer()
        .acquire(package)
        .with_context(|| format!("Failed to acquire {}.", package.display()))?;

    match outcome {
        NormalizeOutcome::Installed { template, replaced } => {
            let metadata = &template.metadata;
            match replaced {
                Some(previous) => console::info(format!(
                    "Updated the {} template from {} to {}",
                    metadata.basename(),
                    previous.version,
                    metadata.version
                )),
                None => console::info(format!(
                    "Installed the {} template, version {}",
                    metadata.basename(),
                    metadata.version
                )),
            }
        }
        NormalizeOutcome::UpToDate { current } => console::info(format!(
            "The {} template is already up to date (version {}), nothing to do",
            current.basename(),
            current.version
        )),
    }

    Ok(())
}
