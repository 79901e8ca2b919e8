use std::path::{Path, PathBuf};

use anyhow::Context;
use stm32tool::fetch::Fetcher;
use stm32tool::locate::{LinkLocator, VendorPageLocator};
use stm32tool_target::{parse_series, Family};

use crate::cmd::acquire;
use crate::util::{console, App};

#[derive(clap::Parser)]
pub struct Cmd {
    /// The series to download the package for, e.g. STM32F4
    series: String,
}

impl Cmd {
    pub fn run(self, app: &App) -> anyhow::Result<()> {
        let (family, series) = parse_series(&self.series).with_context(|| {
            format!(
                "'{}' is not a valid series, use something like 'STM32F4'.",
                self.series
            )
        })?;

        let package = download_package(app, family, series, Path::new("."))?;
        acquire::acquire_package(app, &package)
    }
}

/// Downloads the vendor package of a series into `dir`.
pub fn download_package(
    app: &App,
    family: Family,
    series: u8,
    dir: &Path,
) -> anyhow::Result<PathBuf> {
    let locator = VendorPageLocator::new(app.fetcher(), &app.config)
        .context("Failed to set up the package page parser.")?;

    let url = locator
        .locate(family, series)
        .context("Failed to load the package page.")?
        .with_context(|| {
            format!(
                "Couldn't find the download link of the STM32{family}{series} package. \
                 Download it manually and use the acquire command."
            )
        })?;

    console::info(format!("Downloading {url}"));
    let package = app
        .fetcher()
        .download(&url, dir)
        .context("Download failed or canceled by the user.")?;
    console::info(format!("Saved {}", package.display()));

    Ok(package)
}
