use anyhow::Context;

use crate::util::{console, App};

#[derive(clap::Parser)]
pub struct Cmd {
    #[clap(subcommand)]
    subcommand: Subcommand,
}

#[derive(clap::Subcommand)]
enum Subcommand {
    /// Download the MCU table from the ST website and replace the local database
    Update,
}

impl Cmd {
    pub fn run(self, app: &App) -> anyhow::Result<()> {
        match self.subcommand {
            Subcommand::Update => update(app),
        }
    }
}

fn update(app: &App) -> anyhow::Result<()> {
    let database = app.capacity_database();
    console::info("Updating the MCU database");

    let report = database
        .refresh(&app.capacity_source())
        .context("Failed to update the MCU database, the previous one was kept.")?;

    if !report.skipped.is_empty() {
        console::warning(format!(
            "{} rows of the MCU table were malformed and skipped",
            report.skipped.len()
        ));
    }
    console::info(format!(
        "The database at {} now lists {} MCUs",
        database.path().display(),
        report.snapshot.len()
    ));

    Ok(())
}
