use std::path::{Path, PathBuf};

use anyhow::Context;
use stm32tool::project::ProjectRecord;
use stm32tool::toolchain::{BuildInvoker, SizeSections};

use crate::util::{console, existing_project, App};

#[derive(clap::Parser)]
pub struct Cmd {
    /// The project directory
    project: PathBuf,
}

impl Cmd {
    /// Builds the project, cleaning it first if `clean` is set.
    pub fn run(self, app: &App, clean: bool) -> anyhow::Result<()> {
        let project = existing_project(&self.project)?;
        let make = app.make();

        if clean {
            console::info("Cleaning build files");
            make.clean(&project)?;
        }
        build_project(&make, &project)
    }
}

/// Builds a project and prints its memory usage.
pub fn build_project(make: &impl BuildInvoker, project: &Path) -> anyhow::Result<()> {
    console::info("Building project");
    let outcome = make.build(project)?;
    if !outcome.log.is_empty() {
        eprint!("{}", outcome.log);
    }
    anyhow::ensure!(outcome.success, "Errors during project compilation.");

    let record = ProjectRecord::load(project)
        .with_context(|| format!("Failed to read the project record of {}.", project.display()))?;

    match outcome.sizes {
        Some(sizes) => {
            println!("Compilation successful, memory usage:");
            let [flash, ram] = usage_rows(&sizes, &record);
            console::row("FLASH", flash);
            console::row("RAM", ram);
        }
        None => {
            println!("Compilation successful");
            tracing::warn!("The build output has no size table");
        }
    }

    Ok(())
}

fn usage(used_bytes: u64, available_kb: u32) -> String {
    let used_kb = used_bytes as f64 / 1024.0;
    let percent = if available_kb == 0 {
        0.0
    } else {
        used_kb / f64::from(available_kb) * 100.0
    };
    format!("{used_kb:.1}/{available_kb} kB\t({percent:.1}%)")
}

fn usage_rows(sizes: &SizeSections, record: &ProjectRecord) -> [String; 2] {
    [
        usage(sizes.flash_used(), record.flash),
        usage(sizes.ram_used(), record.ram),
    ]
}
