use std::path::PathBuf;

use anyhow::Context;
use stm32tool::project::ProjectInfo;

use crate::util::{console, existing_project};

#[derive(clap::Parser)]
pub struct Cmd {
    /// The project directory
    project: PathBuf,
}

impl Cmd {
    pub fn run(self) -> anyhow::Result<()> {
        let project = existing_project(&self.project)?;
        let info = ProjectInfo::gather(&project)
            .with_context(|| format!("Failed to read the project {}.", project.display()))?;

        println!("Project info:");
        console::row("MCU", &info.descriptor);
        console::row(
            "#files",
            format!(
                "{} .c, {} .h, {} others ({} total)",
                info.files.c,
                info.files.h,
                info.files.other,
                info.files.total()
            ),
        );
        console::row("#lines", info.code_lines);

        Ok(())
    }
}
