//! Running the project Makefile.

use std::path::Path;
use std::process::{Command, Output, Stdio};

use crate::error::{IoResultExt, Result};

/// Section sizes reported by `arm-none-eabi-size` at the end of a build, in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeSections {
    pub text: u64,
    pub data: u64,
    pub bss: u64,
}

impl SizeSections {
    /// Bytes of flash used: code, constants and initial values of data.
    pub fn flash_used(&self) -> u64 {
        self.text + self.data
    }

    /// Bytes of RAM used statically.
    pub fn ram_used(&self) -> u64 {
        self.data + self.bss
    }

    /// Finds the size table among the last lines of a build log.
    ///
    /// ```text
    ///    text    data     bss     dec     hex filename
    ///    1234      16    1568    2818     b02 build/firmware.elf
    /// ```
    pub fn parse(output: &str) -> Option<Self> {
        let lines: Vec<&str> = output.lines().collect();
        let tail = &lines[lines.len().saturating_sub(4)..];

        let header = tail
            .iter()
            .rposition(|line| line.contains("data") && line.contains("bss"))?;
        let mut values = tail.get(header + 1)?.split_whitespace();

        Some(Self {
            text: values.next()?.parse().ok()?,
            data: values.next()?.parse().ok()?,
            bss: values.next()?.parse().ok()?,
        })
    }
}

/// The result of a build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOutcome {
    pub success: bool,
    /// Diagnostics printed by the compiler.
    pub log: String,
    pub sizes: Option<SizeSections>,
}

/// Builds and flashes projects.
pub trait BuildInvoker {
    fn build(&self, project: &Path) -> Result<BuildOutcome>;

    fn clean(&self, project: &Path) -> Result<()>;

    /// Flashes the firmware with the debugger. Returns whether it succeeded.
    fn flash(&self, project: &Path) -> Result<bool>;

    /// Flashes the firmware through the serial bootloader. Returns whether it succeeded.
    fn flash_bootloader(&self, project: &Path) -> Result<bool>;
}

/// A [`BuildInvoker`] calling `make`.
#[derive(Debug, Clone)]
pub struct MakeInvoker {
    program: String,
    jobs: usize,
}

impl MakeInvoker {
    /// Uses one job more than there are CPUs.
    pub fn new(program: impl Into<String>) -> Self {
        let cpus = std::thread::available_parallelism().map_or(1, |cpus| cpus.get());
        Self {
            program: program.into(),
            jobs: cpus + 1,
        }
    }

    fn command(&self, project: &Path) -> Command {
        let mut command = Command::new(&self.program);
        command.current_dir(project);
        command
    }

    fn run(&self, project: &Path, target: &str) -> Result<bool> {
        tracing::debug!("Running {} {target} in {}", self.program, project.display());
        let status = self.command(project).arg(target).status().at(project)?;
        Ok(status.success())
    }
}

impl BuildInvoker for MakeInvoker {
    fn build(&self, project: &Path) -> Result<BuildOutcome> {
        tracing::debug!("Running {} -j{} in {}", self.program, self.jobs, project.display());
        let Output {
            status,
            stdout,
            stderr,
        } = self
            .command(project)
            .arg(format!("-j{}", self.jobs))
            .output()
            .at(project)?;

        let stdout = String::from_utf8_lossy(&stdout);
        Ok(BuildOutcome {
            success: status.success(),
            log: String::from_utf8_lossy(&stderr).into_owned(),
            sizes: if status.success() {
                SizeSections::parse(&stdout)
            } else {
                None
            },
        })
    }

    fn clean(&self, project: &Path) -> Result<()> {
        tracing::debug!("Running {} clean in {}", self.program, project.display());
        self.command(project)
            .arg("clean")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .at(project)?;
        Ok(())
    }

    fn flash(&self, project: &Path) -> Result<bool> {
        self.run(project, "program")
    }

    fn flash_bootloader(&self, project: &Path) -> Result<bool> {
        self.run(project, "program-btl")
    }
}
