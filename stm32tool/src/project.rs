//! The device record of a project and project statistics.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use stm32tool_target::McuDescriptor;

use crate::error::{IoResultExt, Result};
use crate::fs_tree::{self, file_name, Walk};
use crate::repository;

/// Name of the device record in the project directory.
pub const PROJECT_RECORD_FILE: &str = "mcu.json";

/// Directory holding build products, ignored by the statistics.
pub const BUILD_DIR: &str = "build";

/// The device a project was created for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectRecord {
    pub name: String,
    /// Flash size in kB.
    pub flash: u32,
    /// RAM size in kB.
    pub ram: u32,
}

impl From<&McuDescriptor> for ProjectRecord {
    fn from(descriptor: &McuDescriptor) -> Self {
        Self {
            name: descriptor.name.to_string(),
            flash: descriptor.flash_kb,
            ram: descriptor.ram_kb,
        }
    }
}

impl ProjectRecord {
    pub fn load(project: &Path) -> Result<Self> {
        repository::read_json(&project.join(PROJECT_RECORD_FILE))
    }

    pub fn save(&self, project: &Path) -> Result<()> {
        repository::write_json_atomic(&project.join(PROJECT_RECORD_FILE), self)
    }

    /// Rebuilds the descriptor, keeping the recorded memory sizes.
    pub fn descriptor(&self) -> Result<McuDescriptor> {
        let mut descriptor = McuDescriptor::parse(&self.name)?;
        descriptor.flash_kb = self.flash;
        descriptor.ram_kb = self.ram;
        Ok(descriptor)
    }
}

/// Number of files in a project by kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FileCounts {
    pub c: usize,
    pub h: usize,
    pub other: usize,
}

impl FileCounts {
    pub fn total(&self) -> usize {
        self.c + self.h + self.other
    }
}

/// Statistics of a project directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectInfo {
    pub descriptor: McuDescriptor,
    pub files: FileCounts,
    /// Lines in `.c` and `.h` files.
    pub code_lines: usize,
}

fn count_lines(content: &[u8]) -> usize {
    let newlines = content.iter().filter(|&&byte| byte == b'\n').count();
    match content.last() {
        Some(b'\n') | None => newlines,
        Some(_) => newlines + 1,
    }
}

impl ProjectInfo {
    pub fn gather(project: &Path) -> Result<Self> {
        let descriptor = ProjectRecord::load(project)?.descriptor()?;

        let mut files = FileCounts::default();
        let mut code_lines = 0;
        fs_tree::visit_dirs(project, &mut |entry| {
            if entry.is_dir {
                return Ok(if file_name(&entry.path) == BUILD_DIR {
                    Walk::SkipDir
                } else {
                    Walk::Continue
                });
            }

            let counter = match entry.path.extension().and_then(|ext| ext.to_str()) {
                Some("c") => &mut files.c,
                Some("h") => &mut files.h,
                _ => {
                    files.other += 1;
                    return Ok(Walk::Continue);
                }
            };
            *counter += 1;
            code_lines += count_lines(&fs::read(&entry.path).at(&entry.path)?);

            Ok(Walk::Continue)
        })?;

        Ok(Self {
            descriptor,
            files,
            code_lines,
        })
    }
}
