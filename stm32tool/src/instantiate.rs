//! Creates a project directory from a template.

use std::fs;
use std::path::{Path, PathBuf};

use stm32tool_target::{
    is_family_header, is_model_file, select_model, McuDescriptor, MemoryLayout, ModelSelection,
};

use crate::build_config::{startup_file, BuildConfig, BuildSettings, BUILD_CONFIG_FILE};
use crate::error::{Error, IoResultExt, Result};
use crate::fs_tree::{self, file_name, Walk};
use crate::interrupt::CancelFlag;
use crate::normalize::TEMPLATE_MARKER;
use crate::project::ProjectRecord;
use crate::store::TemplateStore;

/// Placeholder in common files replaced by the CMSIS family header name.
pub const FAMILY_INCLUDE_PLACEHOLDER: &str = "!CMSIS_FAMILY_INCLUDE!";

/// The generated linker memory layout, relative to the project.
pub const MEMORY_LAYOUT_FILE: &str = "ldscripts/mem.ld";

/// Prefix of startup file names.
const STARTUP_PREFIX: &str = "startup_";

/// Removes a project directory on drop, unless it was completed.
///
/// Parent directories created along with it are removed too.
struct PartialProject {
    root: PathBuf,
    complete: bool,
}

impl PartialProject {
    fn create(dir: &Path) -> Result<Self> {
        let root = dir
            .ancestors()
            .take_while(|ancestor| !ancestor.as_os_str().is_empty() && !ancestor.exists())
            .last()
            .unwrap_or(dir)
            .to_path_buf();
        fs::create_dir_all(dir).at(dir)?;
        Ok(Self {
            root,
            complete: false,
        })
    }

    fn complete(mut self) {
        self.complete = true;
    }
}

impl Drop for PartialProject {
    fn drop(&mut self) {
        if self.complete {
            return;
        }
        tracing::debug!("Removing the incomplete project {}", self.root.display());
        if let Err(error) = fs::remove_dir_all(&self.root) {
            tracing::warn!("Failed to remove {}: {error}", self.root.display());
        }
    }
}

/// A freshly created project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    pub dir: PathBuf,
    /// The CMSIS model the project was configured for, e.g. `stm32f103xb`.
    pub model: String,
    pub build_config: BuildConfig,
    pub record: ProjectRecord,
}

/// Model stems of the device headers in `system/cmsis`.
fn available_models(cmsis: &Path) -> Result<Vec<String>> {
    Ok(fs_tree::files_in(cmsis)?
        .iter()
        .filter_map(|file| file.file_stem().and_then(|stem| stem.to_str()))
        .filter(|stem| is_model_file(stem))
        .map(str::to_string)
        .collect())
}

/// Picks the model of `descriptor` among the headers in `system/cmsis`.
pub fn select_project_model(project: &Path, descriptor: &McuDescriptor) -> Result<String> {
    let models = available_models(&project.join("system/cmsis"))?;

    match select_model(models.iter().map(String::as_str), &descriptor.name) {
        ModelSelection::Unique(model) => Ok(model.to_string()),
        ModelSelection::None => Err(Error::NoMatchingModel {
            name: descriptor.name.to_string(),
        }),
        ModelSelection::Ambiguous(candidates) => Err(Error::AmbiguousModel {
            name: descriptor.name.to_string(),
            candidates: candidates.into_iter().map(str::to_string).collect(),
        }),
    }
}

/// Deletes the startup files and device headers of all other models.
pub fn prune_other_models(project: &Path, model: &str) -> Result<usize> {
    let keep_startup = format!("{STARTUP_PREFIX}{model}.s");
    let keep_header = format!("{model}.h");
    let mut removed = 0;

    for file in fs_tree::files_in(&project.join("system"))? {
        let name = file_name(&file);
        if name.contains(STARTUP_PREFIX) && name != keep_startup {
            fs::remove_file(&file).at(&file)?;
            removed += 1;
        }
    }

    for file in fs_tree::files_in(&project.join("system/cmsis"))? {
        let stem = file.file_stem().and_then(|stem| stem.to_str()).unwrap_or("");
        if is_model_file(stem) && file_name(&file) != keep_header {
            fs::remove_file(&file).at(&file)?;
            removed += 1;
        }
    }

    Ok(removed)
}

/// The family header in `system/cmsis`, e.g. `stm32f1xx.h`.
pub fn family_header(project: &Path) -> Result<Option<String>> {
    Ok(fs_tree::files_in(&project.join("system/cmsis"))?
        .iter()
        .find(|file| {
            file.file_stem()
                .and_then(|stem| stem.to_str())
                .is_some_and(is_family_header)
        })
        .map(|file| file_name(file).to_string()))
}

/// Copies the common project files and fills in the family header.
pub fn copy_common_files(common: &Path, project: &Path) -> Result<usize> {
    if !common.is_dir() {
        tracing::debug!("No common project files at {}", common.display());
        return Ok(0);
    }

    let copied = fs_tree::copy_dir_content(common, project)?;

    let Some(header) = family_header(project)? else {
        tracing::warn!("No CMSIS family header found, {FAMILY_INCLUDE_PLACEHOLDER} is left as is");
        return Ok(copied);
    };

    fs_tree::visit_dirs(common, &mut |entry| {
        if !entry.is_dir {
            let copy = project.join(&entry.relative);
            if fs_tree::replace_in_file(&copy, FAMILY_INCLUDE_PLACEHOLDER, &header)? {
                tracing::debug!("Included {header} in {}", entry.relative.display());
            }
        }
        Ok(Walk::Continue)
    })?;

    Ok(copied)
}

/// Removes HAL template files (`*_template.c`) that are not meant to be built.
pub fn remove_template_leftovers(project: &Path) -> Result<usize> {
    let mut removed = 0;
    for file in fs_tree::files_in(&project.join("system/hal"))? {
        if file_name(&file).contains(TEMPLATE_MARKER) {
            fs::remove_file(&file).at(&file)?;
            removed += 1;
        }
    }
    Ok(removed)
}

/// Creates projects from the templates of a [`TemplateStore`].
pub struct Instantiator<'a> {
    store: &'a TemplateStore,
    common_dir: PathBuf,
    settings: BuildSettings,
    cancel: &'a CancelFlag,
}

impl<'a> Instantiator<'a> {
    pub fn new(
        store: &'a TemplateStore,
        common_dir: impl Into<PathBuf>,
        settings: BuildSettings,
        cancel: &'a CancelFlag,
    ) -> Self {
        Self {
            store,
            common_dir: common_dir.into(),
            settings,
            cancel,
        }
    }

    /// Creates a project for `descriptor` at `destination`.
    ///
    /// On failure nothing is left at `destination`.
    #[tracing::instrument(skip_all, name = "Create project", fields(mcu = %descriptor.name))]
    pub fn instantiate(&self, descriptor: &McuDescriptor, destination: &Path) -> Result<Project> {
        if destination.exists() {
            return Err(Error::DestinationExists {
                path: destination.to_path_buf(),
            });
        }
        let template = self.store.require(descriptor.family, descriptor.series)?;
        tracing::info!(
            "Creating {} from template {} {}",
            destination.display(),
            template.metadata.basename(),
            template.metadata.version
        );

        let partial = PartialProject::create(destination)?;
        let project = self.populate(descriptor, &template.archive, destination)?;
        partial.complete();

        Ok(project)
    }

    fn populate(&self, descriptor: &McuDescriptor, archive: &Path, dir: &Path) -> Result<Project> {
        let file = fs::File::open(archive).at(archive)?;
        fs_tree::extract_zip(file, dir, self.cancel)?;

        let model = select_project_model(dir, descriptor)?;
        let removed = prune_other_models(dir, &model)?;
        tracing::debug!("Selected model {model}, removed {removed} files of other models");
        if !dir.join(startup_file(&model)).is_file() {
            tracing::warn!("The template has no startup file for {model}");
        }

        let layout_path = dir.join(MEMORY_LAYOUT_FILE);
        fs::write(&layout_path, MemoryLayout::for_descriptor(descriptor).to_string())
            .at(&layout_path)?;

        let common = copy_common_files(&self.common_dir, dir)?;
        tracing::debug!("Copied {common} common files");

        let build_config = BuildConfig::new(descriptor, &model, &self.settings);
        let config_path = dir.join(BUILD_CONFIG_FILE);
        fs::write(&config_path, build_config.to_string()).at(&config_path)?;

        let record = ProjectRecord::from(descriptor);
        record.save(dir)?;

        let leftovers = remove_template_leftovers(dir)?;
        tracing::debug!("Removed {leftovers} HAL template files");
        self.cancel.check()?;

        Ok(Project {
            dir: dir.to_path_buf(),
            model,
            build_config,
            record,
        })
    }
}
