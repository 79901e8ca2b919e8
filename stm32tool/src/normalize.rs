//! Turns an STM32Cube distribution into a project template.
//!
//! The template layout is fixed:
//!
//! ```text
//! src/            seed configuration headers (stm32xxxx_hal_conf.h)
//! libs/
//! system/         system sources and GCC startup files of all models
//! system/hal/     HAL driver sources and headers
//! system/cmsis/   CMSIS core and device headers
//! ldscripts/
//! ```
//!
//! Every transformation rule is a separate step, applied in order to a staging
//! directory. The template is only installed once all steps succeeded.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, IoResultExt, Result};
use crate::fs_tree::{self, file_name};
use crate::interrupt::CancelFlag;
use crate::release::ReleaseDescriptor;
use crate::store::{StoredTemplate, TemplateMetadata, TemplateStore};
use crate::vendor::VendorDistribution;

/// The directories every template contains.
pub const TEMPLATE_LAYOUT: [&str; 5] = ["src", "libs", "system/hal", "system/cmsis", "ldscripts"];

/// Files carrying this marker are system sources and live in `system/`.
pub const SYSTEM_SOURCE_MARKER: &str = "system_";

/// Files carrying this marker seed the project configuration in `src/`.
pub const CONFIG_TEMPLATE_MARKER: &str = "_conf_template";

/// Stripped from seed configuration files.
pub const TEMPLATE_MARKER: &str = "_template";

/// Linker scripts shipped with the startup files, replaced by generated ones.
pub const LEGACY_LINKER_DIR: &str = "linker";

/// What a normalization did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NormalizeOutcome {
    /// The package was installed as the current template of its series.
    Installed {
        template: StoredTemplate,
        replaced: Option<TemplateMetadata>,
    },
    /// The store already holds this or a newer version, nothing was changed.
    UpToDate { current: TemplateMetadata },
}

/// The directories of a vendor tree the template is built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VendorLayout {
    /// `Drivers/CMSIS/Include`
    pub cmsis_include: PathBuf,
    /// `Drivers/CMSIS/Device/ST/<series>`
    pub device: PathBuf,
    /// `Drivers/<series>_HAL_Driver`
    pub hal: PathBuf,
}

impl VendorLayout {
    pub fn device_include(&self) -> PathBuf {
        self.device.join("Include")
    }

    pub fn device_templates(&self) -> PathBuf {
        self.device.join("Source").join("Templates")
    }

    pub fn gcc_startup(&self) -> PathBuf {
        self.device_templates().join("gcc")
    }
}

fn require_dir(path: PathBuf, component: &'static str) -> Result<PathBuf> {
    if path.is_dir() {
        Ok(path)
    } else {
        Err(Error::MissingRequiredComponent { component, path })
    }
}

/// Finds the directories the template is built from.
pub fn locate_components(tree: &Path) -> Result<VendorLayout> {
    let drivers = require_dir(tree.join("Drivers"), "drivers directory")?;
    let cmsis = drivers.join("CMSIS");
    let cmsis_include = require_dir(cmsis.join("Include"), "CMSIS core include directory")?;

    let vendor_devices = require_dir(cmsis.join("Device").join("ST"), "CMSIS device directory")?;
    let device = fs_tree::dirs_in(&vendor_devices)?
        .into_iter()
        .next()
        .ok_or(Error::MissingRequiredComponent {
            component: "CMSIS device directory",
            path: vendor_devices,
        })?;

    let hal = fs_tree::dirs_in(&drivers)?
        .into_iter()
        .filter(|dir| file_name(dir).contains("HAL"))
        .last()
        .ok_or_else(|| Error::MissingRequiredComponent {
            component: "HAL driver directory",
            path: drivers.clone(),
        })?;

    let layout = VendorLayout {
        cmsis_include,
        device,
        hal,
    };
    require_dir(layout.device_include(), "CMSIS device include directory")?;
    require_dir(layout.gcc_startup(), "GCC startup directory")?;
    require_dir(layout.hal.join("Src"), "HAL source directory")?;
    require_dir(layout.hal.join("Inc"), "HAL include directory")?;

    Ok(layout)
}

/// Creates the empty template layout.
pub fn create_layout(staging: &Path) -> Result<()> {
    for dir in TEMPLATE_LAYOUT {
        let path = staging.join(dir);
        fs::create_dir_all(&path).at(&path)?;
    }
    Ok(())
}

/// Copies the CMSIS core and device headers into `system/cmsis`.
pub fn copy_cmsis(layout: &VendorLayout, staging: &Path) -> Result<()> {
    let cmsis = staging.join("system/cmsis");
    fs_tree::copy_dir_content(&layout.cmsis_include, &cmsis)?;
    fs_tree::copy_dir_content(&layout.device_include(), &cmsis)?;
    Ok(())
}

/// Moves system sources out of `system/cmsis` into `system`.
pub fn relocate_system_sources(staging: &Path) -> Result<usize> {
    let cmsis = staging.join("system/cmsis");
    let system = staging.join("system");

    let mut moved = 0;
    for file in fs_tree::files_in(&cmsis)? {
        let name = file_name(&file);
        if name.contains(SYSTEM_SOURCE_MARKER) {
            fs_tree::move_file(&file, &system.join(name))?;
            moved += 1;
        }
    }
    Ok(moved)
}

/// Copies the system source templates of the device into `system`.
pub fn copy_system_templates(layout: &VendorLayout, staging: &Path) -> Result<usize> {
    let system = staging.join("system");

    let mut copied = 0;
    for file in fs_tree::files_in(&layout.device_templates())? {
        let name = file_name(&file);
        if name.contains(SYSTEM_SOURCE_MARKER) {
            let target = system.join(name);
            fs::copy(&file, &target).at(&target)?;
            copied += 1;
        }
    }
    Ok(copied)
}

/// Copies the GCC startup files of all models into `system`.
pub fn copy_gcc_startup(layout: &VendorLayout, staging: &Path) -> Result<usize> {
    fs_tree::copy_dir_content(&layout.gcc_startup(), &staging.join("system"))
}

/// Removes the linker scripts that came with the startup files.
pub fn remove_legacy_linker(staging: &Path) -> Result<bool> {
    let linker = staging.join("system").join(LEGACY_LINKER_DIR);
    if !linker.is_dir() {
        return Ok(false);
    }
    fs::remove_dir_all(&linker).at(&linker)?;
    Ok(true)
}

/// Copies the HAL driver sources and headers into `system/hal`.
pub fn copy_hal(layout: &VendorLayout, staging: &Path) -> Result<usize> {
    let hal = staging.join("system/hal");
    let sources = fs_tree::copy_dir_content(&layout.hal.join("Src"), &hal)?;
    let headers = fs_tree::copy_dir_content(&layout.hal.join("Inc"), &hal)?;
    Ok(sources + headers)
}

/// Moves configuration templates from `system/hal` to `src`, dropping the template marker.
///
/// `stm32f1xx_hal_conf_template.h` becomes `src/stm32f1xx_hal_conf.h`.
pub fn seed_configuration(staging: &Path) -> Result<Vec<String>> {
    let hal = staging.join("system/hal");
    let src = staging.join("src");

    let mut seeded = Vec::new();
    for file in fs_tree::files_in(&hal)? {
        let name = file_name(&file);
        if name.contains(CONFIG_TEMPLATE_MARKER) {
            let seed = name.replace(TEMPLATE_MARKER, "");
            fs_tree::move_file(&file, &src.join(&seed))?;
            seeded.push(seed);
        }
    }
    Ok(seeded)
}

/// Builds the template tree of a vendor distribution in `staging`.
pub fn build_template(tree: &Path, staging: &Path, cancel: &CancelFlag) -> Result<()> {
    let layout = locate_components(tree)?;
    tracing::debug!("Vendor layout: {layout:?}");

    create_layout(staging)?;

    copy_cmsis(&layout, staging)?;
    let relocated = relocate_system_sources(staging)?;
    let templates = copy_system_templates(&layout, staging)?;
    tracing::debug!("CMSIS: relocated {relocated} system headers, copied {templates} system sources");
    cancel.check()?;

    let startup = copy_gcc_startup(&layout, staging)?;
    if remove_legacy_linker(staging)? {
        tracing::debug!("Removed the legacy linker scripts");
    }
    tracing::debug!("Copied {startup} startup files");
    cancel.check()?;

    let hal = copy_hal(&layout, staging)?;
    let seeded = seed_configuration(staging)?;
    tracing::debug!("HAL: copied {hal} files, seeded {seeded:?}");
    cancel.check()?;

    Ok(())
}

/// Installs vendor distributions into a [`TemplateStore`].
pub struct Normalizer<'a> {
    store: &'a TemplateStore,
    scratch_dir: PathBuf,
    cancel: &'a CancelFlag,
}

impl<'a> Normalizer<'a> {
    pub fn new(store: &'a TemplateStore, scratch_dir: impl Into<PathBuf>, cancel: &'a CancelFlag) -> Self {
        Self {
            store,
            scratch_dir: scratch_dir.into(),
            cancel,
        }
    }

    /// Extracts a vendor archive and normalizes it.
    #[tracing::instrument(skip_all, name = "Acquire package", fields(archive = %archive.display()))]
    pub fn acquire(&self, archive: &Path) -> Result<NormalizeOutcome> {
        let distribution = VendorDistribution::extract(archive, &self.scratch_dir, self.cancel)?;
        tracing::info!("Package: {}", distribution.release());
        self.normalize(distribution.root(), distribution.release())
    }

    /// Normalizes an extracted vendor tree, unless the store already has this or a newer version.
    pub fn normalize(&self, tree: &Path, release: &ReleaseDescriptor) -> Result<NormalizeOutcome> {
        let current = self.store.find(release.family, release.series)?;
        if let Some(current) = current.as_ref() {
            if current.metadata.version_number >= release.version_number {
                tracing::info!(
                    "{} {} is already installed, nothing to do",
                    release.series_name(),
                    current.metadata.version
                );
                return Ok(NormalizeOutcome::UpToDate {
                    current: current.metadata.clone(),
                });
            }
            tracing::info!(
                "Updating {} from {} to {}",
                release.series_name(),
                current.metadata.version,
                release.version
            );
        }

        fs::create_dir_all(&self.scratch_dir).at(&self.scratch_dir)?;
        let staging = tempfile::Builder::new()
            .prefix("template-")
            .tempdir_in(&self.scratch_dir)
            .at(&self.scratch_dir)?;

        build_template(tree, staging.path(), self.cancel)?;

        let mut archive = self.store.staging_archive()?;
        fs_tree::zip_dir_content(staging.path(), archive.as_file_mut(), self.cancel)?;

        let metadata = TemplateMetadata::new(
            release.family,
            release.series,
            release.version.clone(),
            release.version_number,
        );
        let template = self.store.install(&metadata, archive)?;

        Ok(NormalizeOutcome::Installed {
            template,
            replaced: current.map(|current| current.metadata),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{file_list, VendorTree};
    use pretty_assertions::assert_eq;
    use stm32tool_target::Family;

    struct Fixture {
        dir: tempfile::TempDir,
        store: TemplateStore,
        cancel: CancelFlag,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            let store = TemplateStore::new(dir.path().join("templates"));
            Self {
                dir,
                store,
                cancel: CancelFlag::new(),
            }
        }

        fn normalizer(&self) -> Normalizer<'_> {
            Normalizer::new(&self.store, self.dir.path().join("temp"), &self.cancel)
        }

        fn normalize(&self, tree: &VendorTree) -> Result<NormalizeOutcome> {
            let vendor = tempfile::tempdir().unwrap();
            let root = tree.write(vendor.path());
            let release = ReleaseDescriptor::parse(&tree.release).unwrap();
            self.normalizer().normalize(&root, &release)
        }
    }

    #[test]
    fn template_layout() {
        let vendor = tempfile::tempdir().unwrap();
        let root = VendorTree::f1("1.8.0").write(vendor.path());
        let staging = tempfile::tempdir().unwrap();

        build_template(&root, staging.path(), &CancelFlag::new()).unwrap();

        assert_eq!(
            file_list(staging.path()),
            vec![
                "src/stm32f1xx_hal_conf.h",
                "system/cmsis/cmsis_gcc.h",
                "system/cmsis/core_cm3.h",
                "system/cmsis/stm32f100xb.h",
                "system/cmsis/stm32f103x6.h",
                "system/cmsis/stm32f103xb.h",
                "system/cmsis/stm32f1xx.h",
                "system/hal/stm32f1xx_hal.c",
                "system/hal/stm32f1xx_hal.h",
                "system/hal/stm32f1xx_hal_msp_template.c",
                "system/startup_stm32f100xb.s",
                "system/startup_stm32f103x6.s",
                "system/startup_stm32f103xb.s",
                "system/system_stm32f1xx.c",
                "system/system_stm32f1xx.h",
            ]
        );
        for dir in TEMPLATE_LAYOUT {
            assert!(staging.path().join(dir).is_dir(), "{dir} is missing");
        }
    }

    #[test]
    fn missing_hal_driver_writes_nothing() {
        let fixture = Fixture::new();
        let tree = VendorTree::f1("1.8.0").without("Drivers/STM32F1xx_HAL_Driver");

        let result = fixture.normalize(&tree);

        assert!(matches!(
            result,
            Err(Error::MissingRequiredComponent { component: "HAL driver directory", .. })
        ));
        assert_eq!(fixture.store.find(Family::F, 1).unwrap(), None);
        assert!(!fixture.store.dir().exists() || file_list(fixture.store.dir()).is_empty());
        assert!(file_list(&fixture.dir.path().join("temp")).is_empty());
    }

    #[test]
    fn upgrades_are_monotonic() {
        let fixture = Fixture::new();

        let first = fixture.normalize(&VendorTree::f1("1.0.3")).unwrap();
        let second = fixture.normalize(&VendorTree::f1("1.0.7")).unwrap();
        let third = fixture.normalize(&VendorTree::f1("1.0.3")).unwrap();

        assert!(matches!(first, NormalizeOutcome::Installed { replaced: None, .. }));
        match second {
            NormalizeOutcome::Installed { replaced, .. } => {
                assert_eq!(replaced.unwrap().version_number, 103)
            }
            other => panic!("expected an installation, got {other:?}"),
        }
        assert_eq!(
            third,
            NormalizeOutcome::UpToDate {
                current: TemplateMetadata::new(Family::F, 1, "1.0.7", 107)
            }
        );
        assert_eq!(
            file_list(fixture.store.dir()),
            vec!["stm32f1-1.0.7.zip", "stm32f1.json"]
        );
    }

    #[test]
    fn same_version_is_a_no_op() {
        let fixture = Fixture::new();
        fixture.normalize(&VendorTree::f1("1.8.0")).unwrap();
        let archive = fixture.store.require(Family::F, 1).unwrap().archive;
        let before = fs::read(&archive).unwrap();

        let outcome = fixture.normalize(&VendorTree::f1("1.8.0")).unwrap();

        assert!(matches!(outcome, NormalizeOutcome::UpToDate { .. }));
        assert_eq!(fs::read(&archive).unwrap(), before);
    }

    #[test]
    fn interrupted_normalization_leaves_no_trace() {
        let fixture = Fixture::new();
        fixture.cancel.cancel();

        let result = fixture.normalize(&VendorTree::f1("1.8.0"));

        assert!(matches!(result, Err(Error::Interrupted)));
        assert_eq!(fixture.store.find(Family::F, 1).unwrap(), None);
        assert!(file_list(&fixture.dir.path().join("temp")).is_empty());
    }

    #[test]
    fn acquire_reads_the_release_from_the_archive() {
        let fixture = Fixture::new();
        let archive =
            crate::test_support::vendor_archive(fixture.dir.path(), &VendorTree::f1("1.8.0"));

        let outcome = fixture.normalizer().acquire(&archive).unwrap();

        match outcome {
            NormalizeOutcome::Installed { template, .. } => {
                assert_eq!(template.metadata, TemplateMetadata::new(Family::F, 1, "1.8.0", 180));
                assert!(template.archive.ends_with("stm32f1-1.8.0.zip"));
            }
            other => panic!("expected an installation, got {other:?}"),
        }
    }
}
