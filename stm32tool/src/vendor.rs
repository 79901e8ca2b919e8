//! Reading STM32Cube distribution archives.

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::error::{Error, IoResultExt, Result};
use crate::fs_tree;
use crate::interrupt::CancelFlag;
use crate::release::{release_from_manifest, ReleaseDescriptor};

/// The release manifest at the root of every distribution.
pub const MANIFEST_FILE: &str = "package.xml";

/// An extracted vendor distribution.
///
/// The extracted files live in a scratch directory which is removed when this is dropped.
#[derive(Debug)]
pub struct VendorDistribution {
    _scratch: TempDir,
    root: PathBuf,
    release: ReleaseDescriptor,
}

impl VendorDistribution {
    /// Extracts `archive` into a fresh directory below `scratch_dir`.
    pub fn extract(archive: &Path, scratch_dir: &Path, cancel: &CancelFlag) -> Result<Self> {
        fs::create_dir_all(scratch_dir).at(scratch_dir)?;
        let scratch = tempfile::Builder::new()
            .prefix("package-")
            .tempdir_in(scratch_dir)
            .at(scratch_dir)?;

        tracing::info!("Extracting {}", archive.display());
        let file = fs::File::open(archive).at(archive)?;
        fs_tree::extract_zip(file, scratch.path(), cancel)?;

        let root = single_top_level_dir(scratch.path())?;
        let release = read_release(&root)?;

        Ok(Self {
            _scratch: scratch,
            root,
            release,
        })
    }

    /// The directory holding the vendor tree, e.g. `STM32Cube_FW_F4_V1.24.0`.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn release(&self) -> &ReleaseDescriptor {
        &self.release
    }
}

fn single_top_level_dir(dir: &Path) -> Result<PathBuf> {
    let mut dirs = fs_tree::dirs_in(dir)?;
    if dirs.len() != 1 {
        return Err(Error::InvalidPackage {
            reason: format!(
                "expected exactly one top level directory, found {}",
                dirs.len()
            ),
        });
    }
    Ok(dirs.remove(0))
}

/// Reads and parses the release string of an extracted vendor tree.
pub fn read_release(root: &Path) -> Result<ReleaseDescriptor> {
    let manifest_path = root.join(MANIFEST_FILE);
    if !manifest_path.is_file() {
        return Err(Error::MissingRequiredComponent {
            component: "release manifest",
            path: manifest_path,
        });
    }

    let manifest = fs::read_to_string(&manifest_path).at(&manifest_path)?;
    ReleaseDescriptor::parse(&release_from_manifest(&manifest)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{vendor_archive, VendorTree};
    use pretty_assertions::assert_eq;
    use stm32tool_target::Family;

    #[test]
    fn extracted_distribution_is_removed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let archive = vendor_archive(dir.path(), &VendorTree::f1("1.8.0"));
        let scratch = dir.path().join("temp");

        let distribution =
            VendorDistribution::extract(&archive, &scratch, &CancelFlag::new()).unwrap();

        assert_eq!(distribution.release().family, Family::F);
        assert_eq!(distribution.release().series, 1);
        assert_eq!(distribution.release().version, "1.8.0");
        assert!(distribution.root().join("Drivers").is_dir());

        drop(distribution);
        assert!(fs_tree::dirs_in(&scratch).unwrap().is_empty());
    }

    #[test]
    fn several_top_level_directories_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let tree = dir.path().join("tree");
        fs::create_dir_all(tree.join("a")).unwrap();
        fs::create_dir_all(tree.join("b")).unwrap();

        assert!(matches!(
            single_top_level_dir(&tree),
            Err(Error::InvalidPackage { .. })
        ));
    }

    #[test]
    fn missing_manifest() {
        let dir = tempfile::tempdir().unwrap();

        assert!(matches!(
            read_release(dir.path()),
            Err(Error::MissingRequiredComponent { component: "release manifest", .. })
        ));
    }
}
