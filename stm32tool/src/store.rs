//! The template store: one normalized project template per series.
//!
//! Each template is a metadata record `<basename>.json` and an archive
//! `<basename>-<version>.zip`. Installing a new version writes the archive
//! first and then replaces the metadata record, which is the commit point.
//! The archive of the superseded version is removed afterwards. Readers only
//! open the archive named by the record they read, so they never combine a
//! record and an archive of different versions.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use stm32tool_target::Family;

use crate::error::{Error, IoResultExt, Result};
use crate::repository::JsonRepository;

/// The metadata record of a stored template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateMetadata {
    #[serde(rename = "familyID")]
    pub family_id: u8,
    #[serde(rename = "seriesID")]
    pub series_id: u8,
    #[serde(rename = "versionString")]
    pub version: String,
    #[serde(rename = "versionNumeric", alias = "versionNum")]
    pub version_number: u64,
}

impl TemplateMetadata {
    pub fn new(family: Family, series: u8, version: impl Into<String>, version_number: u64) -> Self {
        Self {
            family_id: family.id(),
            series_id: series,
            version: version.into(),
            version_number,
        }
    }

    pub fn family(&self) -> Option<Family> {
        Family::from_id(self.family_id)
    }

    pub fn is_for(&self, family: Family, series: u8) -> bool {
        self.family_id == family.id() && self.series_id == series
    }

    /// The name shared by the record and the archive, e.g. `stm32f4`.
    pub fn basename(&self) -> String {
        basename(self.family().unwrap_or(Family::F), self.series_id)
    }

    /// File name of the archive holding this version.
    pub fn archive_name(&self) -> String {
        format!("{}-{}.zip", self.basename(), self.version)
    }
}

/// The name shared by the record and the archive of a series template.
pub fn basename(family: Family, series: u8) -> String {
    format!("stm32{}{}", family.letter().to_ascii_lowercase(), series)
}

/// A template found in the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredTemplate {
    pub metadata: TemplateMetadata,
    pub archive: PathBuf,
}

#[derive(Debug, Clone)]
pub struct TemplateStore {
    records: JsonRepository,
}

impl TemplateStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            records: JsonRepository::new(dir),
        }
    }

    pub fn dir(&self) -> &Path {
        self.records.dir()
    }

    /// Resolves the archive of a record.
    ///
    /// Archives written before versioned names were introduced are named after the basename only.
    fn archive_for(&self, metadata: &TemplateMetadata) -> Option<PathBuf> {
        let versioned = self.dir().join(metadata.archive_name());
        if versioned.is_file() {
            return Some(versioned);
        }

        let legacy = self.dir().join(format!("{}.zip", metadata.basename()));
        legacy.is_file().then_some(legacy)
    }

    /// All templates with a record and an archive, in basename order.
    pub fn list(&self) -> Result<Vec<StoredTemplate>> {
        let mut templates = Vec::new();
        for (key, metadata) in self.records.list::<TemplateMetadata>()? {
            if metadata.family().is_none() {
                tracing::warn!("Ignoring template record {key} with unknown family {}", metadata.family_id);
                continue;
            }
            match self.archive_for(&metadata) {
                Some(archive) => templates.push(StoredTemplate { metadata, archive }),
                None => tracing::warn!("Ignoring template record {key} without an archive"),
            }
        }
        Ok(templates)
    }

    /// The current template of a series, if there is one.
    pub fn find(&self, family: Family, series: u8) -> Result<Option<StoredTemplate>> {
        Ok(self
            .list()?
            .into_iter()
            .filter(|template| template.metadata.is_for(family, series))
            .max_by_key(|template| template.metadata.version_number))
    }

    /// Like [`TemplateStore::find`], failing when there is no template.
    pub fn require(&self, family: Family, series: u8) -> Result<StoredTemplate> {
        self.find(family, series)?
            .ok_or(Error::TemplateNotFound { family, series })
    }

    /// Creates a temporary file in the store directory to build an archive in.
    ///
    /// The file is removed when dropped, unless it is passed to [`TemplateStore::install`].
    pub fn staging_archive(&self) -> Result<tempfile::NamedTempFile> {
        fs::create_dir_all(self.dir()).at(self.dir())?;
        tempfile::Builder::new()
            .prefix(".staging-")
            .suffix(".zip")
            .tempfile_in(self.dir())
            .at(self.dir())
    }

    /// Makes `archive` the current template of its series.
    pub fn install(
        &self,
        metadata: &TemplateMetadata,
        archive: tempfile::NamedTempFile,
    ) -> Result<StoredTemplate> {
        let key = metadata.basename();
        let previous = match self.records.get::<TemplateMetadata>(&key) {
            Ok(previous) => previous,
            Err(error) => {
                tracing::warn!(
                    "Replacing the unreadable template record {key}, its archive is left in place: {error}"
                );
                None
            }
        };
        let previous_archive = previous.as_ref().and_then(|previous| self.archive_for(previous));

        let target = self.dir().join(metadata.archive_name());
        archive.persist(&target).map_err(|error| Error::Io {
            path: target.clone(),
            source: error.error,
        })?;

        self.records.put(&key, metadata)?;
        tracing::info!("Installed template {key} version {}", metadata.version);

        if let Some(old) = previous_archive.filter(|old| *old != target) {
            if let Err(error) = fs::remove_file(&old) {
                tracing::warn!("Failed to remove the superseded archive {}: {error}", old.display());
            }
        }

        Ok(StoredTemplate {
            metadata: metadata.clone(),
            archive: target,
        })
    }
}
