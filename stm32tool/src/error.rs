use std::path::{Path, PathBuf};

use stm32tool_target::{DescriptorError, Family};

use crate::capacity::RefreshError;
use crate::fetch::FetchError;

/// Errors of the stm32tool core.
///
/// Every message names the stage that failed and, where possible, what the
/// user can do about it.
#[derive(Debug, thiserror::Error, docsplay::Display)]
pub enum Error {
    /// Resolver: {0}
    Descriptor(#[from] DescriptorError),

    /// Capacity database: {name} was not found, check the MCU name or specify the RAM size manually.
    McuNotFound { name: String },

    /// Capacity database: it could not be loaded or updated, you must specify the RAM size manually.
    DatabaseUnavailable(#[source] RefreshError),

    /// Package normalizer: invalid package, {reason}.
    InvalidPackage { reason: String },

    /// Package normalizer: the package has no {component} at {path:?}.
    MissingRequiredComponent {
        component: &'static str,
        path: PathBuf,
    },

    /// Template store: no template for STM32{family}{series}, download it or acquire the package manually.
    TemplateNotFound { family: Family, series: u8 },

    /// Project instantiator: no CMSIS model file matches {name}, ensure the MCU name is correct.
    NoMatchingModel { name: String },

    /// Project instantiator: several CMSIS model files match {name}: {candidates:?}.
    AmbiguousModel {
        name: String,
        candidates: Vec<String>,
    },

    /// Project instantiator: {path:?} already exists, choose another project name.
    DestinationExists { path: PathBuf },

    /// I/O error at {path:?}.
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to read or write a zip archive.
    Zip(#[from] zip::result::ZipError),

    /// Failed to read or write a JSON record.
    Json(#[from] serde_json::Error),

    /// Network: {0}
    Fetch(#[from] FetchError),

    /// The operation was interrupted.
    Interrupted,
}

/// Result type alias for stm32tool operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Attaches the offending path to I/O errors.
pub(crate) trait IoResultExt<T> {
    fn at(self, path: impl AsRef<Path>) -> Result<T>;
}

impl<T> IoResultExt<T> for std::io::Result<T> {
    fn at(self, path: impl AsRef<Path>) -> Result<T> {
        self.map_err(|source| Error::Io {
            path: path.as_ref().to_path_buf(),
            source,
        })
    }
}
