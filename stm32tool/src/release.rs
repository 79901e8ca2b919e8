//! Release identification of STM32Cube packages.

use std::fmt;

use regex::Regex;
use stm32tool_target::Family;

use crate::error::{Error, Result};

/// Leading token of every STM32Cube firmware release string.
pub const RELEASE_MARKER: &str = "FW";

/// A parsed release string such as `FW.F4.1.24.0`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseDescriptor {
    pub family: Family,
    pub series: u8,
    /// The dotted version, kept verbatim.
    pub version: String,
    /// The version digits concatenated into one number, `1.24.0` becomes `1240`.
    ///
    /// Versions are compared by this number only.
    pub version_number: u64,
}

fn invalid(reason: impl Into<String>) -> Error {
    Error::InvalidPackage {
        reason: reason.into(),
    }
}

/// Derives the comparable version number from a dotted version string.
///
/// The digits of all components are concatenated, which only orders versions
/// correctly while the component widths stay the same: `1.10.0` (1100) sorts
/// above `2.0.0` (200). Stores written so far depend on this numbering.
pub fn version_number(version: &str) -> Option<u64> {
    let digits: String = version.split('.').collect();
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

impl ReleaseDescriptor {
    pub fn parse(release: &str) -> Result<Self> {
        let mut tokens = release.trim().splitn(3, '.');
        let (Some(marker), Some(series_token), Some(version)) =
            (tokens.next(), tokens.next(), tokens.next())
        else {
            return Err(invalid(format!("malformed release string '{release}'")));
        };

        if marker != RELEASE_MARKER {
            return Err(invalid(format!(
                "release string '{release}' does not start with '{RELEASE_MARKER}'"
            )));
        }

        let mut chars = series_token.chars();
        let family = chars
            .next()
            .and_then(Family::from_letter)
            .ok_or_else(|| invalid(format!("unknown family in release string '{release}'")))?;
        let series = chars
            .as_str()
            .parse()
            .map_err(|_| invalid(format!("invalid series in release string '{release}'")))?;

        let version_number = version_number(version)
            .ok_or_else(|| invalid(format!("invalid version in release string '{release}'")))?;

        Ok(Self {
            family,
            series,
            version: version.to_string(),
            version_number,
        })
    }

    /// The name of the series, e.g. `STM32F4`.
    pub fn series_name(&self) -> String {
        format!("STM32{}{}", self.family, self.series)
    }
}

impl fmt::Display for ReleaseDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} series, HAL version {}", self.series_name(), self.version)
    }
}

/// Reads the release string from a `package.xml` manifest.
pub fn release_from_manifest(manifest: &str) -> Result<String> {
    let attribute = Regex::new(r#"\bRelease\s*=\s*"([^"]*)""#)
        .map_err(|error| invalid(error.to_string()))?;

    attribute
        .captures(manifest)
        .and_then(|captures| captures.get(1))
        .map(|release| release.as_str().to_string())
        .ok_or_else(|| invalid("the package manifest has no release attribute"))
}
