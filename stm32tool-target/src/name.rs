use serde::{Deserialize, Serialize};
use std::fmt;

/// Every supported device name starts with this prefix.
pub const VENDOR_PREFIX: &str = "STM32";

/// Length of a canonical device name, e.g. `STM32F103C8`.
pub const CANONICAL_NAME_LEN: usize = 11;

/// Shortest name that still carries a family and a series, e.g. `STM32F4`.
const SERIES_NAME_LEN: usize = 7;

/// Position of the family letter in a device name.
const FAMILY_POSITION: usize = 5;

/// Position of the flash size code in a canonical device name.
const FLASH_CODE_POSITION: usize = 10;

/// Errors produced while tokenizing a device name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, docsplay::Display)]
pub enum NameError {
    /// '{name}' is too short, at least {expected} characters are required.
    TooShort {
        /// The rejected name.
        name: String,
        /// The minimum length.
        expected: usize,
    },

    /// '{name}' is not an STM32 device name, it has to start with 'STM32'.
    MissingVendorPrefix {
        /// The rejected name.
        name: String,
    },

    /// '{name}' has the unknown family letter '{letter}', expected 'F' or 'L'.
    UnknownFamily {
        /// The rejected name.
        name: String,
        /// The letter found at the family position.
        letter: char,
    },

    /// '{name}' has no series digit after the family letter.
    InvalidSeries {
        /// The rejected name.
        name: String,
    },
}

/// The device family, encoded by the letter following the vendor prefix.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Family {
    /// Mainstream and high performance devices (`STM32F...`).
    F,
    /// Low power devices (`STM32L...`).
    L,
}

impl Family {
    /// Looks up the family for a name letter, ignoring case.
    pub fn from_letter(letter: char) -> Option<Self> {
        match letter.to_ascii_uppercase() {
            'F' => Some(Family::F),
            'L' => Some(Family::L),
            _ => None,
        }
    }

    /// Looks up the family for its numeric id as stored in template metadata.
    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            0 => Some(Family::F),
            1 => Some(Family::L),
            _ => None,
        }
    }

    /// The numeric id of the family, `0` for F and `1` for L.
    pub fn id(self) -> u8 {
        match self {
            Family::F => 0,
            Family::L => 1,
        }
    }

    /// The uppercase letter used in device names.
    pub fn letter(self) -> char {
        match self {
            Family::F => 'F',
            Family::L => 'L',
        }
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

/// Extracts family and series from a (possibly partial) device name.
///
/// Anything from `STM32F4` up to a full part number is accepted, the name is
/// compared case-insensitively.
pub fn parse_series(name: &str) -> Result<(Family, u8), NameError> {
    let upper = name.to_uppercase();
    let chars: Vec<char> = upper.chars().collect();

    if chars.len() < SERIES_NAME_LEN {
        return Err(NameError::TooShort {
            name: upper,
            expected: SERIES_NAME_LEN,
        });
    }

    if !upper.starts_with(VENDOR_PREFIX) {
        return Err(NameError::MissingVendorPrefix { name: upper });
    }

    let letter = chars[FAMILY_POSITION];
    let Some(family) = Family::from_letter(letter) else {
        return Err(NameError::UnknownFamily {
            name: upper,
            letter,
        });
    };

    match chars[FAMILY_POSITION + 1].to_digit(10) {
        Some(series) => Ok((family, series as u8)),
        None => Err(NameError::InvalidSeries { name: upper }),
    }
}

/// A validated, uppercase device name of exactly [`CANONICAL_NAME_LEN`] characters.
///
/// Longer part numbers (with package and temperature suffixes) are truncated,
/// so `stm32f103c8t6` and `STM32F103C8` yield the same canonical name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CanonicalName {
    name: String,
    family: Family,
    series: u8,
    flash_code: char,
}

impl CanonicalName {
    /// Tokenizes and validates a raw device name.
    pub fn parse(raw: &str) -> Result<Self, NameError> {
        let name: String = raw.to_uppercase().chars().take(CANONICAL_NAME_LEN).collect();

        if name.chars().count() < CANONICAL_NAME_LEN {
            return Err(NameError::TooShort {
                name,
                expected: CANONICAL_NAME_LEN,
            });
        }

        let (family, series) = parse_series(&name)?;
        let flash_code = name
            .chars()
            .nth(FLASH_CODE_POSITION)
            .ok_or_else(|| NameError::TooShort {
                name: name.clone(),
                expected: CANONICAL_NAME_LEN,
            })?;

        Ok(Self {
            name,
            family,
            series,
            flash_code,
        })
    }

    /// The canonical name.
    pub fn as_str(&self) -> &str {
        &self.name
    }

    /// The family encoded in the name.
    pub fn family(&self) -> Family {
        self.family
    }

    /// The series digit encoded in the name.
    pub fn series(&self) -> u8 {
        self.series
    }

    /// The last character, which encodes the flash size.
    pub fn flash_code(&self) -> char {
        self.flash_code
    }
}

impl fmt::Display for CanonicalName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl AsRef<str> for CanonicalName {
    fn as_ref(&self) -> &str {
        &self.name
    }
}

impl TryFrom<String> for CanonicalName {
    type Error = NameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        CanonicalName::parse(&value)
    }
}

impl From<CanonicalName> for String {
    fn from(value: CanonicalName) -> Self {
        value.name
    }
}
