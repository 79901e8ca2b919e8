//! Selection of the device specific CMSIS files.
//!
//! The CMSIS device headers and startup files of a series are named after
//! device patterns such as `stm32f103xb`, where an `x` stands for any
//! character. A project keeps exactly the one pattern matching its device.

use crate::name::{CanonicalName, CANONICAL_NAME_LEN, VENDOR_PREFIX};

/// Devices without CMSIS files of their own, mapped to the device whose files they use.
pub const CMSIS_NAME_EXCEPTIONS: &[(&str, &str)] = &[("STM32F103C8", "STM32F103CB")];

/// Length of a family header stem such as `stm32f1xx`.
const FAMILY_HEADER_LEN: usize = 9;

/// Returns the name to match model files against, applying [`CMSIS_NAME_EXCEPTIONS`].
pub fn cmsis_model_name(name: &CanonicalName) -> &str {
    CMSIS_NAME_EXCEPTIONS
        .iter()
        .find(|(device, _)| *device == name.as_str())
        .map(|(_, substitute)| *substitute)
        .unwrap_or(name.as_str())
}

/// Compares a model pattern with a device name.
///
/// Both strings need the same length. An `x` in the pattern matches any
/// character, all other positions are compared case-insensitively.
pub fn matches_model_pattern(pattern: &str, candidate: &str) -> bool {
    pattern.chars().count() == candidate.chars().count()
        && pattern.chars().zip(candidate.chars()).all(|(p, c)| {
            p.eq_ignore_ascii_case(&'x') || p.to_lowercase().eq(c.to_lowercase())
        })
}

fn has_vendor_prefix(stem: &str) -> bool {
    stem.get(..VENDOR_PREFIX.len())
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case(VENDOR_PREFIX))
}

/// Whether a file stem names a device specific model file, e.g. `stm32f103xb`.
pub fn is_model_file(stem: &str) -> bool {
    stem.chars().count() >= CANONICAL_NAME_LEN && has_vendor_prefix(stem)
}

/// Whether a file stem names the family wide CMSIS header, e.g. `stm32f1xx`.
pub fn is_family_header(stem: &str) -> bool {
    stem.chars().count() == FAMILY_HEADER_LEN && has_vendor_prefix(stem)
}

/// The preprocessor macro selecting a model in the CMSIS headers.
///
/// `stm32f103xb` becomes `STM32F103xB`.
pub fn device_macro(model: &str) -> String {
    model.to_uppercase().replace('X', "x")
}

/// Outcome of matching a device against the available model files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelSelection<'a> {
    /// Exactly one model matches.
    Unique(&'a str),
    /// No model matches.
    None,
    /// More than one model matches.
    Ambiguous(Vec<&'a str>),
}

/// Picks the model among `candidates` that matches the device.
///
/// Candidates are model stems, duplicates (a header and a startup file of the
/// same model) are collapsed before matching.
pub fn select_model<'a, I>(candidates: I, name: &CanonicalName) -> ModelSelection<'a>
where
    I: IntoIterator<Item = &'a str>,
{
    let device = cmsis_model_name(name);

    let mut matching: Vec<&str> = candidates
        .into_iter()
        .filter(|candidate| matches_model_pattern(candidate, device))
        .collect();
    matching.sort_unstable();
    matching.dedup();

    match matching.len() {
        0 => ModelSelection::None,
        1 => ModelSelection::Unique(matching[0]),
        _ => ModelSelection::Ambiguous(matching),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    const F1_MODELS: &[&str] = &[
        "stm32f100xb",
        "stm32f100xe",
        "stm32f101x6",
        "stm32f101xb",
        "stm32f102xb",
        "stm32f103x6",
        "stm32f103xb",
        "stm32f103xe",
        "stm32f103xg",
        "stm32f105xc",
    ];

    #[test_case("stm32f103xb")]
    #[test_case("STM32F072XB")]
    #[test_case("STM32L476RG")]
    fn pattern_matches_itself(pattern: &str) {
        assert!(matches_model_pattern(pattern, pattern));
    }

    #[test]
    fn length_mismatch_never_matches() {
        assert!(!matches_model_pattern("stm32f103xb", "STM32F103CBT"));
        assert!(!matches_model_pattern("stm32f103xb", "STM32F103C"));
        assert!(!matches_model_pattern("", "S"));
    }

    #[test]
    fn wildcard_matches_any_letter_in_any_case() {
        assert!(matches_model_pattern("stm32f103xb", "STM32F103CB"));
        assert!(matches_model_pattern("stm32f103xb", "stm32f103rb"));
        assert!(matches_model_pattern("STM32F103XB", "STM32F103vB"));
        assert!(!matches_model_pattern("stm32f103xb", "STM32F103CE"));
    }

    #[test]
    fn exception_is_applied_before_matching() {
        let name = CanonicalName::parse("STM32F103C8").unwrap();

        assert_eq!(cmsis_model_name(&name), "STM32F103CB");
        assert_eq!(
            select_model(F1_MODELS.iter().copied(), &name),
            ModelSelection::Unique("stm32f103xb")
        );
    }

    #[test]
    fn regular_names_are_not_remapped() {
        let name = CanonicalName::parse("STM32F103RE").unwrap();

        assert_eq!(cmsis_model_name(&name), "STM32F103RE");
        assert_eq!(
            select_model(F1_MODELS.iter().copied(), &name),
            ModelSelection::Unique("stm32f103xe")
        );
    }

    #[test]
    fn header_and_startup_of_one_model_are_not_ambiguous() {
        let name = CanonicalName::parse("STM32F105RC").unwrap();
        let candidates = ["stm32f105xc", "stm32f105xc", "stm32f103xe"];

        assert_eq!(
            select_model(candidates, &name),
            ModelSelection::Unique("stm32f105xc")
        );
    }

    #[test]
    fn missing_and_ambiguous_models() {
        let name = CanonicalName::parse("STM32F103T4").unwrap();
        assert_eq!(
            select_model(F1_MODELS.iter().copied(), &name),
            ModelSelection::None
        );

        let name = CanonicalName::parse("STM32F030C8").unwrap();
        assert_eq!(
            select_model(["stm32f030x8", "stm32f030xx"], &name),
            ModelSelection::Ambiguous(vec!["stm32f030x8", "stm32f030xx"])
        );
    }

    #[test]
    fn file_classification() {
        assert!(is_model_file("stm32f103xb"));
        assert!(is_model_file("STM32F407xx"));
        assert!(!is_model_file("stm32f1xx"));
        assert!(!is_model_file("system_stm32f1xx"));
        assert!(is_family_header("stm32f1xx"));
        assert!(!is_family_header("stm32f103xb"));
        assert!(!is_family_header("core_cm3"));
    }

    #[test]
    fn device_macro_keeps_wildcards_lowercase() {
        assert_eq!(device_macro("stm32f103xb"), "STM32F103xB");
        assert_eq!(device_macro("stm32f407xx"), "STM32F407xx");
    }
}
