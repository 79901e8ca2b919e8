use crate::descriptor::DescriptorError;

/// Flash size in KiB for each code character at the end of a canonical name.
pub const FLASH_SIZE_CODES: [(char, u32); 11] = [
    ('4', 16),
    ('6', 32),
    ('8', 64),
    ('B', 128),
    ('C', 256),
    ('D', 384),
    ('E', 512),
    ('F', 768),
    ('G', 1024),
    ('I', 2048),
    ('Z', 192),
];

/// Looks up the flash size in KiB for a flash code character.
pub fn flash_size_kb(code: char) -> Result<u32, DescriptorError> {
    FLASH_SIZE_CODES
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, size)| *size)
        .ok_or(DescriptorError::UnknownFlashCode { code })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::McuDescriptor;

    #[test]
    fn every_code_resolves_through_a_name() {
        for (code, size) in FLASH_SIZE_CODES {
            let name = format!("STM32F030C{code}");
            let descriptor = McuDescriptor::parse(&name).unwrap();

            assert_eq!(descriptor.flash_kb, size, "flash code {code}");
        }
    }

    #[test]
    fn unknown_code_is_rejected() {
        assert_eq!(
            flash_size_kb('A'),
            Err(DescriptorError::UnknownFlashCode { code: 'A' })
        );
        assert!(matches!(
            McuDescriptor::parse("STM32F030CA"),
            Err(DescriptorError::UnknownFlashCode { code: 'A' })
        ));
    }
}
