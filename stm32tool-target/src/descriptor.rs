use serde::Serialize;
use std::fmt;

use crate::cpu::{derive_core, CpuCore, InstructionSet};
use crate::flash::flash_size_kb;
use crate::name::{CanonicalName, Family, NameError};

/// Errors produced while deriving a descriptor from a device name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, docsplay::Display)]
pub enum DescriptorError {
    /// The device name is not valid: {0}
    InvalidName(#[from] NameError),

    /// Series STM32{family}{series} is not supported, known series are 0, 1, 2, 3, 4 and 7.
    UnsupportedSeries {
        /// The family of the rejected device.
        family: Family,
        /// The rejected series digit.
        series: u8,
    },

    /// The flash size code '{code}' is unknown.
    UnknownFlashCode {
        /// The last character of the canonical name.
        code: char,
    },
}

/// Everything needed to build a project for one device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct McuDescriptor {
    /// The canonical device name.
    pub name: CanonicalName,
    /// The device family.
    pub family: Family,
    /// The series digit.
    pub series: u8,
    /// The CPU core.
    pub core: CpuCore,
    /// Whether the core has an FPU.
    pub fpu: bool,
    /// The instruction set to compile for.
    pub instruction_set: InstructionSet,
    /// Flash size in KiB.
    pub flash_kb: u32,
    /// RAM size in KiB.
    ///
    /// The RAM size cannot be derived from the name, it is zero until set
    /// with [`McuDescriptor::with_ram`].
    pub ram_kb: u32,
}

impl McuDescriptor {
    /// Parses a raw device name and derives everything the name encodes.
    pub fn parse(raw: &str) -> Result<Self, DescriptorError> {
        Self::from_name(CanonicalName::parse(raw)?)
    }

    /// Derives the descriptor for an already validated name.
    pub fn from_name(name: CanonicalName) -> Result<Self, DescriptorError> {
        let family = name.family();
        let series = name.series();
        let core = derive_core(family, series)?;
        let flash_kb = flash_size_kb(name.flash_code())?;

        Ok(Self {
            name,
            family,
            series,
            core: core.core,
            fpu: core.fpu,
            instruction_set: InstructionSet::Thumb,
            flash_kb,
            ram_kb: 0,
        })
    }

    /// Sets the RAM size in KiB.
    pub fn with_ram(mut self, ram_kb: u32) -> Self {
        self.ram_kb = ram_kb;
        self
    }
}

impl fmt::Display for McuDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "\"{}\": {}({}), FLASH={}kB, RAM={}kB, FPU={}, Iset='{}'",
            self.name,
            self.core.name().to_uppercase(),
            self.core.id(),
            self.flash_kb,
            self.ram_kb,
            self.fpu,
            self.instruction_set
        )
    }
}
