use serde::{Deserialize, Serialize};
use std::fmt;

use crate::descriptor::DescriptorError;
use crate::name::Family;

/// Type of a supported core.
#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CpuCore {
    /// ARMv6-M: Cortex M0
    CortexM0,
    /// ARMv7-M: Cortex M3
    CortexM3,
    /// ARMv7e-M: Cortex M4
    CortexM4,
    /// ARMv7e-M: Cortex M7
    CortexM7,
}

impl CpuCore {
    /// The numeric core id, i.e. the digit after the `M`.
    pub fn id(self) -> u8 {
        match self {
            CpuCore::CortexM0 => 0,
            CpuCore::CortexM3 => 3,
            CpuCore::CortexM4 => 4,
            CpuCore::CortexM7 => 7,
        }
    }

    /// The name as understood by `-mcpu`.
    pub fn name(self) -> &'static str {
        match self {
            CpuCore::CortexM0 => "cortex-m0",
            CpuCore::CortexM3 => "cortex-m3",
            CpuCore::CortexM4 => "cortex-m4",
            CpuCore::CortexM7 => "cortex-m7",
        }
    }
}

impl fmt::Display for CpuCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Instruction set used by a core
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstructionSet {
    /// ARM Thumb instruction set, the only one the Cortex-M cores execute.
    #[default]
    Thumb,
}

impl InstructionSet {
    /// The name as understood by `-m<iset>`.
    pub fn as_str(self) -> &'static str {
        match self {
            InstructionSet::Thumb => "thumb",
        }
    }
}

impl fmt::Display for InstructionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Core properties derived from the series digit.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct CoreInfo {
    /// The CPU core.
    pub core: CpuCore,
    /// Whether a single precision FPU is present.
    pub fpu: bool,
}

/// Derives the CPU core and FPU presence for a family and series.
///
/// Both families share the same table: series 0 uses an M0, 1 and 2 an M3,
/// 3 and 4 an M4 with FPU, 7 an M7 with FPU. Everything else is unsupported.
pub fn derive_core(family: Family, series: u8) -> Result<CoreInfo, DescriptorError> {
    let (core, fpu) = match series {
        0 => (CpuCore::CortexM0, false),
        1 | 2 => (CpuCore::CortexM3, false),
        3 | 4 => (CpuCore::CortexM4, true),
        7 => (CpuCore::CortexM7, true),
        _ => return Err(DescriptorError::UnsupportedSeries { family, series }),
    };

    Ok(CoreInfo { core, fpu })
}
