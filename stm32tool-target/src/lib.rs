//! Device description schema
//!
//! Creating a firmware project for an STM32 microcontroller needs a handful of
//! device parameters: the CPU core, whether an FPU is present, the flash and
//! RAM sizes and the layout of the memory map. Most of them can be derived
//! from the device name alone, because ST encodes the family, the series and
//! the flash size in fixed positions of the part number.
//!
//! This crate contains the name tokenizer, the derivation tables and the
//! schema structs built from them. It does not touch the filesystem.
//!
#![warn(missing_docs)]

mod cpu;
mod descriptor;
mod flash;
mod memory;
mod model;
mod name;

pub use cpu::{derive_core, CoreInfo, CpuCore, InstructionSet};
pub use descriptor::{DescriptorError, McuDescriptor};
pub use flash::{flash_size_kb, FLASH_SIZE_CODES};
pub use memory::{MemoryAccess, MemoryLayout, MemoryRegion, FLASH_ORIGIN, RAM_ORIGIN};
pub use model::{
    cmsis_model_name, device_macro, is_family_header, is_model_file, matches_model_pattern,
    select_model, ModelSelection, CMSIS_NAME_EXCEPTIONS,
};
pub use name::{
    parse_series, CanonicalName, Family, NameError, CANONICAL_NAME_LEN, VENDOR_PREFIX,
};
