use std::fmt;
use std::ops::Range;

use crate::descriptor::McuDescriptor;

/// Start of the internal flash on every supported device.
pub const FLASH_ORIGIN: u64 = 0x0800_0000;

/// Start of the internal SRAM on every supported device.
pub const RAM_ORIGIN: u64 = 0x2000_0000;

/// Represents access permissions of a memory region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MemoryAccess {
    /// True if the region is readable.
    pub read: bool,
    /// True if the region is writable.
    pub write: bool,
    /// True if the region is executable.
    pub execute: bool,
}

impl MemoryAccess {
    /// Read and execute, the permissions of flash.
    pub const FLASH: Self = Self {
        read: true,
        write: false,
        execute: true,
    };

    /// Read, write and execute, the permissions of RAM.
    pub const RAM: Self = Self {
        read: true,
        write: true,
        execute: true,
    };

    /// The attribute list of a GNU ld `MEMORY` entry.
    pub fn ld_attributes(self) -> &'static str {
        match (self.read, self.write, self.execute) {
            (true, true, true) => "xrw",
            (true, true, false) => "rw",
            (true, false, true) => "rx",
            (true, false, false) => "r",
            (false, true, true) => "xw",
            (false, true, false) => "w",
            (false, false, true) => "x",
            (false, false, false) => "",
        }
    }
}

/// A named region of the linker memory map.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MemoryRegion {
    /// Name used by the linker scripts to place sections.
    pub name: &'static str,
    /// Access permissions.
    pub access: MemoryAccess,
    /// Start address.
    pub origin: u64,
    /// Size in KiB.
    pub length_kb: u32,
}

impl MemoryRegion {
    /// The flash region with the given size.
    pub fn flash(length_kb: u32) -> Self {
        Self {
            name: "FLASH",
            access: MemoryAccess::FLASH,
            origin: FLASH_ORIGIN,
            length_kb,
        }
    }

    /// The RAM region with the given size.
    pub fn ram(length_kb: u32) -> Self {
        Self {
            name: "RAM",
            access: MemoryAccess::RAM,
            origin: RAM_ORIGIN,
            length_kb,
        }
    }

    /// Returns the address range of the memory region.
    pub fn address_range(&self) -> Range<u64> {
        self.origin..self.origin + u64::from(self.length_kb) * 1024
    }
}

impl fmt::Display for MemoryRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}) : ORIGIN = {:#010x}, LENGTH = {}K",
            self.name,
            self.access.ld_attributes(),
            self.origin,
            self.length_kb
        )
    }
}

/// The memory map written to `ldscripts/mem.ld` of a project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryLayout {
    /// The read/execute region holding code and constants.
    pub flash: MemoryRegion,
    /// The read/write region holding data, heap and stack.
    pub ram: MemoryRegion,
}

impl MemoryLayout {
    /// Creates the layout for the given memory sizes in KiB.
    pub fn new(flash_kb: u32, ram_kb: u32) -> Self {
        Self {
            flash: MemoryRegion::flash(flash_kb),
            ram: MemoryRegion::ram(ram_kb),
        }
    }

    /// Creates the layout for a device.
    pub fn for_descriptor(descriptor: &McuDescriptor) -> Self {
        Self::new(descriptor.flash_kb, descriptor.ram_kb)
    }
}

/// Renders the layout as a GNU ld `MEMORY` command.
impl fmt::Display for MemoryLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "MEMORY")?;
        writeln!(f, "{{")?;
        writeln!(f, "  {}", self.flash)?;
        writeln!(f, "  {}", self.ram)?;
        writeln!(f, "}}")
    }
}
