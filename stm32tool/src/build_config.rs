//! The `config.mk` fragment included by the project Makefile.

use std::fmt;

use stm32tool_target::{device_macro, McuDescriptor};

use crate::config::Config;

/// Name of the generated build configuration.
pub const BUILD_CONFIG_FILE: &str = "config.mk";

/// Floating point flags for cores with an FPU.
pub const FPU_FLAGS: &str = "-mfloat-abi=hard -mfpu=fpv4-sp-d16";

/// Build options that do not depend on the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildSettings {
    pub optimization: String,
    pub c_standard: String,
    pub bootloader_port: String,
}

impl Default for BuildSettings {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for BuildSettings {
    fn from(config: &Config) -> Self {
        Self {
            optimization: config.optimization.clone(),
            c_standard: config.c_standard.clone(),
            bootloader_port: config.bootloader_port.clone(),
        }
    }
}

/// The variables of `config.mk`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildConfig {
    pub cpu: String,
    pub instruction_set: String,
    pub optimize: String,
    pub c_standard: String,
    pub mcu: String,
    pub startup: String,
    pub bootloader_port: String,
}

impl BuildConfig {
    /// The configuration for `descriptor`, using the CMSIS files of `model`.
    pub fn new(descriptor: &McuDescriptor, model: &str, settings: &BuildSettings) -> Self {
        let mut cpu = format!("-mcpu={}", descriptor.core.name());
        if descriptor.fpu {
            cpu.push(' ');
            cpu.push_str(FPU_FLAGS);
        }

        Self {
            cpu,
            instruction_set: format!("-m{}", descriptor.instruction_set),
            optimize: settings.optimization.clone(),
            c_standard: settings.c_standard.clone(),
            mcu: format!("-D{}", device_macro(model)),
            startup: startup_file(model),
            bootloader_port: settings.bootloader_port.clone(),
        }
    }

    /// The variables in file order.
    pub fn entries(&self) -> [(&'static str, &str); 7] {
        [
            ("CPU", self.cpu.as_str()),
            ("ISET", self.instruction_set.as_str()),
            ("OPTIMIZE", self.optimize.as_str()),
            ("CSTD", self.c_standard.as_str()),
            ("MCU", self.mcu.as_str()),
            ("STARTUP", self.startup.as_str()),
            ("BTLPORT", self.bootloader_port.as_str()),
        ]
    }
}

/// Path of the startup file of a model, relative to the project.
pub fn startup_file(model: &str) -> String {
    format!("system/startup_{model}.s")
}

impl fmt::Display for BuildConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "# This file has been automatically generated by stm32tool")?;
        writeln!(f, "# Feel free to change some options if you like")?;
        writeln!(f)?;
        for (key, value) in self.entries() {
            writeln!(f, "{key} = {value}")?;
        }
        Ok(())
    }
}
