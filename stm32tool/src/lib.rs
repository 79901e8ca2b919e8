//! # Project scaffolding for STM32 microcontrollers
//!
//! stm32tool turns STM32Cube packages published by ST into compact project
//! templates and creates ready-to-build firmware projects from them.
//!
//! The pieces, roughly in the order a project is created:
//!
//! - [`resolve`] parses a device name and looks up its RAM size in the
//!   [`capacity`] database, refreshing it from the vendor website on a miss.
//! - [`locate`] and [`fetch`] find and download the vendor package of a series.
//! - [`vendor`] and [`normalize`] extract the package and rebuild it into a
//!   template kept in the [`store`].
//! - [`instantiate`] creates a project from a stored template, generating
//!   the memory layout, the [`build_config`] and the [`project`] record.
//! - [`toolchain`] builds and flashes the project with `make`.
//!
//! ## Creating a project
//!
//! ```no_run
//! # use stm32tool::Error;
//! use stm32tool::build_config::BuildSettings;
//! use stm32tool::instantiate::Instantiator;
//! use stm32tool::interrupt::CancelFlag;
//! use stm32tool::store::TemplateStore;
//! use stm32tool_target::McuDescriptor;
//! use std::path::Path;
//!
//! let store = TemplateStore::new("/home/me/.stm32tool/templates");
//! let cancel = CancelFlag::new();
//! let instantiator = Instantiator::new(
//!     &store,
//!     "/home/me/.stm32tool/templates/common",
//!     BuildSettings::default(),
//!     &cancel,
//! );
//!
//! let descriptor = McuDescriptor::parse("STM32F103C8")?.with_ram(20);
//! let project = instantiator.instantiate(&descriptor, Path::new("bluepill"))?;
//! println!("Configured for {}", project.model);
//! # Ok::<(), Error>(())
//! ```

pub mod build_config;
pub mod capacity;
pub mod config;
pub mod error;
pub mod fetch;
pub mod fs_tree;
pub mod instantiate;
pub mod interrupt;
pub mod locate;
pub mod normalize;
pub mod project;
pub mod release;
pub mod repository;
pub mod resolve;
pub mod store;
pub mod toolchain;
pub mod vendor;

#[cfg(test)]
mod test_support;

pub use error::{Error, Result};
