//! Turns a device name into a complete [`McuDescriptor`].

use stm32tool_target::{CanonicalName, McuDescriptor};

use crate::capacity::{CapacityDatabase, CapacitySource};
use crate::error::{Error, Result};

/// Where the RAM size of a descriptor came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RamSource {
    /// Given by the user, not verified against any database.
    Explicit,
    /// Found in the local MCU database.
    Database,
    /// Found after refreshing the MCU database.
    RefreshedDatabase,
}

/// A resolved device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub descriptor: McuDescriptor,
    pub ram_source: RamSource,
}

pub struct Resolver<'a> {
    database: &'a CapacityDatabase,
    source: &'a dyn CapacitySource,
}

impl<'a> Resolver<'a> {
    pub fn new(database: &'a CapacityDatabase, source: &'a dyn CapacitySource) -> Self {
        Self { database, source }
    }

    /// Parses `raw` and fills in the RAM size.
    ///
    /// `explicit_ram` is used verbatim when given.
    #[tracing::instrument(skip(self), name = "Resolve MCU")]
    pub fn resolve(&self, raw: &str, explicit_ram: Option<u32>) -> Result<Resolution> {
        let descriptor = McuDescriptor::parse(raw)?;
        let (ram_kb, ram_source) = self.resolve_ram(&descriptor.name, explicit_ram)?;

        Ok(Resolution {
            descriptor: descriptor.with_ram(ram_kb),
            ram_source,
        })
    }

    /// Looks up the RAM size of a device.
    ///
    /// On a miss the database is refreshed once and the lookup retried.
    pub fn resolve_ram(
        &self,
        name: &CanonicalName,
        explicit_ram: Option<u32>,
    ) -> Result<(u32, RamSource)> {
        if let Some(ram_kb) = explicit_ram {
            tracing::warn!(
                "The RAM size of {name} was specified manually ({ram_kb} kB) and is not verified"
            );
            return Ok((ram_kb, RamSource::Explicit));
        }

        match self.database.load() {
            Some(snapshot) => {
                if let Some(capacity) = snapshot.get(name.as_str()) {
                    return Ok((capacity.ram, RamSource::Database));
                }
                tracing::info!("{name} is not in the MCU database, updating it");
            }
            None => tracing::info!("No local MCU database found, downloading it"),
        }

        let report = self
            .database
            .refresh(self.source)
            .map_err(Error::DatabaseUnavailable)?;

        match report.snapshot.get(name.as_str()) {
            Some(capacity) => Ok((capacity.ram, RamSource::RefreshedDatabase)),
            None => Err(Error::McuNotFound {
                name: name.to_string(),
            }),
        }
    }
}
