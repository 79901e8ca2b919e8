//! User configuration and the on-disk store layout.

use std::path::{Path, PathBuf};

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use stm32tool_target::Family;

/// Prefix of the environment variables overriding configuration keys.
pub const ENV_PREFIX: &str = "STM32TOOL_";

/// The keys that can be set through `STM32TOOL_*` variables.
const ENV_KEYS: &[&str] = &[
    "store_dir",
    "website_base_url",
    "database_url",
    "package_page_url",
    "make_program",
    "optimization",
    "c_standard",
    "bootloader_port",
];

/// Name of the per-project configuration file.
pub const LOCAL_CONFIG_FILE: &str = ".stm32tool.toml";

/// The main struct holding all configuration options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Root of the template store and MCU database.
    pub store_dir: PathBuf,
    pub website_base_url: String,
    /// The vendor product table used to refresh the MCU database.
    pub database_url: String,
    /// Page offering the STM32Cube package of a series.
    ///
    /// `{family}` is replaced by the lowercase family letter, `{series}` by the series number.
    pub package_page_url: String,
    pub make_program: String,
    pub optimization: String,
    pub c_standard: String,
    /// Serial port used by `make program-btl`.
    pub bootloader_port: String,
}

fn default_store_dir() -> PathBuf {
    directories::UserDirs::new()
        .map(|user| user.home_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".stm32tool")
}

impl Default for Config {
    fn default() -> Self {
        let website_base_url = "http://www.st.com".to_string();
        Self {
            store_dir: default_store_dir(),
            database_url: format!(
                "{website_base_url}/content/st_com/en/products/microcontrollers\
                 /stm32-32-bit-arm-cortex-mcus.product-grid.html/SC1169.json"
            ),
            package_page_url: format!(
                "{website_base_url}/content/st_com/en/products/embedded-software\
                 /mcus-embedded-software/stm32-embedded-software\
                 /stm32cube-embedded-software/stm32cube{{family}}{{series}}.html"
            ),
            website_base_url,
            make_program: "make".to_string(),
            optimization: "-O2".to_string(),
            c_standard: "-std=c99".to_string(),
            bootloader_port: "/dev/ttyUSB0".to_string(),
        }
    }
}

impl Config {
    /// The figment the configuration is extracted from.
    ///
    /// Later sources override earlier ones: defaults, the store's `config.toml`,
    /// `./.stm32tool.toml`, then `STM32TOOL_*` environment variables.
    pub fn figment(working_dir: &Path) -> Figment {
        let defaults = Config::default();
        let store_config = defaults.store_dir.join("config.toml");

        Self::layered(defaults, &[store_config, working_dir.join(LOCAL_CONFIG_FILE)])
            .merge(Self::environment())
    }

    /// `STM32TOOL_*` variables naming a configuration key. Others are ignored.
    fn environment() -> Env {
        Env::prefixed(ENV_PREFIX).only(ENV_KEYS)
    }

    /// Defaults overridden by each of `files` in order. Missing files are ignored.
    fn layered(defaults: Config, files: &[PathBuf]) -> Figment {
        files
            .iter()
            .fold(Figment::from(Serialized::defaults(defaults)), |figment, file| {
                figment.merge(Toml::file(file))
            })
    }

    /// Loads the configuration for a tool started in `working_dir`.
    pub fn load(working_dir: &Path) -> Result<Self, figment::Error> {
        Self::figment(working_dir).extract()
    }

    pub fn store(&self) -> StorePaths {
        StorePaths::new(&self.store_dir)
    }

    /// The package page for a series.
    pub fn package_page(&self, family: Family, series: u8) -> String {
        self.package_page_url
            .replace("{family}", &family.letter().to_ascii_lowercase().to_string())
            .replace("{series}", &series.to_string())
    }
}

/// Paths inside the store directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorePaths {
    root: PathBuf,
}

impl StorePaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Template archives and their metadata records.
    pub fn templates(&self) -> PathBuf {
        self.root.join("templates")
    }

    /// Files copied into every new project.
    pub fn common(&self) -> PathBuf {
        self.templates().join("common")
    }

    /// Scratch space for extraction and staging.
    pub fn temp(&self) -> PathBuf {
        self.root.join("temp")
    }

    pub fn mcu_database(&self) -> PathBuf {
        self.root.join("mcu_db.json")
    }
}
