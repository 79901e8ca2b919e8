pub mod console;
pub mod logging;

use std::path::{Path, PathBuf};

use anyhow::Context;
use stm32tool::capacity::{CapacityDatabase, HttpCapacitySource};
use stm32tool::config::{Config, StorePaths};
use stm32tool::fetch::HttpFetcher;
use stm32tool::interrupt::CancelFlag;
use stm32tool::normalize::Normalizer;
use stm32tool::project::PROJECT_RECORD_FILE;
use stm32tool::store::TemplateStore;
use stm32tool::toolchain::MakeInvoker;

/// Everything a subcommand needs from its environment.
pub struct App {
    pub config: Config,
    pub cancel: CancelFlag,
    paths: StorePaths,
    store: TemplateStore,
    fetcher: HttpFetcher,
}

impl App {
    pub fn new(config: Config, cancel: CancelFlag) -> anyhow::Result<Self> {
        let paths = config.store();
        let store = TemplateStore::new(paths.templates());
        std::fs::create_dir_all(store.dir())
            .with_context(|| format!("Failed to create the template store at {:?}", store.dir()))?;

        Ok(Self {
            fetcher: HttpFetcher::new(cancel.clone()),
            config,
            cancel,
            paths,
            store,
        })
    }

    pub fn paths(&self) -> &StorePaths {
        &self.paths
    }

    pub fn store(&self) -> &TemplateStore {
        &self.store
    }

    pub fn fetcher(&self) -> &HttpFetcher {
        &self.fetcher
    }

    pub fn capacity_database(&self) -> CapacityDatabase {
        CapacityDatabase::new(self.paths.mcu_database())
    }

    pub fn capacity_source(&self) -> HttpCapacitySource<'_, HttpFetcher> {
        HttpCapacitySource::new(&self.fetcher, &self.config.database_url)
    }

    pub fn normalizer(&self) -> Normalizer<'_> {
        Normalizer::new(&self.store, self.paths.temp(), &self.cancel)
    }

    pub fn make(&self) -> MakeInvoker {
        MakeInvoker::new(self.config.make_program.clone())
    }
}

/// Checks that `project` is a project directory created by stm32tool.
pub fn existing_project(project: &Path) -> anyhow::Result<PathBuf> {
    anyhow::ensure!(
        project.is_dir(),
        "The project {} does not exist.",
        project.display()
    );
    anyhow::ensure!(
        project.join(PROJECT_RECORD_FILE).is_file(),
        "{} is not a stm32tool project, {PROJECT_RECORD_FILE} is missing.",
        project.display()
    );
    Ok(project.to_path_buf())
}
