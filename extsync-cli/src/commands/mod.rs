pub mod plan;
pub mod run;
pub mod status;
pub mod sync;

use std::path::Path;

use anyhow::{Context, Result};

use extsync_core::Config;
use extsync_sync::SnapshotStore;

/// Resolved config plus the snapshot store it describes.
pub struct Workspace {
    pub config: Config,
    pub store: SnapshotStore,
}

impl Workspace {
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let config = Config::load(config_path).context("failed to load config")?;
        let store = SnapshotStore::from_config(&config).context("invalid config")?;
        Ok(Self { config, store })
    }
}
