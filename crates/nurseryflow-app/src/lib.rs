use anyhow::{Context, Result, anyhow, bail};
use nurseryflow_core::config::{NurseryConfig, load_config, resolve_config_path};
use nurseryflow_core::store::NurseryStore;

pub mod pick;
pub mod scout;

pub struct App<'a> {
    pub store: &'a dyn NurseryStore,
}

impl<'a> App<'a> {
    pub fn new(store: &'a dyn NurseryStore) -> Self {
        Self { store }
    }
}

/// Loads the user config, refusing with a setup hint when it is missing or invalid.
pub fn load_ready_config() -> Result<NurseryConfig> {
    let config_path = resolve_config_path().context("failed to resolve config path")?;

    if !config_path.exists() {
        bail!(
            "missing config at {}\nRun `nurseryflow init` to create a starter config.",
            config_path.display()
        );
    }

    load_config(&config_path).map_err(|error| {
        anyhow!(
            "invalid config at {}: {error}\nFix the config and retry, or run `nurseryflow doctor`.",
            config_path.display()
        )
    })
}

pub(crate) fn timestamp() -> Result<String> {
    nurseryflow_core::clock::now_utc_rfc3339().context("failed to format timestamp")
}
