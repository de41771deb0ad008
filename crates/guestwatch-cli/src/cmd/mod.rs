pub mod config;
pub mod init;
pub mod ping;
pub mod run;
pub mod state;

use anyhow::Context;
use guestwatch_core::config::{Config, Recipients};
use std::path::Path;

/// Load the config file and apply recipient overrides from the environment.
pub(crate) fn load_config(root: &Path) -> anyhow::Result<(Config, Recipients)> {
    let config = Config::load(root).context("failed to load config")?;
    let recipients = config.recipients.resolve(|key| std::env::var(key).ok());
    Ok((config, recipients))
}
