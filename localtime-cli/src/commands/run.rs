//! `localtimed run [--config <path>]`

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use localtime_core::config::{resolve_path, Config};

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Config file; defaults to $LOCALTIMED_CONFIG, then /etc/localtimed/config.yaml.
    #[arg(long, short = 'c', value_name = "PATH")]
    pub config: Option<PathBuf>,
}

impl RunArgs {
    pub fn run(self) -> Result<()> {
        let path = resolve_path(self.config.as_deref());
        let config = Config::load_or_default(&path)
            .with_context(|| format!("failed to load config '{}'", path.display()))?;
        localtime_daemon::start_blocking(config).context("daemon exited with error")?;
        Ok(())
    }
}
