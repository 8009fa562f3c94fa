//! `localtimed config [--config <path>]`

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use localtime_core::config::{resolve_path, Config};

/// Print the effective configuration: file contents merged over defaults.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[arg(long, short = 'c', value_name = "PATH")]
    pub config: Option<PathBuf>,
}

impl ConfigArgs {
    pub fn run(self) -> Result<()> {
        let path = resolve_path(self.config.as_deref());
        let config = Config::load_or_default(&path)
            .with_context(|| format!("failed to load config '{}'", path.display()))?;
        print!("{}", config.to_yaml().context("failed to render config")?);
        Ok(())
    }
}
