//! `localtimed install` / `localtimed uninstall`

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use localtime_core::config::{resolve_path, Config};
use localtime_daemon::paths::DEFAULT_BINARY;
use localtime_daemon::{install_systemd, uninstall_systemd};

#[derive(Args, Debug)]
pub struct InstallArgs {
    /// Filesystem root to install below; anything other than `/` skips
    /// reloading systemd.
    #[arg(long, default_value = "/")]
    pub root: PathBuf,

    /// Daemon binary path written into the unit's ExecStart.
    #[arg(long, default_value = DEFAULT_BINARY)]
    pub binary: PathBuf,

    /// Config path passed to the daemon; its desktop id names the GeoClue section.
    #[arg(long, short = 'c', value_name = "PATH")]
    pub config: Option<PathBuf>,
}

impl InstallArgs {
    pub fn run(self) -> Result<()> {
        let config_path = resolve_path(self.config.as_deref());
        let config = Config::load_or_default(&config_path)
            .with_context(|| format!("failed to load config '{}'", config_path.display()))?;

        let written = install_systemd(&self.root, &self.binary, &config_path, &config.desktop_id)
            .context("failed to install systemd integration")?;
        for path in written {
            println!("installed {}", path.display());
        }
        Ok(())
    }
}

#[derive(Args, Debug)]
pub struct UninstallArgs {
    #[arg(long, default_value = "/")]
    pub root: PathBuf,
}

impl UninstallArgs {
    pub fn run(self) -> Result<()> {
        let removed =
            uninstall_systemd(&self.root).context("failed to uninstall systemd integration")?;
        if removed.is_empty() {
            println!("nothing to remove");
        }
        for path in removed {
            println!("removed {}", path.display());
        }
        Ok(())
    }
}
