use std::path::{Path, PathBuf};

pub const DAEMON_NAME: &str = "localtimed";
pub const DAEMON_USER: &str = "localtimed";
pub const DEFAULT_BINARY: &str = "/usr/bin/localtimed";

pub const UNIT_FILE: &str = "localtimed.service";
pub const POLKIT_RULES_FILE: &str = "10-localtimed.rules";
pub const SYSUSERS_FILE: &str = "localtimed.conf";
pub const GEOCLUE_CONF_FILE: &str = "90-localtimed.conf";

/// Join an absolute system path below `root` (`/` for the live system).
fn under(root: &Path, absolute: &str) -> PathBuf {
    root.join(absolute.trim_start_matches('/'))
}

pub fn unit_path(root: &Path) -> PathBuf {
    under(root, "/usr/lib/systemd/system").join(UNIT_FILE)
}

pub fn polkit_rules_path(root: &Path) -> PathBuf {
    under(root, "/usr/share/polkit-1/rules.d").join(POLKIT_RULES_FILE)
}

pub fn sysusers_path(root: &Path) -> PathBuf {
    under(root, "/usr/lib/sysusers.d").join(SYSUSERS_FILE)
}

pub fn geoclue_conf_path(root: &Path) -> PathBuf {
    under(root, "/etc/geoclue/conf.d").join(GEOCLUE_CONF_FILE)
}

pub fn installed_files(root: &Path) -> [PathBuf; 4] {
    [
        unit_path(root),
        polkit_rules_path(root),
        sysusers_path(root),
        geoclue_conf_path(root),
    ]
}
