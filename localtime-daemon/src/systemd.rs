use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::bus::SET_TIMEZONE_ACTION;
use crate::error::{io_err, DaemonError};
use crate::paths::{
    geoclue_conf_path, installed_files, polkit_rules_path, sysusers_path, unit_path, DAEMON_NAME,
    DAEMON_USER,
};

/// Generate the systemd service unit.
pub fn generate_unit(binary_path: &Path, config_path: &Path) -> String {
    format!(
        r#"[Unit]
Description=Keep the system timezone in sync with the current location
Requires=dbus.service
After=dbus.service

[Service]
Type=simple
User={user}
ExecStart={binary} run --config {config}
Restart=on-failure
RestartSec=30
NoNewPrivileges=yes
ProtectSystem=strict
ProtectHome=yes
PrivateTmp=yes

[Install]
WantedBy=multi-user.target
"#,
        user = DAEMON_USER,
        binary = exec_arg(binary_path),
        config = exec_arg(config_path),
    )
}

/// Render a path as one `ExecStart=` word.
///
/// `%` and `$` are doubled so systemd does not expand them; whitespace,
/// quotes, backslashes and `;` force double quoting.
fn exec_arg(path: &Path) -> String {
    let escaped = path
        .display()
        .to_string()
        .replace('%', "%%")
        .replace('$', "$$");
    let needs_quotes = escaped
        .chars()
        .any(|c| c.is_whitespace() || matches!(c, '"' | '\\' | '\'' | ';'));
    if !needs_quotes {
        return escaped;
    }
    let inner = escaped.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{inner}\"")
}

/// Let the daemon user change the timezone without an interactive prompt.
pub fn generate_polkit_rules() -> String {
    format!(
        r#"polkit.addRule(function(action, subject) {{
    if (action.id == "{action}" &&
        subject.user == "{user}") {{
        return polkit.Result.YES;
    }}
}});
"#,
        action = SET_TIMEZONE_ACTION,
        user = DAEMON_USER,
    )
}

pub fn generate_sysusers() -> String {
    format!("u {DAEMON_USER} - \"Automatic timezone daemon\" -\n")
}

/// Authorise the daemon's desktop id as a system application in GeoClue.
pub fn generate_geoclue_conf(desktop_id: &str) -> String {
    format!("[{desktop_id}]\nallowed=true\nsystem=true\nusers=\n")
}

/// Write unit, polkit rule, sysusers entry and GeoClue snippet below `root`.
///
/// When `root` is `/`, also creates the user and reloads systemd.
pub fn install(
    root: &Path,
    binary_path: &Path,
    config_path: &Path,
    desktop_id: &str,
) -> Result<Vec<PathBuf>, DaemonError> {
    let files = [
        (unit_path(root), generate_unit(binary_path, config_path)),
        (polkit_rules_path(root), generate_polkit_rules()),
        (sysusers_path(root), generate_sysusers()),
        (geoclue_conf_path(root), generate_geoclue_conf(desktop_id)),
    ];

    let mut written = Vec::with_capacity(files.len());
    for (path, contents) in files {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
            }
        }
        fs::write(&path, contents).map_err(|e| io_err(&path, e))?;
        tracing::debug!(path = %path.display(), "installed file");
        written.push(path);
    }

    if is_live_root(root) {
        run_command("systemd-sysusers", &[], false)?;
        run_command("systemctl", &["daemon-reload"], false)?;
    }

    Ok(written)
}

/// Remove every installed file below `root`; missing files are skipped.
pub fn uninstall(root: &Path) -> Result<Vec<PathBuf>, DaemonError> {
    if is_live_root(root) {
        let service = format!("{DAEMON_NAME}.service");
        let _ = run_command("systemctl", &["disable", "--now", &service], true);
    }

    let mut removed = Vec::new();
    for path in installed_files(root) {
        match fs::remove_file(&path) {
            Ok(()) => removed.push(path),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => return Err(io_err(&path, err)),
        }
    }

    if is_live_root(root) {
        let _ = run_command("systemctl", &["daemon-reload"], true);
    }
    Ok(removed)
}

fn is_live_root(root: &Path) -> bool {
    root == Path::new("/")
}

/// Run a systemd tool. With `ignore_failure`, a non-zero exit is only logged.
fn run_command(program: &str, args: &[&str], ignore_failure: bool) -> Result<(), DaemonError> {
    let command_line = std::iter::once(program)
        .chain(args.iter().copied())
        .collect::<Vec<_>>()
        .join(" ");
    tracing::debug!(command = %command_line, "running");

    let output = Command::new(program)
        .args(args)
        .output()
        .map_err(|e| io_err(program, e))?;

    if output.status.success() {
        return Ok(());
    }

    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    if ignore_failure {
        tracing::warn!(
            command = %command_line,
            status = %output.status,
            stderr = %stderr,
            "ignoring failed command",
        );
        return Ok(());
    }
    let detail = if stderr.is_empty() {
        String::from_utf8_lossy(&output.stdout).trim().to_string()
    } else {
        stderr
    };
    Err(DaemonError::Systemd(format!(
        "`{command_line}` failed ({}): {detail}",
        output.status
    )))
}
