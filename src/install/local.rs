use crate::config::{BINARY_NAME, Environment, InstallLayout};
use crate::models::LocalInstallInfo;
use crate::version::parse_go_version_output;
use std::fs;
use std::path::Path;
use std::process::Command;
use tracing::debug;

/// Look up the toolchain binary on PATH and ask it for its version.
///
/// Returns None when no binary is found. A binary whose version cannot be
/// read is still reported, with `version: None`.
pub fn detect_existing(env: &Environment, layout: &InstallLayout) -> Option<LocalInstallInfo> {
    let search_path = env.path.as_ref()?;
    let binary = which::which_in(BINARY_NAME, Some(search_path), &env.home).ok()?;
    debug!(binary = %binary.display(), "found existing toolchain binary");

    let version = Command::new(&binary)
        .arg("version")
        .output()
        .ok()
        .filter(|out| out.status.success())
        .and_then(|out| parse_go_version_output(&String::from_utf8_lossy(&out.stdout)));

    let canonical = same_file(&binary, &layout.binary);

    Some(LocalInstallInfo {
        binary,
        version,
        canonical,
    })
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}
