use crate::error::{InstallerError, InstallerResult};
use anyhow::{Context, Result};
use console::style;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tracing::debug;

/// Exit status used when the run is interrupted
pub const INTERRUPT_EXIT_CODE: i32 = 130;

/// Shared handle to the current scratch directory, if any. The interrupt
/// handler cleans up through it since destructors do not run on exit.
#[derive(Debug, Clone, Default)]
pub struct ScratchRegistry {
    current: Arc<Mutex<Option<PathBuf>>>,
}

impl ScratchRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an owner-only scratch directory under `base`
    pub fn create(&self, base: &Path) -> InstallerResult<ScratchDir> {
        fs::create_dir_all(base).map_err(|e| {
            InstallerError::filesystem(
                format!("Failed to create temporary base directory: {}", base.display()),
                e,
            )
        })?;

        let dir = tempfile::Builder::new()
            .prefix("go-installer-")
            .tempdir_in(base)
            .map_err(|e| {
                InstallerError::filesystem(
                    format!("Failed to create scratch directory in {}", base.display()),
                    e,
                )
            })?;

        restrict_to_owner(dir.path())?;

        self.set(Some(dir.path().to_path_buf()));
        debug!(path = %dir.path().display(), "scratch directory created");

        Ok(ScratchDir {
            dir,
            registry: self.clone(),
        })
    }

    #[cfg(test)]
    fn current(&self) -> Option<PathBuf> {
        self.current.lock().ok().and_then(|guard| guard.clone())
    }

    /// Remove the registered directory; used from the interrupt handler
    pub fn cleanup(&self) {
        if let Ok(mut guard) = self.current.lock()
            && let Some(path) = guard.take()
        {
            let _ = fs::remove_dir_all(&path);
        }
    }

    fn set(&self, value: Option<PathBuf>) {
        if let Ok(mut guard) = self.current.lock() {
            *guard = value;
        }
    }
}

/// chmod 0700; the mode tempfile picks is still subject to the umask
#[cfg(unix)]
fn restrict_to_owner(dir: &Path) -> InstallerResult<()> {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(dir, fs::Permissions::from_mode(0o700)).map_err(|e| {
        InstallerError::filesystem(
            format!("Failed to restrict permissions on {}", dir.display()),
            e,
        )
    })
}

#[cfg(not(unix))]
fn restrict_to_owner(_dir: &Path) -> InstallerResult<()> {
    Ok(())
}

/// An owned scratch directory, removed on drop
#[derive(Debug)]
pub struct ScratchDir {
    dir: TempDir,
    registry: ScratchRegistry,
}

impl ScratchDir {
    pub fn path(&self) -> &Path {
        self.dir.path()
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        self.registry.set(None);
        debug!(path = %self.dir.path().display(), "removing scratch directory");
    }
}

/// Print a notice, remove any scratch directory and exit with status 130 on
/// Ctrl-C.
pub fn exit_on_interrupt(registry: ScratchRegistry) -> Result<()> {
    ctrlc::set_handler(move || {
        eprintln!();
        eprintln!(
            "{}: interrupted, cleaning up",
            style("warning").yellow().bold()
        );
        registry.cleanup();
        std::process::exit(INTERRUPT_EXIT_CODE);
    })
    .context("Failed to install interrupt handler")
}
