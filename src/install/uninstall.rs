use crate::config::Environment;
use crate::error::InstallerError;
use crate::models::UninstallOutcome;
use crate::output::Output;
use crate::shell::Shell;
use crate::shell::profile::find_leftover_entries;
use anyhow::{Context, Result};
use std::fs;
use std::io::{self, BufRead, IsTerminal, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Whether a confirmation prompt can be answered
pub fn stdin_is_interactive() -> bool {
    io::stdin().is_terminal()
}

/// Ask a yes/no question on stdout and read the answer from stdin.
/// Anything but `y`/`yes` declines.
pub fn prompt_confirmation(question: &str) -> Result<bool> {
    print!("{question} [y/N] ");
    io::stdout().flush().context("Failed to flush stdout")?;

    let mut input = String::new();
    io::stdin()
        .lock()
        .read_line(&mut input)
        .context("Failed to read confirmation")?;

    Ok(matches!(
        input.trim().to_lowercase().as_str(),
        "y" | "yes"
    ))
}

/// Remove the install directory and report leftover profile entries.
///
/// `confirm` is only consulted when `interactive` is set and `assume_yes`
/// is not.
pub fn run_uninstall(
    env: &Environment,
    assume_yes: bool,
    interactive: bool,
    output: &Output,
    confirm: &mut dyn FnMut(&str) -> Result<bool>,
) -> Result<UninstallOutcome> {
    let layout = env.layout();
    let install_dir = &layout.install_dir;

    let removed = if install_dir.exists() {
        if interactive && !assume_yes {
            let question = format!("Remove {}?", install_dir.display());
            if !confirm(&question)? {
                output.info("Uninstall cancelled, nothing was changed");
                return Ok(UninstallOutcome::Aborted);
            }
        }

        remove_install_dir(install_dir)?;
        output.status("Removed", &install_dir.display().to_string());
        true
    } else {
        output.warn(&format!(
            "{} does not exist, nothing to remove",
            install_dir.display()
        ));
        false
    };

    let leftover_profile = report_leftovers(env, install_dir, output);

    Ok(if removed {
        UninstallOutcome::Removed { leftover_profile }
    } else {
        UninstallOutcome::NotInstalled { leftover_profile }
    })
}

fn remove_install_dir(install_dir: &Path) -> Result<(), InstallerError> {
    debug!(dir = %install_dir.display(), "removing install directory");
    let result = if install_dir.is_dir() {
        fs::remove_dir_all(install_dir)
    } else {
        fs::remove_file(install_dir)
    };
    result.map_err(|e| {
        InstallerError::filesystem(format!("Failed to remove {}", install_dir.display()), e)
    })
}

/// Print an advisory when the profile still exports the toolchain.
/// Returns the profile path in that case.
fn report_leftovers(env: &Environment, install_dir: &Path, output: &Output) -> Option<PathBuf> {
    let shell = Shell::detect(env.shell.as_deref());
    let profile = shell.profile_path(&env.home);

    // An unreadable profile only loses the advisory
    let bytes = fs::read(&profile).ok()?;
    let content = String::from_utf8_lossy(&bytes);
    let leftovers = find_leftover_entries(&content, shell.dialect(), install_dir, &env.home);
    if leftovers.is_empty() {
        return None;
    }

    output.warn(&format!(
        "{} still references the removed toolchain; remove these lines manually:",
        profile.display()
    ));
    for (line_no, line) in &leftovers {
        eprintln!("  {line_no:>4} | {line}");
    }

    Some(profile)
}
