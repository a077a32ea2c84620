//! Idempotent editing of shell startup files.
//!
//! Candidate lines and existing lines are compared after [`normalize_line`]
//! (whitespace runs collapsed, trailing comment dropped) by exact string
//! equality. Depending on which of the two lines is already present the
//! editor appends both, inserts the missing one next to its sibling, or
//! leaves the file alone.

use crate::error::{InstallerError, InstallerResult};
use crate::shell::{Dialect, ProfileLines, Shell};
use std::borrow::Cow;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

/// What the editor did to the profile
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileAction {
    /// Neither line was present; both appended at the end
    AppendedBoth,
    /// Root line present; PATH line inserted right after it
    InsertedPath,
    /// PATH line present; root line inserted right before it
    InsertedRoot,
    /// Both lines already present
    Unchanged,
}

#[derive(Debug, Clone)]
pub struct ConfigureOutcome {
    pub profile: PathBuf,
    pub action: ProfileAction,
    /// Shell command the user should run; never executed here
    pub reload_instruction: String,
}

/// Collapse whitespace runs and strip a trailing `#` comment that is not
/// inside quotes.
pub fn normalize_line(line: &str) -> String {
    let mut in_single = false;
    let mut in_double = false;
    let mut prev_is_space = true;
    let mut end = line.len();

    for (idx, ch) in line.char_indices() {
        match ch {
            '\'' if !in_double => in_single = !in_single,
            '"' if !in_single => in_double = !in_double,
            '#' if !in_single && !in_double && prev_is_space => {
                end = idx;
                break;
            }
            _ => {}
        }
        prev_is_space = ch.is_whitespace();
    }

    line[..end].split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Line text without its terminator, decoded only for comparison
fn line_text(segment: &[u8]) -> Cow<'_, str> {
    let body = segment.strip_suffix(b"\n").unwrap_or(segment);
    let body = body.strip_suffix(b"\r").unwrap_or(body);
    String::from_utf8_lossy(body)
}

/// `\r\n` when the file already uses it, `\n` otherwise
fn line_ending(content: &[u8]) -> &'static [u8] {
    match content.iter().position(|&b| b == b'\n') {
        Some(idx) if idx > 0 && content[idx - 1] == b'\r' => b"\r\n",
        _ => b"\n",
    }
}

/// Apply the four-way decision table to `content`.
///
/// Existing bytes are copied through untouched, including line endings and
/// any non-UTF-8 text. Returns the new content (None when nothing changes)
/// and the action taken.
pub fn plan_edit(content: &[u8], lines: &ProfileLines) -> (Option<Vec<u8>>, ProfileAction) {
    let root = normalize_line(&lines.root);
    let path = normalize_line(&lines.path);

    let segments: Vec<&[u8]> = content.split_inclusive(|&b| b == b'\n').collect();
    let root_idx = segments.iter().position(|s| normalize_line(&line_text(s)) == root);
    let path_idx = segments.iter().position(|s| normalize_line(&line_text(s)) == path);

    let eol = line_ending(content);
    let root_line = [lines.root.as_bytes(), eol].concat();
    let path_line = [lines.path.as_bytes(), eol].concat();
    let mut updated = Vec::with_capacity(content.len() + root_line.len() + path_line.len() + 2);

    let action = match (root_idx, path_idx) {
        (Some(_), Some(_)) => return (None, ProfileAction::Unchanged),
        (None, None) => {
            let kept = segments
                .iter()
                .rposition(|s| !line_text(s).trim().is_empty())
                .map_or(0, |last| last + 1);
            for segment in &segments[..kept] {
                updated.extend_from_slice(segment);
            }
            if !updated.is_empty() {
                if !updated.ends_with(b"\n") {
                    updated.extend_from_slice(eol);
                }
                updated.extend_from_slice(eol);
            }
            updated.extend_from_slice(&root_line);
            updated.extend_from_slice(&path_line);
            ProfileAction::AppendedBoth
        }
        (Some(r), None) => {
            for (idx, segment) in segments.iter().enumerate() {
                updated.extend_from_slice(segment);
                if idx == r {
                    if !segment.ends_with(b"\n") {
                        updated.extend_from_slice(eol);
                    }
                    updated.extend_from_slice(&path_line);
                }
            }
            ProfileAction::InsertedPath
        }
        (None, Some(p)) => {
            for (idx, segment) in segments.iter().enumerate() {
                if idx == p {
                    updated.extend_from_slice(&root_line);
                }
                updated.extend_from_slice(segment);
            }
            ProfileAction::InsertedRoot
        }
    };

    (Some(updated), action)
}

/// Edit `profile` so it exports `install_dir` in `dialect` syntax.
///
/// Creates the file (and its parent directory) when missing.
pub fn edit_profile(
    dialect: Dialect,
    install_dir: &Path,
    home: &Path,
    profile: &Path,
) -> InstallerResult<ProfileAction> {
    let lines = dialect.render(install_dir, home);

    let content = match fs::read(profile) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => Vec::new(),
        Err(e) => {
            return Err(InstallerError::filesystem(
                format!("Failed to read profile: {}", profile.display()),
                e,
            ));
        }
    };

    let (updated, action) = plan_edit(&content, &lines);
    debug!(profile = %profile.display(), ?action, "profile edit planned");

    if let Some(updated) = updated {
        if let Some(parent) = profile.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                InstallerError::filesystem(
                    format!("Failed to create directory: {}", parent.display()),
                    e,
                )
            })?;
        }
        fs::write(profile, updated).map_err(|e| {
            InstallerError::filesystem(
                format!("Failed to write profile: {}", profile.display()),
                e,
            )
        })?;
    }

    Ok(action)
}

/// Select the profile for `shell` under `home` and make it export the toolchain.
pub fn configure_profile(
    shell: Shell,
    install_dir: &Path,
    home: &Path,
) -> InstallerResult<ConfigureOutcome> {
    let profile = shell.profile_path(home);
    let action = edit_profile(shell.dialect(), install_dir, home, &profile)?;
    let reload_instruction = shell.reload_instruction(&profile);

    Ok(ConfigureOutcome {
        profile,
        action,
        reload_instruction,
    })
}

/// Lines in `content` that still reference the toolchain, as 1-based line
/// numbers with their text.
pub fn find_leftover_entries(
    content: &str,
    dialect: Dialect,
    install_dir: &Path,
    home: &Path,
) -> Vec<(usize, String)> {
    let lines = dialect.render(install_dir, home);
    let rendered = [normalize_line(&lines.root), normalize_line(&lines.path)];
    let mut markers = vec![install_dir.display().to_string()];
    if let Ok(rel) = install_dir.strip_prefix(home) {
        markers.push(format!("$HOME/{}", rel.display()));
    }

    content
        .lines()
        .enumerate()
        .filter(|(_, line)| {
            let normalized = normalize_line(line);
            !normalized.is_empty()
                && (rendered.contains(&normalized)
                    || markers.iter().any(|m| normalized.contains(m.as_str())))
        })
        .map(|(idx, line)| (idx + 1, line.to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const ROOT: &str = r#"export GOROOT="$HOME/.go""#;
    const PATH_LINE: &str = r#"export PATH="$GOROOT/bin:$PATH""#;

    fn posix_lines() -> ProfileLines {
        ProfileLines {
            root: ROOT.to_string(),
            path: PATH_LINE.to_string(),
        }
    }

    fn plan(content: &str) -> (Option<String>, ProfileAction) {
        let (updated, action) = plan_edit(content.as_bytes(), &posix_lines());
        (updated.map(|bytes| String::from_utf8(bytes).unwrap()), action)
    }

    fn assert_configure_is_idempotent(shell: Shell) {
        let home = TempDir::new().unwrap();
        let install_dir = home.path().join(".go");

        let first = configure_profile(shell, &install_dir, home.path()).unwrap();
        let after_first = fs::read(&first.profile).unwrap();
        let second = configure_profile(shell, &install_dir, home.path()).unwrap();
        let after_second = fs::read(&second.profile).unwrap();

        assert_eq!(first.action, ProfileAction::AppendedBoth);
        assert_eq!(second.action, ProfileAction::Unchanged);
        assert_eq!(after_first, after_second);
    }

    #[test]
    fn normalize_collapses_whitespace_and_comments() {
        assert_eq!(
            normalize_line("  export   GOROOT=\"$HOME/.go\"   # added by installer"),
            ROOT
        );
        assert_eq!(normalize_line("# just a comment"), "");
        assert_eq!(normalize_line("\t\t"), "");
    }

    #[test]
    fn normalize_keeps_hash_inside_quotes_and_words() {
        assert_eq!(normalize_line(r#"echo "a # b""#), r#"echo "a # b""#);
        assert_eq!(normalize_line("echo a#b"), "echo a#b");
    }

    #[test]
    fn plan_appends_both_to_empty_file() {
        let (updated, action) = plan("");
        assert_eq!(action, ProfileAction::AppendedBoth);
        assert_eq!(updated.unwrap(), format!("{ROOT}\n{PATH_LINE}\n"));
    }

    #[test]
    fn plan_appends_with_single_blank_separator() {
        let (updated, _) = plan("alias ll='ls -l'\n\n\n");
        assert_eq!(
            updated.unwrap(),
            format!("alias ll='ls -l'\n\n{ROOT}\n{PATH_LINE}\n")
        );

        let (updated, _) = plan("alias ll='ls -l'");
        assert_eq!(
            updated.unwrap(),
            format!("alias ll='ls -l'\n\n{ROOT}\n{PATH_LINE}\n")
        );
    }

    #[test]
    fn plan_inserts_path_after_root() {
        let content = format!("# header\n{ROOT}\nalias g=git\n");
        let (updated, action) = plan(&content);
        assert_eq!(action, ProfileAction::InsertedPath);
        assert_eq!(
            updated.unwrap(),
            format!("# header\n{ROOT}\n{PATH_LINE}\nalias g=git\n")
        );
    }

    #[test]
    fn plan_inserts_root_before_path() {
        let content = format!("alias g=git\n{PATH_LINE}\n");
        let (updated, action) = plan(&content);
        assert_eq!(action, ProfileAction::InsertedRoot);
        assert_eq!(
            updated.unwrap(),
            format!("alias g=git\n{ROOT}\n{PATH_LINE}\n")
        );
    }

    #[test]
    fn plan_matches_lines_with_extra_spacing_and_comments() {
        let content = "export  GOROOT=\"$HOME/.go\"  # go\nexport PATH=\"$GOROOT/bin:$PATH\"\n";
        let (updated, action) = plan(content);
        assert_eq!(action, ProfileAction::Unchanged);
        assert!(updated.is_none());
    }

    #[test]
    fn edit_profile_is_idempotent() {
        let home = TempDir::new().unwrap();
        let profile = home.path().join(".zshrc");
        fs::write(&profile, "setopt autocd\n").unwrap();
        let install_dir = home.path().join(".go");

        let first = edit_profile(Dialect::Posix, &install_dir, home.path(), &profile).unwrap();
        let after_first = fs::read_to_string(&profile).unwrap();
        let second = edit_profile(Dialect::Posix, &install_dir, home.path(), &profile).unwrap();
        let after_second = fs::read_to_string(&profile).unwrap();

        assert_eq!(first, ProfileAction::AppendedBoth);
        assert_eq!(second, ProfileAction::Unchanged);
        assert_eq!(after_first, after_second);
        assert_eq!(after_first, format!("setopt autocd\n\n{ROOT}\n{PATH_LINE}\n"));
    }

    #[test]
    fn edit_profile_with_only_root_line_does_not_duplicate_it() {
        let home = TempDir::new().unwrap();
        let profile = home.path().join(".bashrc");
        fs::write(&profile, format!("{ROOT}\n")).unwrap();

        let action =
            edit_profile(Dialect::Posix, &home.path().join(".go"), home.path(), &profile).unwrap();

        assert_eq!(action, ProfileAction::InsertedPath);
        let content = fs::read_to_string(&profile).unwrap();
        assert_eq!(content, format!("{ROOT}\n{PATH_LINE}\n"));
        assert_eq!(content.matches("GOROOT=").count(), 1);
    }

    #[test]
    fn configure_creates_fish_config_and_parent() {
        let home = TempDir::new().unwrap();
        let outcome =
            configure_profile(Shell::Fish, &home.path().join(".go"), home.path()).unwrap();

        assert_eq!(outcome.action, ProfileAction::AppendedBoth);
        assert!(outcome.profile.ends_with(".config/fish/config.fish"));
        let content = fs::read_to_string(&outcome.profile).unwrap();
        assert!(content.contains(r#"set -gx GOROOT "$HOME/.go""#));
        assert!(outcome.reload_instruction.starts_with("source "));
    }

    #[test]
    fn configure_fish_is_idempotent() {
        assert_configure_is_idempotent(Shell::Fish);
    }

    #[test]
    fn configure_nushell_is_idempotent() {
        assert_configure_is_idempotent(Shell::Nushell);
    }

    #[test]
    fn plan_keeps_crlf_line_endings() {
        let (updated, action) = plan("alias a=b\r\nalias c=d\r\n");
        assert_eq!(action, ProfileAction::AppendedBoth);
        assert_eq!(
            updated.unwrap(),
            format!("alias a=b\r\nalias c=d\r\n\r\n{ROOT}\r\n{PATH_LINE}\r\n")
        );

        let (updated, action) = plan(&format!("{ROOT}\r\nalias g=git\r\n"));
        assert_eq!(action, ProfileAction::InsertedPath);
        assert_eq!(
            updated.unwrap(),
            format!("{ROOT}\r\n{PATH_LINE}\r\nalias g=git\r\n")
        );
    }

    #[test]
    fn plan_inserts_path_after_unterminated_root_line() {
        let (updated, action) = plan(&format!("alias g=git\n{ROOT}"));
        assert_eq!(action, ProfileAction::InsertedPath);
        assert_eq!(
            updated.unwrap(),
            format!("alias g=git\n{ROOT}\n{PATH_LINE}\n")
        );
    }

    #[test]
    fn edit_profile_preserves_non_utf8_bytes() {
        let home = TempDir::new().unwrap();
        let profile = home.path().join(".bashrc");
        let original = b"# caf\xe9 latin-1 comment\nalias g=git\n".to_vec();
        fs::write(&profile, &original).unwrap();

        let action =
            edit_profile(Dialect::Posix, &home.path().join(".go"), home.path(), &profile).unwrap();

        assert_eq!(action, ProfileAction::AppendedBoth);
        let mut expected = original;
        expected.extend_from_slice(format!("\n{ROOT}\n{PATH_LINE}\n").as_bytes());
        assert_eq!(fs::read(&profile).unwrap(), expected);
    }

    #[test]
    fn configure_other_shell_uses_dot_profile() {
        let home = TempDir::new().unwrap();
        let outcome =
            configure_profile(Shell::Other, &home.path().join(".go"), home.path()).unwrap();
        assert_eq!(outcome.profile, home.path().join(".profile"));
        assert!(outcome.reload_instruction.starts_with(". "));
    }

    #[test]
    fn leftover_entries_found_after_configure() {
        let home = PathBuf::from("/home/user");
        let install_dir = home.join(".go");
        let content = format!("alias g=git\n\n{ROOT}\n{PATH_LINE}\n");

        let leftovers = find_leftover_entries(&content, Dialect::Posix, &install_dir, &home);
        assert_eq!(leftovers.len(), 2);
        assert_eq!(leftovers[0].0, 3);
        assert_eq!(leftovers[1].0, 4);

        assert!(
            find_leftover_entries("alias g=git\n", Dialect::Posix, &install_dir, &home).is_empty()
        );
    }
}
