pub mod profile;

use std::path::{Path, PathBuf};

pub use profile::{ConfigureOutcome, ProfileAction, configure_profile, edit_profile};

/// Shell families with distinct profile handling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    Nushell,
    Other,
}

impl Shell {
    /// Detects the shell from the value of `SHELL`.
    #[must_use]
    pub fn detect(shell_var: Option<&str>) -> Self {
        shell_var.map_or(Self::Other, Self::from_path)
    }

    /// Parses a shell from a path string (e.g. "/bin/bash").
    #[must_use]
    pub fn from_path(path: &str) -> Self {
        let name = Path::new(path)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();
        match name {
            "bash" => Self::Bash,
            "zsh" => Self::Zsh,
            "fish" => Self::Fish,
            "nu" | "nushell" => Self::Nushell,
            _ => Self::Other,
        }
    }

    #[must_use]
    pub fn dialect(self) -> Dialect {
        match self {
            Self::Bash | Self::Zsh => Dialect::Posix,
            Self::Fish => Dialect::Fish,
            Self::Nushell => Dialect::Nushell,
            Self::Other => Dialect::Generic,
        }
    }

    /// Startup file this shell reads.
    ///
    /// For bash, `.bash_profile` wins when it exists because login shells
    /// skip `.bashrc` in its presence.
    #[must_use]
    pub fn profile_path(self, home: &Path) -> PathBuf {
        match self {
            Self::Bash => {
                let bash_profile = home.join(".bash_profile");
                if bash_profile.exists() {
                    bash_profile
                } else {
                    home.join(".bashrc")
                }
            }
            Self::Zsh => home.join(".zshrc"),
            Self::Fish => home.join(".config").join("fish").join("config.fish"),
            Self::Nushell => home.join(".config").join("nushell").join("env.nu"),
            Self::Other => home.join(".profile"),
        }
    }

    /// Command the user runs to pick up the new profile.
    #[must_use]
    pub fn reload_instruction(self, profile: &Path) -> String {
        match self.dialect() {
            Dialect::Generic => format!(". {}", profile.display()),
            Dialect::Posix | Dialect::Fish | Dialect::Nushell => {
                format!("source {}", profile.display())
            }
        }
    }
}

/// Export syntax families
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// bash/zsh `export`
    Posix,
    /// fish `set -gx`
    Fish,
    /// nushell `let-env`
    Nushell,
    /// plain sh `.profile`, same `export` syntax as POSIX
    Generic,
}

/// The root export and PATH export for one dialect
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileLines {
    pub root: String,
    pub path: String,
}

impl Dialect {
    /// Render both lines for `install_dir`, abbreviating `home` to the
    /// dialect's home token when the install directory lives under it.
    #[must_use]
    pub fn render(self, install_dir: &Path, home: &Path) -> ProfileLines {
        let relative = install_dir
            .strip_prefix(home)
            .ok()
            .filter(|rel| !rel.as_os_str().is_empty())
            .map(|rel| rel.display().to_string());
        let absolute = install_dir.display().to_string();

        match self {
            Self::Posix | Self::Generic => {
                let value = match &relative {
                    Some(rel) => format!("$HOME/{}", escape_double_quoted(rel)),
                    None => escape_double_quoted(&absolute),
                };
                ProfileLines {
                    root: format!("export GOROOT=\"{value}\""),
                    path: "export PATH=\"$GOROOT/bin:$PATH\"".to_string(),
                }
            }
            Self::Fish => {
                let value = match &relative {
                    Some(rel) => format!("$HOME/{}", escape_double_quoted(rel)),
                    None => escape_double_quoted(&absolute),
                };
                ProfileLines {
                    root: format!("set -gx GOROOT \"{value}\""),
                    path: "set -gx PATH \"$GOROOT/bin\" $PATH".to_string(),
                }
            }
            Self::Nushell => {
                let value = match &relative {
                    Some(rel) => format!("($env.HOME | path join \"{}\")", escape_nu(rel)),
                    None => format!("\"{}\"", escape_nu(&absolute)),
                };
                ProfileLines {
                    root: format!("let-env GOROOT = {value}"),
                    path: "let-env PATH = ($env.PATH | prepend ($env.GOROOT | path join \"bin\"))"
                        .to_string(),
                }
            }
        }
    }
}

/// Escape for a double-quoted sh/fish string: `\`, `$`, backtick and `"`.
fn escape_double_quoted(raw: &str) -> String {
    raw.replace('\\', "\\\\")
        .replace('$', "\\$")
        .replace('`', "\\`")
        .replace('"', "\\\"")
}

fn escape_nu(raw: &str) -> String {
    raw.replace('\\', "\\\\").replace('"', "\\\"")
}
