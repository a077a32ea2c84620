use crate::error::InstallerError;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

/// Default download origin
pub const DEFAULT_ORIGIN: &str = "https://go.dev";

/// Default User-Agent sent with every request
pub const DEFAULT_USER_AGENT: &str = concat!("go-installer/", env!("GO_INSTALLER_VERSION"));

/// Install directory name under $HOME
pub const INSTALL_DIR_NAME: &str = ".go";

/// Name of the toolchain binary
pub const BINARY_NAME: &str = "go";

/// Snapshot of the process environment the installer depends on.
///
/// Captured once in `main` and threaded through; nothing below reads
/// `std::env` directly.
#[derive(Debug, Clone)]
pub struct Environment {
    pub home: PathBuf,
    pub shell: Option<String>,
    pub path: Option<OsString>,
    pub no_color: bool,
    pub tmpdir: PathBuf,
}

impl Environment {
    /// Capture HOME, SHELL, PATH, NO_COLOR and TMPDIR
    pub fn from_process() -> Result<Self, InstallerError> {
        let home = std::env::var_os("HOME")
            .filter(|h| !h.is_empty())
            .map(PathBuf::from)
            .or_else(dirs::home_dir)
            .ok_or(InstallerError::MissingHome)?;

        let tmpdir = std::env::var_os("TMPDIR")
            .filter(|t| !t.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("/tmp"));

        Ok(Self {
            home,
            shell: std::env::var("SHELL").ok().filter(|s| !s.is_empty()),
            path: std::env::var_os("PATH"),
            no_color: no_color_requested(std::env::var("NO_COLOR").ok().as_deref()),
            tmpdir,
        })
    }

    /// Environment rooted at an arbitrary home directory
    pub fn with_home(home: impl Into<PathBuf>) -> Self {
        Self {
            home: home.into(),
            shell: None,
            path: None,
            no_color: true,
            tmpdir: std::env::temp_dir(),
        }
    }

    pub fn layout(&self) -> InstallLayout {
        InstallLayout::new(&self.home)
    }
}

/// NO_COLOR disables styling only for the values `true` and `1`
pub fn no_color_requested(value: Option<&str>) -> bool {
    matches!(value.map(str::trim), Some("true") | Some("1"))
}

/// Fixed on-disk locations of the managed toolchain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallLayout {
    pub install_dir: PathBuf,
    pub bin_dir: PathBuf,
    pub binary: PathBuf,
}

impl InstallLayout {
    pub fn new(home: &Path) -> Self {
        let install_dir = home.join(INSTALL_DIR_NAME);
        let bin_dir = install_dir.join("bin");
        let binary = bin_dir.join(BINARY_NAME);
        Self {
            install_dir,
            bin_dir,
            binary,
        }
    }
}

/// Options chosen on the command line
#[derive(Debug, Clone, Copy, Default)]
pub struct Settings {
    pub verbose: bool,
    pub quiet: bool,
    pub assume_yes: bool,
    pub uninstall: bool,
}

/// Optional config file (`~/.config/go-installer/config.toml`)
#[derive(Debug, Deserialize, Clone, Default)]
pub struct FileConfig {
    #[serde(default)]
    pub download: DownloadConfig,
}

/// `[download]` section
#[derive(Debug, Deserialize, Clone, Default)]
pub struct DownloadConfig {
    /// Mirror serving the version manifest, checksum page and archives
    pub origin: Option<String>,
    pub user_agent: Option<String>,
}

impl FileConfig {
    /// Default location of the config file
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("go-installer").join("config.toml"))
    }

    /// Load the config file, returning defaults when it does not exist
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        if let Some(origin) = &config.download.origin
            && !origin.starts_with("https://")
        {
            return Err(InstallerError::InsecureUrl {
                url: origin.clone(),
            })
            .with_context(|| format!("Invalid download origin in {}", path.display()));
        }

        Ok(config)
    }

    pub fn endpoints(&self) -> Endpoints {
        Endpoints {
            origin: self
                .download
                .origin
                .as_deref()
                .unwrap_or(DEFAULT_ORIGIN)
                .trim_end_matches('/')
                .to_string(),
            user_agent: self
                .download
                .user_agent
                .clone()
                .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
        }
    }
}

/// Remote resources, all under one origin
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub origin: String,
    pub user_agent: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        FileConfig::default().endpoints()
    }
}

impl Endpoints {
    /// Plain-text "current version" resource
    pub fn version_url(&self) -> String {
        format!("{}/VERSION?m=text", self.origin)
    }

    /// Listing page with archives and their checksums
    pub fn checksum_page_url(&self) -> String {
        format!("{}/dl/", self.origin)
    }

    pub fn archive_url(&self, file_name: &str) -> String {
        format!("{}/dl/{file_name}", self.origin)
    }
}
