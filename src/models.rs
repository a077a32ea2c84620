use std::fmt;
use std::path::PathBuf;

/// Latest release as published by the version manifest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteVersionInfo {
    /// Raw tag, e.g. `go1.22.4`
    pub tag: String,
    /// Normalized dotted version, e.g. `1.22.4`
    pub version: String,
}

/// A toolchain binary found on PATH
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalInstallInfo {
    pub binary: PathBuf,
    /// Version reported by the binary, when it could be parsed
    pub version: Option<String>,
    /// Whether `binary` is the canonical `$HOME/.go/bin/go`
    pub canonical: bool,
}

/// The six install stages, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    DiscoverRemote,
    DetectExisting,
    Download,
    Verify,
    Extract,
    Configure,
}

impl Step {
    pub const ALL: [Step; 6] = [
        Step::DiscoverRemote,
        Step::DetectExisting,
        Step::Download,
        Step::Verify,
        Step::Extract,
        Step::Configure,
    ];

    /// 1-based position in [`Step::ALL`]
    pub fn number(self) -> usize {
        match self {
            Step::DiscoverRemote => 1,
            Step::DetectExisting => 2,
            Step::Download => 3,
            Step::Verify => 4,
            Step::Extract => 5,
            Step::Configure => 6,
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Step::DiscoverRemote => "Fetching latest version",
            Step::DetectExisting => "Checking existing installation",
            Step::Download => "Downloading archive",
            Step::Verify => "Verifying checksum",
            Step::Extract => "Extracting archive",
            Step::Configure => "Configuring shell profile",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "STEP{}", self.number())
    }
}

/// How a successful install run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallOutcome {
    /// The installed version already matches the latest release
    UpToDate { version: String },
    /// All six steps ran
    Installed {
        version: String,
        reload_instruction: Option<String>,
    },
}

/// How an uninstall run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UninstallOutcome {
    Removed { leftover_profile: Option<PathBuf> },
    NotInstalled { leftover_profile: Option<PathBuf> },
    /// The user declined the confirmation prompt; nothing changed
    Aborted,
}
