use crate::error::{InstallerError, InstallerResult};
use std::fmt;

/// Operating system component of the release file name.
pub const RELEASE_OS: &str = "linux";

/// Architectures with published release archives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arch {
    Amd64,
    I386,
}

impl Arch {
    /// Map a machine name (`uname -m` style or Rust's `std::env::consts::ARCH`)
    /// to a release architecture.
    pub fn from_machine(machine: &str) -> InstallerResult<Self> {
        match machine.trim() {
            "x86_64" | "amd64" => Ok(Self::Amd64),
            "x86" | "i386" | "i486" | "i586" | "i686" => Ok(Self::I386),
            other => Err(InstallerError::UnsupportedArchitecture {
                arch: other.to_string(),
            }),
        }
    }

    /// Architecture of the running binary.
    pub fn detect() -> InstallerResult<Self> {
        Self::from_machine(std::env::consts::ARCH)
    }

    /// Tag used in release file names.
    pub fn tag(self) -> &'static str {
        match self {
            Self::Amd64 => "amd64",
            Self::I386 => "386",
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Canonical archive name for a release tag, e.g. `go1.22.4.linux-amd64.tar.gz`.
///
/// Built from the raw tag rather than the normalized version, since older
/// releases (`go1.20`) publish archives without a patch component.
pub fn archive_file_name(tag: &str, arch: Arch) -> String {
    format!("{tag}.{RELEASE_OS}-{}.tar.gz", arch.tag())
}
