use crate::error::{InstallerError, InstallerResult};
use sha2::digest::Output;
use sha2::{Digest, Sha256, Sha512};
use std::fmt::LowerHex;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

/// Digest algorithms the verifier knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlgorithm {
    Sha256,
    Sha512,
}

/// Compute the hex digest of a regular file
pub fn checksum(algorithm: HashAlgorithm, file_path: &Path) -> InstallerResult<String> {
    if !file_path.is_file() {
        return Err(InstallerError::FileNotFound {
            path: file_path.to_path_buf(),
        });
    }

    match algorithm {
        HashAlgorithm::Sha256 => digest_file::<Sha256>(file_path),
        HashAlgorithm::Sha512 => digest_file::<Sha512>(file_path),
    }
}

fn digest_file<D: Digest>(file_path: &Path) -> InstallerResult<String>
where
    Output<D>: LowerHex,
{
    let hash_error = |source| InstallerError::HashComputation {
        path: file_path.to_path_buf(),
        source,
    };

    let mut file = fs::File::open(file_path).map_err(hash_error)?;
    let mut hasher = D::new();
    let mut buffer = [0; 8192];

    loop {
        let bytes_read = file.read(&mut buffer).map_err(hash_error)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

/// SHA-256 and SHA-512 digests of one local file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecksumPair {
    pub sha256: String,
    pub sha512: String,
}

impl ChecksumPair {
    pub fn compute(file_path: &Path) -> InstallerResult<Self> {
        Ok(Self {
            sha256: checksum(HashAlgorithm::Sha256, file_path)?,
            sha512: checksum(HashAlgorithm::Sha512, file_path)?,
        })
    }
}

/// Which of the local digests appear in the published checksum page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChecksumPresence {
    Neither,
    Sha256Only,
    Sha512Only,
    Both,
}

impl ChecksumPresence {
    /// Scan the page as unstructured text for each digest
    pub fn scan(page: &str, pair: &ChecksumPair) -> Self {
        let page = page.to_lowercase();
        match (page.contains(&pair.sha256), page.contains(&pair.sha512)) {
            (false, false) => Self::Neither,
            (true, false) => Self::Sha256Only,
            (false, true) => Self::Sha512Only,
            (true, true) => Self::Both,
        }
    }

    pub fn passed(self) -> bool {
        !matches!(self, Self::Neither)
    }
}

/// Result of a passing verification
#[derive(Debug, Clone)]
pub struct Verification {
    pub pair: ChecksumPair,
    pub presence: ChecksumPresence,
}

/// Cross-check a downloaded archive against the published checksum page.
///
/// `published_name` is the archive's file name on the page; when the page
/// lists the file but none of our digests, the failure is reported as a
/// mismatch rather than a missing entry.
pub fn verify_against_page(
    file_path: &Path,
    published_name: &str,
    page: &str,
) -> InstallerResult<Verification> {
    let pair = ChecksumPair::compute(file_path)?;
    let presence = ChecksumPresence::scan(page, &pair);

    match presence {
        ChecksumPresence::Neither if page.contains(published_name) => {
            Err(InstallerError::ChecksumMismatch {
                file: PathBuf::from(file_path),
                name: published_name.to_string(),
            })
        }
        ChecksumPresence::Neither => Err(InstallerError::ChecksumNotFound {
            file: PathBuf::from(file_path),
        }),
        ChecksumPresence::Sha256Only | ChecksumPresence::Sha512Only | ChecksumPresence::Both => {
            Ok(Verification { pair, presence })
        }
    }
}
