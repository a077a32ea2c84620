use crate::error::{InstallerError, InstallerResult};
use flate2::read::GzDecoder;
use std::fs;
use std::io::Read;
use std::path::{Component, Path, PathBuf};
use tar::{Archive, EntryType};
use tracing::debug;

/// Extract a .tar.gz archive into `extract_to`, dropping the first
/// `strip_components` path components of every entry (like
/// `tar --strip-components`). Returns the number of entries written.
pub fn extract_tar_gz(
    tar_path: &Path,
    extract_to: &Path,
    strip_components: usize,
) -> InstallerResult<usize> {
    let file = fs::File::open(tar_path).map_err(|e| extraction_error(tar_path, "open", e))?;
    extract_tar_from_reader(GzDecoder::new(file), tar_path, extract_to, strip_components)
}

fn extraction_error(tar_path: &Path, action: &str, err: impl std::fmt::Display) -> InstallerError {
    InstallerError::Extraction {
        archive: tar_path.to_path_buf(),
        message: format!("{action}: {err}"),
    }
}

/// Relative output path for an entry, or None when nothing is left after
/// stripping. Absolute paths and `..` are refused.
fn stripped_path(path: &Path, strip_components: usize) -> Result<Option<PathBuf>, String> {
    let mut kept = PathBuf::new();
    let mut seen = 0;
    for component in path.components() {
        match component {
            Component::Normal(part) => {
                if seen >= strip_components {
                    kept.push(part);
                }
                seen += 1;
            }
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(format!("unsafe entry path: {}", path.display()));
            }
        }
    }

    Ok(if kept.as_os_str().is_empty() {
        None
    } else {
        Some(kept)
    })
}

fn extract_tar_from_reader<R: Read>(
    reader: R,
    tar_path: &Path,
    extract_to: &Path,
    strip_components: usize,
) -> InstallerResult<usize> {
    let mut archive = Archive::new(reader);
    archive.set_preserve_permissions(true);

    fs::create_dir_all(extract_to).map_err(|e| {
        InstallerError::filesystem(
            format!("Failed to create extraction directory: {}", extract_to.display()),
            e,
        )
    })?;

    let mut extracted = 0;

    for entry in archive
        .entries()
        .map_err(|e| extraction_error(tar_path, "read entries", e))?
    {
        let mut entry = entry.map_err(|e| extraction_error(tar_path, "read entry", e))?;
        let path = entry
            .path()
            .map_err(|e| extraction_error(tar_path, "read entry path", e))?
            .into_owned();

        let Some(relative) = stripped_path(&path, strip_components)
            .map_err(|msg| extraction_error(tar_path, "validate entry", msg))?
        else {
            continue;
        };

        let outpath = extract_to.join(&relative);

        if let Some(parent) = outpath.parent()
            && !parent.exists()
        {
            fs::create_dir_all(parent).map_err(|e| {
                InstallerError::filesystem(
                    format!("Failed to create parent directory: {}", parent.display()),
                    e,
                )
            })?;
        }

        // unpack() would resolve the link target against the process cwd
        if entry.header().entry_type() == EntryType::Link {
            let target = entry
                .link_name()
                .map_err(|e| extraction_error(tar_path, "read link target", e))?
                .ok_or_else(|| extraction_error(tar_path, "read link target", "missing"))?
                .into_owned();
            let target = stripped_path(&target, strip_components)
                .map_err(|msg| extraction_error(tar_path, "validate link target", msg))?
                .ok_or_else(|| {
                    extraction_error(tar_path, "validate link target", target.display())
                })?;

            fs::hard_link(extract_to.join(&target), &outpath).map_err(|e| {
                extraction_error(tar_path, &format!("link {}", outpath.display()), e)
            })?;
            extracted += 1;
            continue;
        }

        entry
            .unpack(&outpath)
            .map_err(|e| extraction_error(tar_path, &format!("write {}", outpath.display()), e))?;

        extracted += 1;
    }

    debug!(entries = extracted, dest = %extract_to.display(), "archive extracted");
    Ok(extracted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use tempfile::TempDir;

    fn build_archive(dir: &Path, entries: &[(&str, &[u8])]) -> PathBuf {
        let path = dir.join("fixture.tar.gz");
        let file = fs::File::create(&path).unwrap();
        let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));
        for (name, data) in entries {
            let mut header = tar::Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(0o755);
            header.set_cksum();
            builder.append_data(&mut header, name, *data).unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap();
        path
    }

    #[test]
    fn test_stripped_path() {
        assert_eq!(
            stripped_path(Path::new("go/bin/go"), 1).unwrap(),
            Some(PathBuf::from("bin/go"))
        );
        assert_eq!(stripped_path(Path::new("go/"), 1).unwrap(), None);
        assert_eq!(
            stripped_path(Path::new("./go/VERSION"), 1).unwrap(),
            Some(PathBuf::from("VERSION"))
        );
        assert!(stripped_path(Path::new("go/../../etc/passwd"), 1).is_err());
        assert!(stripped_path(Path::new("/etc/passwd"), 0).is_err());
    }

    #[test]
    fn test_extract_strips_top_level_directory() {
        let temp = TempDir::new().unwrap();
        let archive = build_archive(
            temp.path(),
            &[("go/bin/go", b"#!/bin/sh\n"), ("go/VERSION", b"go1.22.4\n")],
        );
        let dest = temp.path().join("install");

        let count = extract_tar_gz(&archive, &dest, 1).unwrap();
        assert_eq!(count, 2);
        assert!(dest.join("bin/go").is_file());
        assert_eq!(fs::read_to_string(dest.join("VERSION")).unwrap(), "go1.22.4\n");
    }

    fn build_archive_with_link(dir: &Path, link_target: &str) -> PathBuf {
        let path = dir.join("linked.tar.gz");
        let file = fs::File::create(&path).unwrap();
        let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));

        let data = b"#!/bin/sh\n";
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o755);
        header.set_cksum();
        builder
            .append_data(&mut header, "go/bin/go", &data[..])
            .unwrap();

        let mut link = tar::Header::new_gnu();
        link.set_entry_type(EntryType::Link);
        link.set_size(0);
        builder
            .append_link(&mut link, "go/bin/gofmt", link_target)
            .unwrap();

        builder.into_inner().unwrap().finish().unwrap();
        path
    }

    #[test]
    fn test_hard_link_resolves_inside_destination() {
        let temp = TempDir::new().unwrap();
        let archive = build_archive_with_link(temp.path(), "go/bin/go");
        let dest = temp.path().join("install");

        let count = extract_tar_gz(&archive, &dest, 1).unwrap();
        assert_eq!(count, 2);
        assert_eq!(fs::read(dest.join("bin/gofmt")).unwrap(), b"#!/bin/sh\n");
    }

    #[test]
    fn test_hard_link_escaping_destination_is_rejected() {
        let temp = TempDir::new().unwrap();
        let archive = build_archive_with_link(temp.path(), "go/../../etc/passwd");

        let result = extract_tar_gz(&archive, &temp.path().join("install"), 1);
        assert!(matches!(result, Err(InstallerError::Extraction { .. })));
    }

    #[test]
    fn test_extract_corrupt_archive_fails() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("broken.tar.gz");
        fs::write(&archive, b"definitely not gzip").unwrap();

        let result = extract_tar_gz(&archive, &temp.path().join("out"), 1);
        assert!(matches!(result, Err(InstallerError::Extraction { .. })));
    }

    #[test]
    fn test_extract_missing_archive_fails() {
        let temp = TempDir::new().unwrap();
        let result = extract_tar_gz(&temp.path().join("nope.tar.gz"), temp.path(), 1);
        assert!(matches!(result, Err(InstallerError::Extraction { .. })));
    }
}
