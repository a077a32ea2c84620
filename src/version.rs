use crate::error::{InstallerError, InstallerResult};
use regex::Regex;
use std::sync::LazyLock;

/// Minor and patch stay below this so `major*10000 + minor*100 + patch`
/// never carries between components
const COMPONENT_LIMIT: u64 = 100;

static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^go(\d+)\.(\d+)(?:\.(\d+))?$").expect("valid tag regex"));

static GO_VERSION_OUTPUT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bgo version go(\d+\.\d+(?:\.\d+)?)\b").expect("valid go version regex")
});

/// Encode a three-component dotted version as an integer.
pub fn to_ordinal(version: &str) -> InstallerResult<u64> {
    let malformed = |reason: &str| InstallerError::MalformedVersion {
        input: version.to_string(),
        reason: reason.to_string(),
    };

    let parts: Vec<&str> = version.trim().split('.').collect();
    if parts.len() != 3 {
        return Err(malformed("expected exactly three dot-separated components"));
    }

    let mut components = [0u64; 3];
    for (slot, part) in components.iter_mut().zip(&parts) {
        if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
            return Err(malformed("components must be non-negative integers"));
        }
        *slot = part
            .parse::<u64>()
            .map_err(|_| malformed("component is too large"))?;
    }

    let [major, minor, patch] = components;
    if minor >= COMPONENT_LIMIT || patch >= COMPONENT_LIMIT {
        return Err(malformed("minor and patch components must be below 100"));
    }

    major
        .checked_mul(COMPONENT_LIMIT * COMPONENT_LIMIT)
        .and_then(|v| v.checked_add(minor * COMPONENT_LIMIT + patch))
        .ok_or_else(|| malformed("major component is too large"))
}

/// Absolute ordinal distance between two versions.
pub fn diff(v1: &str, v2: &str) -> InstallerResult<u64> {
    Ok(to_ordinal(v1)?.abs_diff(to_ordinal(v2)?))
}

/// Human wording for how far behind a local install is.
pub fn staleness_message(distance: u64) -> String {
    if distance == 1 {
        "1 version lower".to_string()
    } else {
        format!("{distance} versions lower")
    }
}

/// Turn a release tag such as `go1.22.4` (or a historic `go1.20`) into a
/// three-component version.
pub fn normalize_tag(tag: &str) -> InstallerResult<String> {
    let caps = TAG_RE
        .captures(tag.trim())
        .ok_or_else(|| InstallerError::MalformedVersion {
            input: tag.to_string(),
            reason: "expected a tag like go1.22.4".to_string(),
        })?;

    let patch = caps.get(3).map_or("0", |m| m.as_str());
    Ok(format!("{}.{}.{patch}", &caps[1], &caps[2]))
}

/// Extract the version from `go version` output, e.g.
/// `go version go1.22.4 linux/amd64` yields `1.22.4`.
pub fn parse_go_version_output(output: &str) -> Option<String> {
    let caps = GO_VERSION_OUTPUT_RE.captures(output)?;
    normalize_tag(&format!("go{}", &caps[1])).ok()
}
