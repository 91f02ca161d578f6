//! Release version of the tool itself
//!
//! The generated script pins the helper CLI to the release that produced it.
//! When the caller does not supply a release version explicitly, it comes from
//! [`resolve_own_release_version`].

use anyhow::{Context, Result};
use semver::Version;

/// Parse a release version, accepting an optional leading `v`
///
/// ```
/// use dcontainer_core::version::parse_release_version;
///
/// assert_eq!(parse_release_version("v0.3.1").unwrap().to_string(), "0.3.1");
/// assert!(parse_release_version("latest").is_err());
/// ```
pub fn parse_release_version(raw: &str) -> Result<Version> {
    let version_str = raw.trim().strip_prefix('v').unwrap_or(raw.trim());
    Version::parse(version_str)
        .with_context(|| format!("'{}' is not a valid release version", raw))
}

/// Release version of this build, normalized to `MAJOR.MINOR.PATCH[-PRE]`
pub fn resolve_own_release_version() -> Result<String> {
    let version = parse_release_version(crate::version())
        .context("Failed to read the package version of this build")?;
    Ok(version.to_string())
}
