//! Server version gate.

use crate::domain::error::VersionError;

/// Oldest LXD release the provider talks to.
pub const MIN_LXD_VERSION: semver::Version = semver::Version::new(4, 0, 0);

/// Human-readable form of the supported range, used in error messages.
pub const SUPPORTED_LXD_VERSIONS: &str = ">= 4.0.0";

/// Parse an LXD version string.
///
/// LXD reports `major.minor` for feature releases (`5.21`) and
/// `major.minor.patch` for LTS point releases; missing components count as
/// zero. A leading `v` and any pre-release or build suffix are ignored.
#[must_use]
pub fn parse_server_version(reported: &str) -> Option<semver::Version> {
    let trimmed = reported.trim().trim_start_matches('v');
    let core = trimmed
        .split(['-', '+', ' '])
        .next()
        .filter(|c| !c.is_empty())?;

    let mut parts = [0u64; 3];
    let mut count = 0;
    for piece in core.split('.') {
        if count == parts.len() {
            return None;
        }
        parts[count] = piece.parse().ok()?;
        count += 1;
    }
    Some(semver::Version::new(parts[0], parts[1], parts[2]))
}

/// Check `reported` against [`MIN_LXD_VERSION`].
///
/// # Errors
///
/// Returns [`VersionError::Unsupported`] when the version is too old and
/// [`VersionError::Invalid`] when it cannot be parsed.
pub fn check_server_version(reported: &str) -> Result<(), VersionError> {
    let version =
        parse_server_version(reported).ok_or_else(|| VersionError::Invalid(reported.to_string()))?;
    if version < MIN_LXD_VERSION {
        return Err(VersionError::Unsupported {
            reported: reported.to_string(),
            required: SUPPORTED_LXD_VERSIONS.to_string(),
        });
    }
    Ok(())
}
