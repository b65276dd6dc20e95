//! Release version derivation

use crate::errors::OrchestratorError;

/// Version template that lets the platform pick the next patch number
const AUTO_PATCH: &str = "i";

/// Work out the version of a release about to be created.
///
/// An explicit version wins. Otherwise the version is `{major}.{minor}.i`
/// taken from the first package, with `-{channel}` appended when a channel
/// is set.
pub fn derive_release_version(
    first_package_version: Option<&str>,
    explicit_version: Option<&str>,
    channel_name: Option<&str>,
) -> Result<String, OrchestratorError> {
    if let Some(explicit) = explicit_version.map(str::trim).filter(|v| !v.is_empty()) {
        return Ok(explicit.to_string());
    }

    let package_version = first_package_version
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| {
            OrchestratorError::ResolutionError(
                "no package version to derive the release version from".to_string(),
            )
        })?;

    let mut parts = package_version.split('.');
    let major = leading_digits(parts.next().unwrap_or_default());
    if major.is_empty() {
        return Err(OrchestratorError::ResolutionError(format!(
            "package version {} has no numeric major component",
            package_version
        )));
    }
    let minor = parts.next().map(leading_digits).filter(|m| !m.is_empty());

    let mut version = format!("{}.{}.{}", major, minor.unwrap_or("0"), AUTO_PATCH);
    if let Some(channel) = channel_name.map(str::trim).filter(|c| !c.is_empty()) {
        version.push('-');
        version.push_str(&prerelease_label(channel));
    }
    Ok(version)
}

fn leading_digits(component: &str) -> &str {
    let end = component
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(component.len());
    &component[..end]
}

fn prerelease_label(channel: &str) -> String {
    channel
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '-' })
        .collect()
}
