//! Requested package names.
//!
//! Parses requests like:
//! - `lodash`
//! - `lodash@4.17.21`
//! - `@types/node`
//! - `@types/node@20.0.0`
//!
//! The version part is kept verbatim. Only exact matches are resolved
//! locally; anything else (`^4`, `latest`) ends up with the remote installer.

use super::error::PkgError;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;

/// A parsed request: a package name, optionally pinned to a version.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct PackageSpec {
    /// Full package name (e.g., "@scope/name" or "name").
    pub name: String,
    /// Requested version, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl PackageSpec {
    /// Parse a request string.
    ///
    /// # Errors
    /// Returns an error if the name or the version part is empty, or the
    /// name contains characters npm does not allow.
    pub fn parse(input: &str) -> Result<Self, PkgError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(PkgError::spec_invalid("Empty package spec"));
        }

        // A leading '@' belongs to the scope, so the version delimiter is searched after it.
        let search_from = usize::from(input.starts_with('@'));
        let (name, version) = match input[search_from..].find('@') {
            Some(pos) => {
                let at = search_from + pos;
                let version = &input[at + 1..];
                if version.is_empty() {
                    return Err(PkgError::spec_invalid(format!(
                        "Invalid package spec: empty version in '{input}'"
                    )));
                }
                (&input[..at], Some(version.to_string()))
            }
            None => (input, None),
        };

        validate_name(name, input)?;

        Ok(Self {
            name: name.to_string(),
            version,
        })
    }

    /// A bare request for `name`.
    #[must_use]
    pub fn bare(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: None,
        }
    }

    /// Get the unscoped portion of the name.
    ///
    /// For `@scope/name`, returns `name`.
    #[must_use]
    pub fn unscoped_name(&self) -> &str {
        unscoped(&self.name)
    }
}

impl fmt::Display for PackageSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.version {
            Some(version) => write!(f, "{}@{version}", self.name),
            None => f.write_str(&self.name),
        }
    }
}

/// Strip an `@scope/` prefix from a package name.
#[must_use]
pub fn unscoped(name: &str) -> &str {
    if name.starts_with('@') {
        name.split_once('/').map_or(name, |(_, rest)| rest)
    } else {
        name
    }
}

fn validate_name(name: &str, input: &str) -> Result<(), PkgError> {
    let bare = match name.strip_prefix('@') {
        Some(scoped) => {
            let Some((scope, rest)) = scoped.split_once('/') else {
                return Err(PkgError::spec_invalid(format!(
                    "Invalid scoped package: missing '/' in '{input}'"
                )));
            };
            check_segment(scope, input)?;
            rest
        }
        None => name,
    };
    check_segment(bare, input)
}

fn check_segment(segment: &str, input: &str) -> Result<(), PkgError> {
    if segment.is_empty() {
        return Err(PkgError::spec_invalid(format!(
            "Invalid package spec: empty name in '{input}'"
        )));
    }
    if segment.starts_with(['.', '_']) {
        return Err(PkgError::spec_invalid(format!(
            "Package name '{input}' cannot start with '.' or '_'"
        )));
    }
    if let Some(c) = segment
        .chars()
        .find(|c| !c.is_alphanumeric() && !matches!(c, '-' | '_' | '.'))
    {
        return Err(PkgError::spec_invalid(format!(
            "Invalid character '{c}' in package name '{input}'"
        )));
    }
    Ok(())
}

/// Parse a list of requests, collapsing repeated names.
///
/// The first request for a name wins; later ones are dropped.
///
/// # Errors
/// Returns the first parse error.
pub fn parse_requests<S: AsRef<str>>(inputs: &[S]) -> Result<Vec<PackageSpec>, PkgError> {
    let mut seen = HashSet::new();
    let mut specs = Vec::with_capacity(inputs.len());
    for input in inputs {
        let spec = PackageSpec::parse(input.as_ref())?;
        if seen.insert(spec.name.clone()) {
            specs.push(spec);
        }
    }
    Ok(specs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bare() {
        let spec = PackageSpec::parse("lodash").unwrap();
        assert_eq!(spec, PackageSpec::bare("lodash"));
    }

    #[test]
    fn test_parse_with_version() {
        let spec = PackageSpec::parse("lodash@4.17.21").unwrap();
        assert_eq!(spec.name, "lodash");
        assert_eq!(spec.version.as_deref(), Some("4.17.21"));
        assert_eq!(spec.to_string(), "lodash@4.17.21");
    }

    #[test]
    fn test_parse_scoped() {
        let spec = PackageSpec::parse("@types/node").unwrap();
        assert_eq!(spec.name, "@types/node");
        assert_eq!(spec.version, None);
        assert_eq!(spec.unscoped_name(), "node");
    }

    #[test]
    fn test_parse_scoped_with_version() {
        let spec = PackageSpec::parse("@types/node@20.0.0").unwrap();
        assert_eq!(spec.name, "@types/node");
        assert_eq!(spec.version.as_deref(), Some("20.0.0"));
    }

    #[test]
    fn test_range_kept_verbatim() {
        let spec = PackageSpec::parse("react@^18").unwrap();
        assert_eq!(spec.version.as_deref(), Some("^18"));
    }

    #[test]
    fn test_parse_invalid() {
        for input in ["", "   ", "@", "@scope", "@scope/", "@/x", "lodash@", "@types/node@", "lo dash", "a/b"] {
            assert!(PackageSpec::parse(input).is_err(), "{input:?} should fail");
        }
    }

    #[test]
    fn test_parse_rejects_relative_segments() {
        for input in [".", "..", "..@1.0.0", ".hidden", "_private", "@scope/..", "@../x"] {
            let err = PackageSpec::parse(input).unwrap_err();
            assert_eq!(err.code(), "PKG_SPEC_INVALID", "{input:?}");
        }
        assert!(PackageSpec::parse("a.b").is_ok());
    }

    #[test]
    fn test_parse_requests_dedupes_by_name() {
        let specs = parse_requests(&["a", "b@2.0.0", "a@1.0.0"]).unwrap();
        assert_eq!(
            specs,
            vec![
                PackageSpec::bare("a"),
                PackageSpec::parse("b@2.0.0").unwrap()
            ]
        );
    }

    #[test]
    fn test_unscoped_helper() {
        assert_eq!(unscoped("@babel/core"), "core");
        assert_eq!(unscoped("debug"), "debug");
    }
}
