//! Package engine error types.

use std::fmt;
use std::path::Path;

/// Engine error codes.
pub mod codes {
    pub const PKG_SPEC_INVALID: &str = "PKG_SPEC_INVALID";
    pub const PKG_SCAN_ROOT_INACCESSIBLE: &str = "PKG_SCAN_ROOT_INACCESSIBLE";
    pub const PKG_LINK_FAILED: &str = "PKG_LINK_FAILED";
    pub const PKG_FALLBACK_FAILED: &str = "PKG_FALLBACK_FAILED";
    pub const PKG_PACKAGE_JSON_NOT_FOUND: &str = "PKG_PACKAGE_JSON_NOT_FOUND";
    pub const PKG_PACKAGE_JSON_INVALID: &str = "PKG_PACKAGE_JSON_INVALID";
    pub const PKG_RECORD_FAILED: &str = "PKG_RECORD_FAILED";
}

/// Package engine error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PkgError {
    code: &'static str,
    message: String,
}

impl PkgError {
    /// Create a new error with the given code and message.
    #[must_use]
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Get the error code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        self.code
    }

    /// Get the error message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Create a spec invalid error.
    pub fn spec_invalid(msg: impl Into<String>) -> Self {
        Self::new(codes::PKG_SPEC_INVALID, msg)
    }

    /// The search root cannot be listed; fatal for the batch.
    #[must_use]
    pub fn scan_root_inaccessible(root: &Path, reason: impl fmt::Display) -> Self {
        Self::new(
            codes::PKG_SCAN_ROOT_INACCESSIBLE,
            format!("Cannot scan {}: {reason}", root.display()),
        )
    }

    /// Create a link failed error.
    pub fn link_failed(msg: impl Into<String>) -> Self {
        Self::new(codes::PKG_LINK_FAILED, msg)
    }

    /// Create a fallback install failed error.
    pub fn fallback_failed(msg: impl Into<String>) -> Self {
        Self::new(codes::PKG_FALLBACK_FAILED, msg)
    }

    /// Create a package.json not found error.
    #[must_use]
    pub fn package_json_not_found(path: &Path) -> Self {
        Self::new(
            codes::PKG_PACKAGE_JSON_NOT_FOUND,
            format!("package.json not found: {}", path.display()),
        )
    }

    /// Create a package.json invalid error.
    pub fn package_json_invalid(msg: impl Into<String>) -> Self {
        Self::new(codes::PKG_PACKAGE_JSON_INVALID, msg)
    }

    /// Create a dependency record failed error.
    pub fn record_failed(msg: impl Into<String>) -> Self {
        Self::new(codes::PKG_RECORD_FAILED, msg)
    }
}

impl fmt::Display for PkgError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for PkgError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_format() {
        let err = PkgError::spec_invalid("bad spec");
        assert_eq!(err.code(), codes::PKG_SPEC_INVALID);
        assert_eq!(err.to_string(), "PKG_SPEC_INVALID: bad spec");
    }

    #[test]
    fn test_scan_error_names_root() {
        let err = PkgError::scan_root_inaccessible(Path::new("/nope"), "not found");
        assert_eq!(err.code(), codes::PKG_SCAN_ROOT_INACCESSIBLE);
        assert!(err.message().contains("/nope"));
    }

    #[test]
    fn test_error_codes_uppercase() {
        let all_codes = [
            codes::PKG_SPEC_INVALID,
            codes::PKG_SCAN_ROOT_INACCESSIBLE,
            codes::PKG_LINK_FAILED,
            codes::PKG_FALLBACK_FAILED,
            codes::PKG_PACKAGE_JSON_NOT_FOUND,
            codes::PKG_PACKAGE_JSON_INVALID,
            codes::PKG_RECORD_FAILED,
        ];

        for code in all_codes {
            assert!(
                code.chars().all(|c| c.is_uppercase() || c == '_'),
                "Error code '{code}' should be SCREAMING_SNAKE_CASE"
            );
        }
    }
}
