use crate::error::Error;
use std::path::{Path, PathBuf};

/// Environment variable overriding the search root.
pub const ROOT_ENV: &str = "HAVE";

/// Directory name that holds a project's installed dependencies.
pub const DEPENDENCY_DIR: &str = "node_modules";

/// Directory (inside [`DEPENDENCY_DIR`]) holding executable aliases.
pub const BIN_DIR: &str = ".bin";

/// Manifest file name of a package or project.
pub const MANIFEST_FILE: &str = "package.json";

/// Get the default search root.
///
/// Uses `$HAVE` when set and non-empty, otherwise the user's home directory.
#[must_use]
pub fn default_root() -> Option<PathBuf> {
    match std::env::var_os(ROOT_ENV) {
        Some(value) if !value.is_empty() => Some(PathBuf::from(value)),
        _ => dirs_next::home_dir(),
    }
}

/// Pick the search root for a batch: the explicit value if given, else [`default_root`].
///
/// The root is only checked for existence later, by the scanner, so that an
/// inaccessible root surfaces as a scan failure of the batch.
///
/// # Errors
/// Returns [`Error::HomeNotFound`] if no explicit root is given and no default exists.
pub fn resolve_root(explicit: Option<&Path>) -> Result<PathBuf, Error> {
    explicit
        .map(Path::to_path_buf)
        .or_else(default_root)
        .ok_or(Error::HomeNotFound)
}

/// `<project>/node_modules`.
#[must_use]
pub fn dependency_root(project: &Path) -> PathBuf {
    project.join(DEPENDENCY_DIR)
}

/// `<project>/node_modules/.bin`.
#[must_use]
pub fn bin_dir(project: &Path) -> PathBuf {
    dependency_root(project).join(BIN_DIR)
}
