//! Candidate folder discovery.
//!
//! Walks the search root looking for `node_modules` folders and reports
//! every `node_modules/<name>` directory for the requested names. Nothing
//! is opened besides directories; manifests are left to the reader.

use super::error::PkgError;
use crate::paths::DEPENDENCY_DIR;
use std::collections::BTreeSet;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Where and how deep to look.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Folder to walk.
    pub root: PathBuf,
    /// Deepest level of a `node_modules` folder, counted from `root`.
    pub max_depth: usize,
    /// `node_modules` folders never reported (the project's own).
    pub exclude: Vec<PathBuf>,
}

/// Find plausible installation folders for `names` under the search root.
///
/// Unreadable directories and symlink loops are skipped. Only an
/// inaccessible root fails the scan. The result is sorted and free of
/// duplicates.
///
/// # Errors
/// Returns `PKG_SCAN_ROOT_INACCESSIBLE` if the root cannot be listed.
pub async fn scan_candidates(
    options: &ScanOptions,
    names: &[String],
) -> Result<Vec<PathBuf>, PkgError> {
    let options = options.clone();
    let names = names.to_vec();
    let root = options.root.clone();

    tokio::task::spawn_blocking(move || scan_candidates_blocking(&options, &names))
        .await
        .map_err(|e| PkgError::scan_root_inaccessible(&root, e))?
}

/// Blocking body of [`scan_candidates`].
///
/// # Errors
/// Returns `PKG_SCAN_ROOT_INACCESSIBLE` if the root cannot be listed.
pub fn scan_candidates_blocking(
    options: &ScanOptions,
    names: &[String],
) -> Result<Vec<PathBuf>, PkgError> {
    let root = dunce::canonicalize(&options.root)
        .map_err(|e| PkgError::scan_root_inaccessible(&options.root, e))?;
    std::fs::read_dir(&root).map_err(|e| PkgError::scan_root_inaccessible(&root, e))?;

    if names.is_empty() {
        return Ok(Vec::new());
    }

    let exclude: Vec<PathBuf> = options
        .exclude
        .iter()
        .map(|p| dunce::canonicalize(p).unwrap_or_else(|_| p.clone()))
        .collect();

    let mut found = BTreeSet::new();

    for entry in WalkDir::new(&root)
        .min_depth(1)
        .max_depth(options.max_depth)
        .follow_links(true)
        .into_iter()
        .filter_entry(should_visit)
        .filter_map(Result::ok)
    {
        if entry.file_name() != OsStr::new(DEPENDENCY_DIR) {
            continue;
        }
        if exclude.iter().any(|ex| ex == entry.path()) {
            continue;
        }
        for name in names {
            let folder = entry.path().join(name);
            if folder.is_dir() {
                found.insert(folder);
            }
        }
    }

    Ok(found.into_iter().collect())
}

/// Directories only, no hidden folders, and never below a `node_modules`.
fn should_visit(entry: &DirEntry) -> bool {
    if entry.depth() == 0 {
        return true;
    }
    if !entry.file_type().is_dir() {
        return false;
    }
    if entry.file_name().to_string_lossy().starts_with('.') {
        return false;
    }
    !parent_is_dependency_dir(entry.path())
}

fn parent_is_dependency_dir(path: &Path) -> bool {
    path.parent()
        .and_then(Path::file_name)
        .is_some_and(|n| n == OsStr::new(DEPENDENCY_DIR))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn install(root: &Path, project: &str, name: &str) -> PathBuf {
        let folder = root.join(project).join("node_modules").join(name);
        fs::create_dir_all(&folder).unwrap();
        dunce::canonicalize(folder).unwrap()
    }

    fn options(root: &Path) -> ScanOptions {
        ScanOptions {
            root: root.to_path_buf(),
            max_depth: 2,
            exclude: Vec::new(),
        }
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_finds_requested_names_only() {
        let root = tempdir().unwrap();
        let a1 = install(root.path(), "p1", "a");
        let a2 = install(root.path(), "p2", "a");
        install(root.path(), "p2", "other");

        let found = scan_candidates_blocking(&options(root.path()), &names(&["a"])).unwrap();
        assert_eq!(found, vec![a1, a2]);
    }

    #[test]
    fn test_finds_scoped_names() {
        let root = tempdir().unwrap();
        let folder = install(root.path(), "p1", "@types/node");

        let found =
            scan_candidates_blocking(&options(root.path()), &names(&["@types/node"])).unwrap();
        assert_eq!(found, vec![folder]);
    }

    #[test]
    fn test_respects_max_depth() {
        let root = tempdir().unwrap();
        install(root.path(), "group/deep", "a");

        let shallow = scan_candidates_blocking(&options(root.path()), &names(&["a"])).unwrap();
        assert!(shallow.is_empty());

        let mut deep = options(root.path());
        deep.max_depth = 3;
        let found = scan_candidates_blocking(&deep, &names(&["a"])).unwrap();
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn test_does_not_descend_into_node_modules() {
        let root = tempdir().unwrap();
        install(root.path(), "p1", "outer/node_modules/a");

        let mut opts = options(root.path());
        opts.max_depth = 6;
        let found = scan_candidates_blocking(&opts, &names(&["a"])).unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn test_skips_hidden_and_excluded() {
        let root = tempdir().unwrap();
        install(root.path(), ".cache", "a");
        install(root.path(), "me", "a");

        let mut opts = options(root.path());
        opts.exclude = vec![root.path().join("me").join("node_modules")];
        let found = scan_candidates_blocking(&opts, &names(&["a"])).unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn test_missing_root_is_fatal() {
        let root = tempdir().unwrap();
        let opts = options(&root.path().join("missing"));
        let err = scan_candidates_blocking(&opts, &names(&["a"])).unwrap_err();
        assert_eq!(err.code(), super::super::error::codes::PKG_SCAN_ROOT_INACCESSIBLE);
    }

    #[cfg(unix)]
    #[test]
    fn test_survives_symlink_loop() {
        let root = tempdir().unwrap();
        let a = install(root.path(), "p1", "a");
        std::os::unix::fs::symlink(root.path(), root.path().join("p1").join("loop")).unwrap();

        let mut opts = options(root.path());
        opts.max_depth = 8;
        let found = scan_candidates_blocking(&opts, &names(&["a"])).unwrap();
        assert!(found.contains(&a));
    }

    #[tokio::test]
    async fn test_async_scan_matches_blocking() {
        let root = tempdir().unwrap();
        let a = install(root.path(), "p1", "a");

        let found = scan_candidates(&options(root.path()), &names(&["a"])).await.unwrap();
        assert_eq!(found, vec![a]);
    }
}
