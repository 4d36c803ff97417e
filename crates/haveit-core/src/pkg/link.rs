//! Placeholder packages in a project's `node_modules`.
//!
//! Instead of copying an installation, the linker writes a tiny package
//! whose `main` points at the candidate's real entry point, and symlinks the
//! candidate's executables into `node_modules/.bin`. The candidate's own
//! folder is only ever read.

use super::error::PkgError;
use super::manifest::{is_plain_alias, Candidate};
use crate::paths::{self, MANIFEST_FILE};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::fs;

/// Suffix source for temporary link names within this process.
static TEMP_LINK_COUNTER: AtomicU64 = AtomicU64::new(0);

/// `description` of every placeholder manifest.
pub const PLACEHOLDER_DESCRIPTION: &str =
    "placeholder created by have-it pointing at an existing installation";

/// The manifest written into a placeholder package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlaceholderManifest {
    pub name: String,
    pub main: String,
    pub version: String,
    pub description: String,
}

impl PlaceholderManifest {
    #[must_use]
    pub fn for_candidate(candidate: &Candidate) -> Self {
        Self {
            name: candidate.name.clone(),
            main: candidate.entry_point.to_string_lossy().into_owned(),
            version: candidate.version.to_string(),
            description: PLACEHOLDER_DESCRIPTION.to_string(),
        }
    }

    /// Serialized form: pretty JSON with a trailing newline.
    ///
    /// # Errors
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        let mut text = serde_json::to_string_pretty(self)?;
        text.push('\n');
        Ok(text)
    }
}

/// What the linker left on disk for one candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkedPackage {
    pub name: String,
    pub version: String,
    /// `<project>/node_modules/<name>`.
    pub directory: PathBuf,
    /// The candidate's real entry point.
    pub main: PathBuf,
    /// Alias name to the link created for it in `node_modules/.bin`.
    pub executables: BTreeMap<String, PathBuf>,
}

/// Write (or rewrite) the placeholder package for `candidate` into `project`.
///
/// Safe to repeat: an existing directory, file, or link at the package path
/// or at an alias path is replaced.
///
/// # Errors
/// Returns `PKG_LINK_FAILED` if a directory, file, or link cannot be written.
pub async fn link_candidate(project: &Path, candidate: &Candidate) -> Result<LinkedPackage, PkgError> {
    let directory = paths::dependency_root(project).join(&candidate.name);

    remove_existing(&directory).await?;
    fs::create_dir_all(&directory).await.map_err(|e| {
        PkgError::link_failed(format!("Failed to create {}: {e}", directory.display()))
    })?;

    let manifest = PlaceholderManifest::for_candidate(candidate)
        .to_json()
        .map_err(|e| PkgError::link_failed(format!("Failed to serialize manifest: {e}")))?;
    let manifest_path = directory.join(MANIFEST_FILE);
    fs::write(&manifest_path, manifest)
        .await
        .map_err(|e| {
            PkgError::link_failed(format!("Failed to write {}: {e}", manifest_path.display()))
        })?;

    let mut executables = BTreeMap::new();
    if !candidate.executable_aliases.is_empty() {
        let bin_dir = paths::bin_dir(project);
        fs::create_dir_all(&bin_dir).await.map_err(|e| {
            PkgError::link_failed(format!("Failed to create {}: {e}", bin_dir.display()))
        })?;

        for (alias, target) in &candidate.executable_aliases {
            // Only a single entry inside `.bin` may ever be replaced.
            if !is_plain_alias(alias) {
                continue;
            }
            let link_path = bin_dir.join(alias);
            replace_with_link(target, &link_path).await?;
            executables.insert(alias.clone(), link_path);
        }
    }

    Ok(LinkedPackage {
        name: candidate.name.clone(),
        version: candidate.version.to_string(),
        directory,
        main: candidate.entry_point.clone(),
        executables,
    })
}

/// Remove whatever sits at `path`: a link, a file, or a directory tree.
///
/// A link is removed itself, never followed.
async fn remove_existing(path: &Path) -> Result<(), PkgError> {
    let Ok(metadata) = fs::symlink_metadata(path).await else {
        return Ok(());
    };

    let result = if metadata.file_type().is_symlink() {
        // Directory symlinks and junctions on Windows need remove_dir.
        match fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(_) => fs::remove_dir(path).await,
        }
    } else if metadata.is_dir() {
        fs::remove_dir_all(path).await
    } else {
        fs::remove_file(path).await
    };

    result.map_err(|e| {
        PkgError::link_failed(format!("Failed to remove existing {}: {e}", path.display()))
    })
}

/// Point `link` at `target`, replacing whatever is there.
///
/// The link is built under a unique sibling name and renamed into place, so
/// packages linking the same alias concurrently both succeed; the last
/// rename wins.
async fn replace_with_link(target: &Path, link: &Path) -> Result<(), PkgError> {
    // rename cannot replace a real directory.
    if let Ok(metadata) = fs::symlink_metadata(link).await {
        if metadata.is_dir() {
            remove_existing(link).await?;
        }
    }

    let temp = temp_link_path(link);
    remove_existing(&temp).await?;
    create_file_link(target, &temp).await?;

    if let Err(e) = fs::rename(&temp, link).await {
        let _ = fs::remove_file(&temp).await;
        return Err(PkgError::link_failed(format!(
            "Failed to move link into place at {}: {e}",
            link.display()
        )));
    }
    Ok(())
}

fn temp_link_path(link: &Path) -> PathBuf {
    let name = link
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let n = TEMP_LINK_COUNTER.fetch_add(1, Ordering::Relaxed);
    link.with_file_name(format!(".{name}.have-it.{}.{n}", std::process::id()))
}

/// Create a symlink at `link` pointing at the file `target`.
async fn create_file_link(target: &Path, link: &Path) -> Result<(), PkgError> {
    #[cfg(unix)]
    let result = fs::symlink(target, link).await;

    #[cfg(windows)]
    let result = fs::symlink_file(target, link).await;

    #[cfg(not(any(unix, windows)))]
    let result: std::io::Result<()> = Err(std::io::Error::new(
        std::io::ErrorKind::Unsupported,
        "symbolic links are not supported on this platform",
    ));

    result.map_err(|e| {
        PkgError::link_failed(format!(
            "Failed to create symlink from {} to {}: {e}",
            link.display(),
            target.display()
        ))
    })
}
