//! Candidate manifest reading.
//!
//! Turns one scanned folder into a validated [`Candidate`], or explains why
//! the folder is not usable. A broken folder is never an error for the
//! batch; it simply does not take part in selection.

use super::link::PLACEHOLDER_DESCRIPTION;
use super::spec::unscoped;
use crate::paths::MANIFEST_FILE;
use futures::stream::{self, StreamExt};
use semver::Version;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fmt;
use std::path::{Component, Path, PathBuf};

/// Maximum number of manifests read at the same time.
pub const MAX_CONCURRENT_READS: usize = 32;

/// Entry point used when a manifest has no `main`.
const DEFAULT_MAIN: &str = "index.js";

/// A discovered, validated local installation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Candidate {
    /// Installation folder.
    pub folder: PathBuf,
    /// `<folder>/package.json`.
    pub manifest_path: PathBuf,
    /// Package name as declared by the manifest.
    pub name: String,
    /// Declared version.
    pub version: Version,
    /// Absolute path of the main module; existed when the candidate was read.
    pub entry_point: PathBuf,
    /// Executable alias name to absolute target.
    pub executable_aliases: BTreeMap<String, PathBuf>,
}

/// Why a scanned folder did not become a [`Candidate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CandidateInvalid {
    ManifestUnreadable { message: String },
    ManifestMalformed { message: String },
    MissingName,
    MissingVersion,
    InvalidVersion { version: String },
    EntryPointMissing { path: PathBuf },
    /// A placeholder written by a previous run, not a real installation.
    Placeholder,
    /// The manifest declares a name nobody asked for.
    NotRequested { name: String },
}

impl fmt::Display for CandidateInvalid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ManifestUnreadable { message } => write!(f, "cannot read manifest: {message}"),
            Self::ManifestMalformed { message } => write!(f, "malformed manifest: {message}"),
            Self::MissingName => f.write_str("manifest has no name"),
            Self::MissingVersion => f.write_str("manifest has no version"),
            Self::InvalidVersion { version } => write!(f, "invalid version '{version}'"),
            Self::EntryPointMissing { path } => {
                write!(f, "cannot find main file {}", path.display())
            }
            Self::Placeholder => f.write_str("placeholder package"),
            Self::NotRequested { name } => write!(f, "declares unrequested name '{name}'"),
        }
    }
}

/// The manifest fields the engine cares about.
#[derive(Debug, Default, Deserialize)]
struct RawManifest {
    name: Option<String>,
    version: Option<String>,
    main: Option<String>,
    description: Option<String>,
    bin: Option<Value>,
}

/// Read and validate the manifest in `folder`.
///
/// # Errors
/// Returns the reason the folder is not a usable candidate.
pub async fn read_candidate(folder: &Path) -> Result<Candidate, CandidateInvalid> {
    let manifest_path = folder.join(MANIFEST_FILE);
    let bytes = tokio::fs::read(&manifest_path)
        .await
        .map_err(|e| CandidateInvalid::ManifestUnreadable {
            message: e.to_string(),
        })?;
    // A stray byte in a description must not hide the installation.
    let text = String::from_utf8_lossy(&bytes);
    let raw: RawManifest =
        serde_json::from_str(&text).map_err(|e| CandidateInvalid::ManifestMalformed {
            message: e.to_string(),
        })?;

    if raw.description.as_deref() == Some(PLACEHOLDER_DESCRIPTION) {
        return Err(CandidateInvalid::Placeholder);
    }

    let name = raw
        .name
        .filter(|n| !n.is_empty())
        .ok_or(CandidateInvalid::MissingName)?;
    let version_str = raw.version.ok_or(CandidateInvalid::MissingVersion)?;
    let version = Version::parse(version_str.trim()).map_err(|_| {
        CandidateInvalid::InvalidVersion {
            version: version_str.clone(),
        }
    })?;

    let entry_point = resolve_entry_point(folder, raw.main.as_deref()).await?;
    let executable_aliases = alias_table(folder, &name, raw.bin.as_ref());

    Ok(Candidate {
        folder: folder.to_path_buf(),
        manifest_path,
        name,
        version,
        entry_point,
        executable_aliases,
    })
}

/// Read every folder concurrently, in no particular order.
///
/// Each result is paired with the folder it came from.
pub async fn read_candidates(
    folders: Vec<PathBuf>,
) -> Vec<(PathBuf, Result<Candidate, CandidateInvalid>)> {
    stream::iter(folders)
        .map(|folder| async move {
            let result = read_candidate(&folder).await;
            (folder, result)
        })
        .buffer_unordered(MAX_CONCURRENT_READS)
        .collect()
        .await
}

/// Find the main module: the declared path as-is, then with `.js` appended.
async fn resolve_entry_point(folder: &Path, main: Option<&str>) -> Result<PathBuf, CandidateInvalid> {
    let main = main.map(str::trim).filter(|m| !m.is_empty()).unwrap_or(DEFAULT_MAIN);
    let main = if main.ends_with("index") {
        format!("{main}.js")
    } else {
        main.to_string()
    };

    let literal = join_clean(folder, &main);
    if is_file(&literal).await {
        return Ok(literal);
    }

    let mut suffixed = OsString::from(literal.as_os_str());
    suffixed.push(".js");
    let suffixed = PathBuf::from(suffixed);
    if is_file(&suffixed).await {
        return Ok(suffixed);
    }

    Err(CandidateInvalid::EntryPointMissing { path: suffixed })
}

async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false)
}

/// Executable aliases from the `bin` field.
///
/// A string names one executable called after the package; an object maps
/// alias names to paths. Non-string entries are ignored.
fn alias_table(folder: &Path, name: &str, bin: Option<&Value>) -> BTreeMap<String, PathBuf> {
    let mut aliases = BTreeMap::new();
    match bin {
        Some(Value::String(target)) if !target.is_empty() && is_plain_alias(unscoped(name)) => {
            aliases.insert(unscoped(name).to_string(), join_clean(folder, target));
        }
        Some(Value::Object(table)) => {
            for (alias, target) in table {
                let Some(target) = target.as_str().filter(|t| !t.is_empty()) else {
                    continue;
                };
                if !is_plain_alias(alias) {
                    continue;
                }
                aliases.insert(alias.clone(), join_clean(folder, target));
            }
        }
        _ => {}
    }
    aliases
}

/// An alias must name exactly one entry inside `.bin`: one normal path
/// component, no separators, not `.` or `..`.
pub(crate) fn is_plain_alias(alias: &str) -> bool {
    if alias.contains(['/', '\\']) {
        return false;
    }
    let mut components = Path::new(alias).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

/// Join a manifest-relative path onto `folder`, dropping `.` segments.
///
/// Absolute paths are returned unchanged.
fn join_clean(folder: &Path, relative: &str) -> PathBuf {
    let relative = Path::new(relative);
    if relative.is_absolute() {
        return relative.to_path_buf();
    }
    relative
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .fold(folder.to_path_buf(), |acc, c| acc.join(c))
}
