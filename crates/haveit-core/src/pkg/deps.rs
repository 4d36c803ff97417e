//! Project manifest access.
//!
//! Reads the names a project depends on, and records linked packages back
//! into its `package.json`.

use super::error::PkgError;
use super::fallback::SaveTarget;
use crate::paths::MANIFEST_FILE;
use haveit_util::fs::{atomic_write, read_to_string_lossy};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

/// Environment variable that, set to `production`, skips devDependencies.
pub const NODE_ENV: &str = "NODE_ENV";

/// A `{name, version}` pair to record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedDependency {
    pub name: String,
    pub version: String,
}

/// Records packages in a project manifest.
pub trait DependencyRecorder: Send + Sync {
    /// Add `deps` to the `target` section.
    fn record(&self, deps: &[RecordedDependency], target: SaveTarget) -> Result<(), PkgError>;
}

/// Writes `"<name>": "^<version>"` entries into `<project>/package.json`.
#[derive(Debug, Clone)]
pub struct PackageJsonRecorder {
    manifest_path: PathBuf,
}

impl PackageJsonRecorder {
    #[must_use]
    pub fn new(project: &Path) -> Self {
        Self {
            manifest_path: project.join(MANIFEST_FILE),
        }
    }
}

impl DependencyRecorder for PackageJsonRecorder {
    fn record(&self, deps: &[RecordedDependency], target: SaveTarget) -> Result<(), PkgError> {
        if deps.is_empty() {
            return Ok(());
        }

        let mut root = load_manifest(&self.manifest_path)?;
        let section = root
            .entry(target.section())
            .or_insert_with(|| Value::Object(Map::new()));
        let Some(section) = section.as_object_mut() else {
            return Err(PkgError::package_json_invalid(format!(
                "'{}' must be an object",
                target.section()
            )));
        };

        for dep in deps {
            section.insert(dep.name.clone(), Value::String(format!("^{}", dep.version)));
        }

        let mut text = serde_json::to_string_pretty(&Value::Object(root))
            .map_err(|e| PkgError::record_failed(format!("Failed to serialize package.json: {e}")))?;
        text.push('\n');
        atomic_write(&self.manifest_path, text.as_bytes()).map_err(|e| {
            PkgError::record_failed(format!(
                "Failed to write {}: {e}",
                self.manifest_path.display()
            ))
        })
    }
}

/// Names a project depends on: `dependencies`, plus `devDependencies`
/// when `include_dev` is set. Sorted, without duplicates.
///
/// # Errors
/// Returns an error if the manifest is missing or not a JSON object, or a
/// section is not an object.
pub fn read_project_dependencies(project: &Path, include_dev: bool) -> Result<Vec<String>, PkgError> {
    let root = load_manifest(&project.join(MANIFEST_FILE))?;

    let mut sections = vec!["dependencies"];
    if include_dev {
        sections.push("devDependencies");
    }

    let mut names = Vec::new();
    for section in sections {
        match root.get(section) {
            None => {}
            Some(Value::Object(deps)) => names.extend(deps.keys().cloned()),
            Some(_) => {
                return Err(PkgError::package_json_invalid(format!(
                    "'{section}' must be an object"
                )))
            }
        }
    }

    names.sort();
    names.dedup();
    Ok(names)
}

/// Whether devDependencies should be skipped (`NODE_ENV=production`).
#[must_use]
pub fn is_production() -> bool {
    std::env::var(NODE_ENV).is_ok_and(|v| v == "production")
}

fn load_manifest(path: &Path) -> Result<Map<String, Value>, PkgError> {
    if !path.exists() {
        return Err(PkgError::package_json_not_found(path));
    }
    let text = read_to_string_lossy(path)
        .map_err(|e| PkgError::package_json_invalid(format!("Failed to read: {e}")))?;
    match serde_json::from_str(&text) {
        Ok(Value::Object(root)) => Ok(root),
        Ok(_) => Err(PkgError::package_json_invalid(
            "package.json must be a JSON object",
        )),
        Err(e) => Err(PkgError::package_json_invalid(format!("Invalid JSON: {e}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pkg::error::codes;
    use serial_test::serial;
    use std::fs;
    use tempfile::tempdir;

    fn dep(name: &str, version: &str) -> RecordedDependency {
        RecordedDependency {
            name: name.to_string(),
            version: version.to_string(),
        }
    }

    #[test]
    fn test_read_dependencies_with_dev() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("package.json"),
            r#"{"dependencies": {"b": "^1", "a": "2"}, "devDependencies": {"c": "*", "a": "1"}}"#,
        )
        .unwrap();

        assert_eq!(read_project_dependencies(dir.path(), false).unwrap(), vec!["a", "b"]);
        assert_eq!(
            read_project_dependencies(dir.path(), true).unwrap(),
            vec!["a", "b", "c"]
        );
    }

    #[test]
    fn test_read_dependencies_errors() {
        let dir = tempdir().unwrap();
        let err = read_project_dependencies(dir.path(), true).unwrap_err();
        assert_eq!(err.code(), codes::PKG_PACKAGE_JSON_NOT_FOUND);

        fs::write(dir.path().join("package.json"), "[]").unwrap();
        let err = read_project_dependencies(dir.path(), true).unwrap_err();
        assert_eq!(err.code(), codes::PKG_PACKAGE_JSON_INVALID);

        fs::write(dir.path().join("package.json"), r#"{"dependencies": []}"#).unwrap();
        let err = read_project_dependencies(dir.path(), true).unwrap_err();
        assert_eq!(err.code(), codes::PKG_PACKAGE_JSON_INVALID);
    }

    #[test]
    fn test_record_into_existing_section() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("package.json"),
            r#"{"name": "app", "dependencies": {"old": "^0.1.0"}}"#,
        )
        .unwrap();

        PackageJsonRecorder::new(dir.path())
            .record(&[dep("a", "1.2.0")], SaveTarget::Dependencies)
            .unwrap();

        let text = fs::read_to_string(dir.path().join("package.json")).unwrap();
        assert!(text.ends_with('\n'));
        let json: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(json["name"], "app");
        assert_eq!(json["dependencies"]["old"], "^0.1.0");
        assert_eq!(json["dependencies"]["a"], "^1.2.0");
    }

    #[test]
    fn test_record_creates_dev_section() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("package.json"), r#"{"name": "app"}"#).unwrap();

        PackageJsonRecorder::new(dir.path())
            .record(&[dep("a", "1.0.0")], SaveTarget::DevDependencies)
            .unwrap();

        let json: Value =
            serde_json::from_str(&fs::read_to_string(dir.path().join("package.json")).unwrap())
                .unwrap();
        assert_eq!(json["devDependencies"]["a"], "^1.0.0");
        assert!(json.get("dependencies").is_none());
    }

    #[test]
    fn test_record_nothing_leaves_file_alone() {
        let dir = tempdir().unwrap();
        PackageJsonRecorder::new(dir.path())
            .record(&[], SaveTarget::Dependencies)
            .unwrap();
        assert!(!dir.path().join("package.json").exists());
    }

    #[test]
    #[serial]
    fn test_is_production() {
        std::env::set_var(NODE_ENV, "production");
        assert!(is_production());
        std::env::set_var(NODE_ENV, "development");
        assert!(!is_production());
        std::env::remove_var(NODE_ENV);
        assert!(!is_production());
    }
}
