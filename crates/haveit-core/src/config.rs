use crate::error::Error;
use crate::paths;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default depth of the `node_modules` folders scanned under the root.
///
/// Depth 2 matches `<root>/<project>/node_modules`.
pub const DEFAULT_MAX_DEPTH: usize = 2;

/// Runtime configuration for a have-it batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Project that receives the linked packages.
    pub cwd: PathBuf,

    /// Folder searched for existing installations.
    pub root: PathBuf,

    /// Deepest level (counted from `root`) of a scanned `node_modules` folder.
    pub max_depth: usize,

    /// Whether to emit JSON logs.
    pub json_logs: bool,

    /// Verbosity level (0 = INFO, 1 = DEBUG, 2+ = TRACE).
    pub verbosity: u8,
}

impl Config {
    /// Create a config for `cwd`, searching `root`.
    #[must_use]
    pub fn new(cwd: PathBuf, root: PathBuf) -> Self {
        Self {
            cwd,
            root,
            max_depth: DEFAULT_MAX_DEPTH,
            json_logs: false,
            verbosity: 0,
        }
    }

    /// Create a config for `cwd`, using `--root` if given, else `$HAVE`, else home.
    ///
    /// # Errors
    /// Returns an error if no root can be determined.
    pub fn for_project(cwd: PathBuf, root: Option<&Path>) -> Result<Self, Error> {
        let root = paths::resolve_root(root)?;
        Ok(Self::new(cwd, root))
    }

    /// Set the scan depth.
    ///
    /// # Errors
    /// Returns an error if `depth` is zero.
    pub fn with_max_depth(mut self, depth: usize) -> Result<Self, Error> {
        if depth == 0 {
            return Err(Error::InvalidMaxDepth(depth));
        }
        self.max_depth = depth;
        Ok(self)
    }

    /// Set verbosity level.
    #[must_use]
    pub fn with_verbosity(mut self, verbosity: u8) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Set JSON log output.
    #[must_use]
    pub fn with_json_logs(mut self, json: bool) -> Self {
        self.json_logs = json;
        self
    }

    /// `<cwd>/node_modules`.
    #[must_use]
    pub fn dependency_root(&self) -> PathBuf {
        paths::dependency_root(&self.cwd)
    }

    /// `<cwd>/node_modules/.bin`.
    #[must_use]
    pub fn bin_dir(&self) -> PathBuf {
        paths::bin_dir(&self.cwd)
    }
}
