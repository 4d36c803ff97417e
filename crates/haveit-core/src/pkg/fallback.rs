//! Hand-off of unresolved requests to a remote installer.
//!
//! The engine decides *what* to install; an [`Installer`] decides *how*.
//! Requests are passed as structured arguments, never as a shell string.

use super::error::PkgError;
use super::events::{Observer, ResolveEvent};
use super::spec::PackageSpec;
use async_trait::async_trait;
use serde::Serialize;
use std::path::PathBuf;
use std::process::Stdio;

/// Default remote installer program.
pub const DEFAULT_INSTALLER: &str = "npm";

/// Environment variable overriding the installer program.
pub const INSTALLER_ENV: &str = "HAVE_NPM";

/// Where the project manifest records newly added packages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SaveTarget {
    Dependencies,
    DevDependencies,
}

impl SaveTarget {
    /// Flag understood by the remote installer.
    #[must_use]
    pub fn flag(self) -> &'static str {
        match self {
            Self::Dependencies => "--save",
            Self::DevDependencies => "--save-dev",
        }
    }

    /// Section of `package.json`.
    #[must_use]
    pub fn section(self) -> &'static str {
        match self {
            Self::Dependencies => "dependencies",
            Self::DevDependencies => "devDependencies",
        }
    }
}

/// Pass-through options of a batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct InstallOptions {
    /// Record as direct dependencies.
    pub save: bool,
    /// Record as development-only dependencies.
    pub save_dev: bool,
}

impl InstallOptions {
    /// Recognize `-S`/`--save` and `-D`/`--save-dev`; ignore anything else.
    #[must_use]
    pub fn from_flags<S: AsRef<str>>(flags: &[S]) -> Self {
        let mut options = Self::default();
        for flag in flags {
            match flag.as_ref() {
                "-S" | "--save" => options.save = true,
                "-D" | "--save-dev" => options.save_dev = true,
                _ => {}
            }
        }
        options
    }

    /// The effective save target. `save` wins when both are set.
    #[must_use]
    pub fn save_target(self) -> Option<SaveTarget> {
        if self.save {
            Some(SaveTarget::Dependencies)
        } else if self.save_dev {
            Some(SaveTarget::DevDependencies)
        } else {
            None
        }
    }
}

/// One call to the remote installer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstallRequest {
    /// `name` or `name@version`, in request order.
    pub packages: Vec<String>,
    /// Option flags, e.g. `--save`.
    pub flags: Vec<String>,
}

impl InstallRequest {
    /// Shape the installer call for the unresolved requests.
    #[must_use]
    pub fn new(missing: &[PackageSpec], options: InstallOptions) -> Self {
        Self {
            packages: missing.iter().map(ToString::to_string).collect(),
            flags: options
                .save_target()
                .map(|target| target.flag().to_string())
                .into_iter()
                .collect(),
        }
    }

    /// Arguments after the program name: `install <flags> <packages>`.
    #[must_use]
    pub fn args(&self) -> Vec<String> {
        std::iter::once("install".to_string())
            .chain(self.flags.iter().cloned())
            .chain(self.packages.iter().cloned())
            .collect()
    }
}

/// Installs packages from a remote registry.
#[async_trait]
pub trait Installer: Send + Sync {
    /// Install the requested packages, or fail.
    async fn install(&self, request: &InstallRequest) -> Result<(), PkgError>;

    /// Human-readable form of the call, echoed before it runs.
    fn describe(&self, request: &InstallRequest) -> String {
        request.args().join(" ")
    }
}

/// Runs an external package manager (`npm` by default) in the project.
#[derive(Debug, Clone)]
pub struct CommandInstaller {
    program: String,
    cwd: PathBuf,
    quiet: bool,
}

impl CommandInstaller {
    #[must_use]
    pub fn new(program: impl Into<String>, cwd: PathBuf) -> Self {
        Self {
            program: program.into(),
            cwd,
            quiet: false,
        }
    }

    /// `$HAVE_NPM` if set, else `npm`.
    #[must_use]
    pub fn from_env(cwd: PathBuf) -> Self {
        let program = std::env::var(INSTALLER_ENV)
            .ok()
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| DEFAULT_INSTALLER.to_string());
        Self::new(program, cwd)
    }

    /// Discard the installer's stdout (keeps machine-readable output clean).
    #[must_use]
    pub fn quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }
}

#[async_trait]
impl Installer for CommandInstaller {
    async fn install(&self, request: &InstallRequest) -> Result<(), PkgError> {
        let stdout = if self.quiet {
            Stdio::null()
        } else {
            Stdio::inherit()
        };

        let status = tokio::process::Command::new(&self.program)
            .args(request.args())
            .current_dir(&self.cwd)
            .stdin(Stdio::null())
            .stdout(stdout)
            .status()
            .await
            .map_err(|e| PkgError::fallback_failed(format!("Failed to run {}: {e}", self.program)))?;

        if status.success() {
            Ok(())
        } else {
            Err(PkgError::fallback_failed(format!(
                "`{}` exited with {status}",
                self.describe(request)
            )))
        }
    }

    fn describe(&self, request: &InstallRequest) -> String {
        format!("{} {}", self.program, request.args().join(" "))
    }
}

/// Delegate the unresolved requests to `installer`.
///
/// No-op when `missing` is empty.
///
/// # Errors
/// Returns the installer's failure.
pub async fn dispatch_fallback(
    missing: &[PackageSpec],
    options: InstallOptions,
    installer: &dyn Installer,
    observer: &dyn Observer,
) -> Result<(), PkgError> {
    if missing.is_empty() {
        return Ok(());
    }

    let request = InstallRequest::new(missing, options);
    observer.on_event(&ResolveEvent::FallbackDispatched {
        command: installer.describe(&request),
    });
    installer.install(&request).await
}
