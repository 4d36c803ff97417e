//! Reuse of locally installed packages.
//!
//! Provides:
//! - Parsing requested names (`name`, `name@version`)
//! - Scanning a search root for existing `node_modules/<name>` installations
//! - Reading and validating candidate manifests
//! - Selecting one candidate per request (latest or exact version)
//! - Writing placeholder packages and executable links into a project
//! - Handing unresolved requests to a remote installer
//! - Recording linked packages in the project's package.json

pub mod deps;
pub mod error;
pub mod events;
pub mod fallback;
pub mod link;
pub mod manifest;
pub mod resolve;
pub mod scan;
pub mod select;
pub mod spec;

pub use deps::{
    is_production, read_project_dependencies, DependencyRecorder, PackageJsonRecorder,
    RecordedDependency,
};
pub use error::{codes as pkg_codes, PkgError};
pub use events::{NoopObserver, Observer, RecordingObserver, ResolveEvent};
pub use fallback::{
    dispatch_fallback, CommandInstaller, InstallOptions, InstallRequest, Installer, SaveTarget,
    DEFAULT_INSTALLER, INSTALLER_ENV,
};
pub use link::{link_candidate, LinkedPackage, PlaceholderManifest, PLACEHOLDER_DESCRIPTION};
pub use manifest::{read_candidate, read_candidates, Candidate, CandidateInvalid};
pub use resolve::{
    find_candidates, resolve_and_link, BatchContext, BatchError, BatchReport, LinkFailure,
};
pub use scan::{scan_candidates, ScanOptions};
pub use select::{group_by_name, resolve_requests, select, CandidateGroups, ResolutionResult};
pub use spec::{parse_requests, PackageSpec};
