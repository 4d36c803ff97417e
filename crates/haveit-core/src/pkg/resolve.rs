//! Batch orchestration: scan, read, select, then link and fall back.
//!
//! # Flow
//! 1. Scan the search root for `node_modules/<name>` folders.
//! 2. Read every folder's manifest concurrently; broken folders drop out.
//! 3. Group by name and select one candidate per request.
//! 4. Link the resolved candidates and hand the missing requests to the
//!    installer, concurrently. The batch is done when both have settled.
//! 5. Record linked packages in the project manifest if asked to.

use super::deps::{DependencyRecorder, RecordedDependency};
use super::error::PkgError;
use super::events::{Observer, ResolveEvent};
use super::fallback::{dispatch_fallback, InstallOptions, InstallRequest, Installer, SaveTarget};
use super::link::{link_candidate, LinkedPackage};
use super::manifest::{read_candidates, Candidate, CandidateInvalid};
use super::scan::{scan_candidates, ScanOptions};
use super::select::{group_by_name, resolve_requests, ResolutionResult};
use super::spec::PackageSpec;
use crate::config::Config;
use futures::future::join_all;
use serde::Serialize;
use std::collections::HashSet;

/// Collaborators and options of one batch.
pub struct BatchContext<'a> {
    pub config: &'a Config,
    pub options: InstallOptions,
    pub installer: &'a dyn Installer,
    pub recorder: &'a dyn DependencyRecorder,
    pub observer: &'a dyn Observer,
}

/// A package that could not be linked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkFailure {
    pub name: String,
    pub code: &'static str,
    pub message: String,
}

/// Summary of a finished batch.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    /// Selection outcome; `resolved` and `missing` partition the requests.
    pub resolution: ResolutionResult,
    /// Successfully linked packages, sorted by name.
    pub linked: Vec<LinkedPackage>,
    /// Packages whose linking failed.
    pub link_errors: Vec<LinkFailure>,
    /// The installer call made for `missing`, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback: Option<InstallRequest>,
}

impl BatchReport {
    /// Some resolved package could not be linked.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        !self.link_errors.is_empty()
    }
}

/// A batch that failed, with whatever it had already done.
///
/// Packages in `report.linked` stay on disk after a fallback or record
/// failure.
#[derive(Debug, Clone)]
pub struct BatchError {
    pub error: PkgError,
    pub report: Box<BatchReport>,
}

impl BatchError {
    fn with_report(error: PkgError, report: BatchReport) -> Self {
        Self {
            error,
            report: Box::new(report),
        }
    }

    #[must_use]
    pub fn code(&self) -> &'static str {
        self.error.code()
    }

    #[must_use]
    pub fn message(&self) -> &str {
        self.error.message()
    }
}

impl From<PkgError> for BatchError {
    fn from(error: PkgError) -> Self {
        Self::with_report(error, BatchReport::default())
    }
}

impl std::fmt::Display for BatchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.error)
    }
}

impl std::error::Error for BatchError {}

/// Find and select local candidates for `requests`.
///
/// # Errors
/// Returns `PKG_SCAN_ROOT_INACCESSIBLE` if the search root cannot be listed.
pub async fn find_candidates(
    config: &Config,
    requests: &[PackageSpec],
    observer: &dyn Observer,
) -> Result<ResolutionResult, PkgError> {
    if requests.is_empty() {
        return Ok(ResolutionResult::default());
    }

    let names: Vec<String> = requests.iter().map(|r| r.name.clone()).collect();
    let scan = ScanOptions {
        root: config.root.clone(),
        max_depth: config.max_depth,
        exclude: vec![config.dependency_root()],
    };
    let folders = scan_candidates(&scan, &names).await?;

    let wanted: HashSet<&str> = names.iter().map(String::as_str).collect();
    let mut candidates: Vec<Candidate> = Vec::new();

    for (folder, result) in read_candidates(folders).await {
        let event = match result {
            Ok(candidate) if wanted.contains(candidate.name.as_str()) => {
                let event = ResolveEvent::CandidateFound {
                    name: candidate.name.clone(),
                    version: candidate.version.to_string(),
                    folder,
                };
                candidates.push(candidate);
                event
            }
            Ok(candidate) => ResolveEvent::CandidateSkipped {
                folder,
                reason: CandidateInvalid::NotRequested {
                    name: candidate.name,
                },
            },
            Err(reason) => ResolveEvent::CandidateSkipped { folder, reason },
        };
        observer.on_event(&event);
    }

    Ok(resolve_requests(requests, &group_by_name(candidates)))
}

/// Resolve `requests` locally, link what was found, install the rest.
///
/// Duplicate names are collapsed, first request wins.
///
/// # Errors
/// Fails if the search root cannot be scanned, if the installer fails, or
/// if recording dependencies fails; the error carries the partial report.
/// Link failures do not fail the batch; they are listed in
/// [`BatchReport::link_errors`].
pub async fn resolve_and_link(
    ctx: &BatchContext<'_>,
    requests: &[PackageSpec],
) -> Result<BatchReport, BatchError> {
    let mut seen = HashSet::new();
    let requests: Vec<PackageSpec> = requests
        .iter()
        .filter(|r| seen.insert(r.name.clone()))
        .cloned()
        .collect();

    if requests.is_empty() {
        return Ok(BatchReport::default());
    }

    let resolution = find_candidates(ctx.config, &requests, ctx.observer).await?;

    if !resolution.missing.is_empty() {
        ctx.observer.on_event(&ResolveEvent::NamesMissing {
            names: resolution.missing_names(),
        });
    }

    let project = &ctx.config.cwd;
    let linking = join_all(resolution.resolved.values().map(|candidate| async move {
        let result = link_candidate(project, candidate).await;
        let event = match &result {
            Ok(linked) => ResolveEvent::PackageLinked {
                name: linked.name.clone(),
                version: linked.version.clone(),
                main: linked.main.clone(),
            },
            Err(e) => ResolveEvent::LinkFailed {
                name: candidate.name.clone(),
                message: e.to_string(),
            },
        };
        ctx.observer.on_event(&event);
        (candidate.name.clone(), result)
    }));
    let fallback = dispatch_fallback(
        &resolution.missing,
        ctx.options,
        ctx.installer,
        ctx.observer,
    );

    let (link_results, fallback_result) = tokio::join!(linking, fallback);

    let mut report = BatchReport {
        fallback: (!resolution.missing.is_empty())
            .then(|| InstallRequest::new(&resolution.missing, ctx.options)),
        resolution,
        ..BatchReport::default()
    };
    for (name, result) in link_results {
        match result {
            Ok(linked) => report.linked.push(linked),
            Err(e) => report.link_errors.push(LinkFailure {
                name,
                code: e.code(),
                message: e.message().to_string(),
            }),
        }
    }

    if let Err(e) = fallback_result {
        return Err(BatchError::with_report(e, report));
    }

    if let Some(target) = ctx.options.save_target() {
        let deps: Vec<RecordedDependency> = report
            .linked
            .iter()
            .map(|l| RecordedDependency {
                name: l.name.clone(),
                version: l.version.clone(),
            })
            .collect();
        if !deps.is_empty() {
            if let Err(e) = ctx.recorder.record(&deps, target) {
                return Err(BatchError::with_report(e, report));
            }
            ctx.observer.on_event(&ResolveEvent::DependenciesRecorded {
                names: deps.into_iter().map(|d| d.name).collect(),
                dev: target == SaveTarget::DevDependencies,
            });
        }
    }

    Ok(report)
}
