//! The default action: provide packages from installations already on disk,
//! hand the rest to the remote installer.

use haveit_core::pkg::{
    is_production, parse_requests, read_project_dependencies, resolve_and_link, BatchContext,
    BatchError, BatchReport, CommandInstaller, InstallOptions, InstallRequest, LinkFailure, Observer,
    PackageJsonRecorder, PkgError, ResolveEvent,
};
use haveit_core::Config;
use miette::Result;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Error code for configuration problems found before the batch starts.
const CONFIG_INVALID: &str = "CONFIG_INVALID";

/// Error code for a runtime that could not be started.
const RUNTIME_FAILED: &str = "RUNTIME_FAILED";

/// Parsed command-line arguments of the default action.
#[derive(Debug)]
pub struct Args {
    pub names: Vec<String>,
    pub save: bool,
    pub save_dev: bool,
    pub root: Option<PathBuf>,
    pub max_depth: usize,
    pub verbosity: u8,
}

/// A failure that ends the batch.
#[derive(Debug)]
enum Failure {
    Config(haveit_core::Error),
    Runtime(std::io::Error),
    Pkg(PkgError),
    /// The batch started; linked packages are kept on disk.
    Batch(BatchError),
}

impl Failure {
    fn code(&self) -> &'static str {
        match self {
            Self::Config(_) => CONFIG_INVALID,
            Self::Runtime(_) => RUNTIME_FAILED,
            Self::Pkg(e) => e.code(),
            Self::Batch(e) => e.code(),
        }
    }

    fn message(&self) -> String {
        match self {
            Self::Config(e) => e.to_string(),
            Self::Runtime(e) => format!("Failed to start async runtime: {e}"),
            Self::Pkg(e) => e.message().to_string(),
            Self::Batch(e) => e.message().to_string(),
        }
    }

    /// Work done before the failure, if the batch got that far.
    fn report(&self) -> Option<&BatchReport> {
        match self {
            Self::Batch(e) => Some(e.report.as_ref()),
            _ => None,
        }
    }
}

impl From<haveit_core::Error> for Failure {
    fn from(e: haveit_core::Error) -> Self {
        Self::Config(e)
    }
}

impl From<PkgError> for Failure {
    fn from(e: PkgError) -> Self {
        Self::Pkg(e)
    }
}

impl From<BatchError> for Failure {
    fn from(e: BatchError) -> Self {
        Self::Batch(e)
    }
}

/// JSON output of a batch.
#[derive(Serialize)]
struct HaveResult<'a> {
    ok: bool,
    resolved: Vec<ResolvedJson<'a>>,
    missing: Vec<String>,
    link_errors: &'a [LinkFailure],
    #[serde(skip_serializing_if = "Option::is_none")]
    fallback: Option<&'a InstallRequest>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<ErrorJson>,
}

#[derive(Serialize)]
struct ResolvedJson<'a> {
    name: &'a str,
    version: String,
    folder: &'a Path,
    /// Placeholder directory, absent when linking failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    directory: Option<&'a Path>,
}

#[derive(Serialize)]
struct ErrorJson {
    code: &'static str,
    message: String,
}

/// Turns batch events into console lines and log records.
///
/// In JSON mode stdout belongs to the final result, so only logs are written.
struct ConsoleObserver {
    json: bool,
}

impl Observer for ConsoleObserver {
    fn on_event(&self, event: &ResolveEvent) {
        match event {
            ResolveEvent::CandidateFound {
                name,
                version,
                folder,
            } => {
                debug!(name = %name, version = %version, folder = %folder.display(), "candidate found");
            }
            ResolveEvent::CandidateSkipped { folder, reason } => {
                debug!(folder = %folder.display(), reason = %reason, "skipping folder");
            }
            ResolveEvent::NamesMissing { names } => {
                info!(count = names.len(), "not found locally");
                if !self.json {
                    println!(
                        "You do not have {} module(s): {}",
                        names.len(),
                        names.join(", ")
                    );
                }
            }
            ResolveEvent::PackageLinked {
                name,
                version,
                main,
            } => {
                debug!(name = %name, main = %main.display(), "linked");
                if !self.json {
                    println!("have {name}@{version}");
                }
            }
            ResolveEvent::LinkFailed { name, message } => {
                warn!(name = %name, "{message}");
                if !self.json {
                    eprintln!("! {name}: {message}");
                }
            }
            ResolveEvent::FallbackDispatched { command } => {
                info!(command = %command, "installing missing packages");
                if !self.json {
                    println!("{command}");
                }
            }
            ResolveEvent::DependenciesRecorded { names, dev } => {
                let section = if *dev {
                    "devDependencies"
                } else {
                    "dependencies"
                };
                info!(count = names.len(), section, "recorded in package.json");
                if !self.json {
                    println!("saved {} to {section}", names.join(", "));
                }
            }
        }
    }
}

pub fn run(cwd: PathBuf, args: Args, json: bool) -> Result<()> {
    info!(cwd = %cwd.display(), "have invoked");

    match execute(cwd, &args, json) {
        Ok(report) => {
            if json {
                print_json(&report_json(&report, None));
            }
            Ok(())
        }
        Err(failure) => {
            let code = failure.code();
            let message = failure.message();
            if json {
                let error = ErrorJson { code, message };
                let empty = BatchReport::default();
                let report = failure.report().unwrap_or(&empty);
                print_json(&report_json(report, Some(error)));
            } else {
                eprintln!("error: {code}: {message}");
            }
            std::process::exit(1);
        }
    }
}

fn execute(cwd: PathBuf, args: &Args, json: bool) -> std::result::Result<BatchReport, Failure> {
    let config = Config::for_project(cwd, args.root.as_deref())?
        .with_max_depth(args.max_depth)?
        .with_verbosity(args.verbosity)
        .with_json_logs(json);

    let names = if args.names.is_empty() {
        let include_dev = !is_production();
        let names = read_project_dependencies(&config.cwd, include_dev)?;
        debug!(count = names.len(), include_dev, "requests taken from package.json");
        names
    } else {
        args.names.clone()
    };
    let requests = parse_requests(names.as_slice())?;

    debug!(
        root = %config.root.display(),
        max_depth = config.max_depth,
        requests = requests.len(),
        "starting batch"
    );

    let installer = CommandInstaller::from_env(config.cwd.clone()).quiet(json);
    let recorder = PackageJsonRecorder::new(&config.cwd);
    let observer = ConsoleObserver { json };
    let ctx = BatchContext {
        config: &config,
        options: InstallOptions {
            save: args.save,
            save_dev: args.save_dev,
        },
        installer: &installer,
        recorder: &recorder,
        observer: &observer,
    };

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(Failure::Runtime)?;
    let report = rt.block_on(resolve_and_link(&ctx, &requests))?;

    if report.is_degraded() {
        warn!(
            failed = report.link_errors.len(),
            "some packages could not be linked"
        );
    }
    Ok(report)
}

fn report_json(report: &BatchReport, error: Option<ErrorJson>) -> HaveResult<'_> {
    let resolved = report
        .resolution
        .resolved
        .values()
        .map(|candidate| ResolvedJson {
            name: &candidate.name,
            version: candidate.version.to_string(),
            folder: &candidate.folder,
            directory: report
                .linked
                .iter()
                .find(|l| l.name == candidate.name)
                .map(|l| l.directory.as_path()),
        })
        .collect();

    HaveResult {
        ok: error.is_none(),
        resolved,
        missing: report
            .resolution
            .missing
            .iter()
            .map(ToString::to_string)
            .collect(),
        link_errors: &report.link_errors,
        fallback: report.fallback.as_ref(),
        error,
    }
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{text}"),
        Err(e) => eprintln!("error: failed to serialize result: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use haveit_core::pkg::{Candidate, LinkedPackage, PackageSpec, ResolutionResult};
    use std::collections::BTreeMap;

    fn candidate(name: &str) -> Candidate {
        let folder = PathBuf::from("/r/p/node_modules").join(name);
        Candidate {
            manifest_path: folder.join("package.json"),
            entry_point: folder.join("index.js"),
            folder,
            name: name.to_string(),
            version: "1.2.3".parse().unwrap(),
            executable_aliases: BTreeMap::new(),
        }
    }

    fn report() -> BatchReport {
        let mut resolution = ResolutionResult::default();
        for name in ["a", "b"] {
            resolution.resolved.insert(name.to_string(), candidate(name));
        }
        resolution.missing.push(PackageSpec::parse("c@2.0.0").unwrap());

        let a: &Candidate = &resolution.resolved["a"];
        let linked = vec![LinkedPackage {
            name: "a".to_string(),
            version: a.version.to_string(),
            directory: PathBuf::from("/p/node_modules/a"),
            main: a.entry_point.clone(),
            executables: BTreeMap::new(),
        }];

        BatchReport {
            resolution,
            linked,
            link_errors: vec![LinkFailure {
                name: "b".to_string(),
                code: haveit_core::pkg::pkg_codes::PKG_LINK_FAILED,
                message: "permission denied".to_string(),
            }],
            fallback: None,
        }
    }

    #[test]
    fn test_report_json_shape() {
        let report = report();
        let json = serde_json::to_value(report_json(&report, None)).unwrap();

        assert_eq!(json["ok"], true);
        assert_eq!(json["resolved"][0]["name"], "a");
        assert_eq!(json["resolved"][0]["version"], "1.2.3");
        assert_eq!(json["resolved"][0]["directory"], "/p/node_modules/a");
        assert!(json["resolved"][1].get("directory").is_none());
        assert_eq!(json["missing"], serde_json::json!(["c@2.0.0"]));
        assert_eq!(json["link_errors"][0]["code"], "PKG_LINK_FAILED");
        assert!(json.get("error").is_none());
    }

    #[test]
    fn test_error_json_is_not_ok() {
        let report = BatchReport::default();
        let error = ErrorJson {
            code: CONFIG_INVALID,
            message: "bad".to_string(),
        };
        let json = serde_json::to_value(report_json(&report, Some(error))).unwrap();

        assert_eq!(json["ok"], false);
        assert_eq!(json["error"]["code"], CONFIG_INVALID);
        assert_eq!(json["resolved"], serde_json::json!([]));
    }

    #[test]
    fn test_batch_failure_keeps_partial_report() {
        let failure = Failure::from(BatchError {
            error: PkgError::fallback_failed("npm exited with 1"),
            report: Box::new(report()),
        });
        assert_eq!(failure.code(), "PKG_FALLBACK_FAILED");

        let error = ErrorJson {
            code: failure.code(),
            message: failure.message(),
        };
        let json = serde_json::to_value(report_json(failure.report().unwrap(), Some(error))).unwrap();

        assert_eq!(json["ok"], false);
        assert_eq!(json["error"]["code"], "PKG_FALLBACK_FAILED");
        assert_eq!(json["resolved"][0]["name"], "a");
        assert_eq!(json["resolved"][0]["directory"], "/p/node_modules/a");
        assert_eq!(json["missing"], serde_json::json!(["c@2.0.0"]));
    }

    #[test]
    fn test_failure_codes() {
        let config = Failure::from(haveit_core::Error::InvalidMaxDepth(0));
        assert_eq!(config.code(), CONFIG_INVALID);

        let pkg = Failure::from(PkgError::spec_invalid("bad name"));
        assert_eq!(pkg.code(), "PKG_SPEC_INVALID");
        assert_eq!(pkg.message(), "bad name");
    }
}
