//! Version selection among local candidates.
//!
//! Pure functions: no filesystem access, no suspension points.
//!
//! # Rules
//! - No version requested: the highest semantic version wins.
//! - Version requested: only a candidate with exactly that version matches.
//!   Ranges and tags never match locally and fall through to the installer.
//! - Equal versions in different folders: the lexicographically smallest
//!   folder path wins, so repeated runs pick the same installation.

use super::manifest::Candidate;
use super::spec::PackageSpec;
use semver::Version;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

/// All candidates sharing a name, keyed by that name.
pub type CandidateGroups = HashMap<String, Vec<Candidate>>;

/// Outcome of selection for a batch of requests.
///
/// Every request lands in exactly one of `resolved` or `missing`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResolutionResult {
    /// Selected candidate per requested name.
    pub resolved: BTreeMap<String, Candidate>,
    /// Requests with no matching candidate, in request order.
    pub missing: Vec<PackageSpec>,
}

impl ResolutionResult {
    /// Names of the unresolved requests.
    #[must_use]
    pub fn missing_names(&self) -> Vec<String> {
        self.missing.iter().map(|s| s.name.clone()).collect()
    }
}

/// Group candidates by declared name.
#[must_use]
pub fn group_by_name(candidates: Vec<Candidate>) -> CandidateGroups {
    let mut groups = CandidateGroups::new();
    for candidate in candidates {
        groups
            .entry(candidate.name.clone())
            .or_default()
            .push(candidate);
    }
    groups
}

/// Preference order: higher version first, then smaller folder path.
fn preference(a: &Candidate, b: &Candidate) -> Ordering {
    b.version
        .cmp(&a.version)
        .then_with(|| a.folder.cmp(&b.folder))
}

/// Pick the candidate for one request, or `None` if nothing matches.
#[must_use]
pub fn select<'a>(request: &PackageSpec, group: &'a [Candidate]) -> Option<&'a Candidate> {
    match request.version.as_deref() {
        None => group.iter().min_by(|a, b| preference(a, b)),
        Some(wanted) => {
            let wanted = Version::parse(wanted).ok()?;
            group
                .iter()
                .filter(|c| c.version == wanted)
                .min_by(|a, b| preference(a, b))
        }
    }
}

/// Select a candidate for every request.
#[must_use]
pub fn resolve_requests(requests: &[PackageSpec], groups: &CandidateGroups) -> ResolutionResult {
    let mut result = ResolutionResult::default();
    for request in requests {
        let group = groups.get(&request.name).map_or(&[][..], Vec::as_slice);
        match select(request, group) {
            Some(candidate) => {
                result
                    .resolved
                    .insert(request.name.clone(), candidate.clone());
            }
            None => result.missing.push(request.clone()),
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn candidate(name: &str, version: &str, folder: &str) -> Candidate {
        let folder = PathBuf::from(folder);
        Candidate {
            manifest_path: folder.join("package.json"),
            entry_point: folder.join("index.js"),
            folder,
            name: name.to_string(),
            version: Version::parse(version).unwrap(),
            executable_aliases: BTreeMap::new(),
        }
    }

    fn group() -> Vec<Candidate> {
        vec![
            candidate("a", "1.0.0", "/r/p1/node_modules/a"),
            candidate("a", "1.2.0", "/r/p2/node_modules/a"),
            candidate("a", "1.1.0", "/r/p3/node_modules/a"),
        ]
    }

    #[test]
    fn test_bare_request_picks_highest() {
        let group = group();
        let chosen = select(&PackageSpec::bare("a"), &group).unwrap();
        assert_eq!(chosen.version.to_string(), "1.2.0");
    }

    #[test]
    fn test_exact_request() {
        let group = group();
        let chosen = select(&PackageSpec::parse("a@1.1.0").unwrap(), &group).unwrap();
        assert_eq!(chosen.folder, PathBuf::from("/r/p3/node_modules/a"));

        assert!(select(&PackageSpec::parse("a@9.9.9").unwrap(), &group).is_none());
    }

    #[test]
    fn test_ranges_never_match_locally() {
        let group = group();
        assert!(select(&PackageSpec::parse("a@^1.0.0").unwrap(), &group).is_none());
        assert!(select(&PackageSpec::parse("a@latest").unwrap(), &group).is_none());
    }

    #[test]
    fn test_empty_group_is_unresolved() {
        assert!(select(&PackageSpec::bare("a"), &[]).is_none());
    }

    #[test]
    fn test_tie_break_smallest_folder() {
        let mut group = vec![
            candidate("a", "2.0.0", "/r/zeta/node_modules/a"),
            candidate("a", "2.0.0", "/r/alpha/node_modules/a"),
            candidate("a", "1.0.0", "/r/aaa/node_modules/a"),
        ];
        let first = select(&PackageSpec::bare("a"), &group).unwrap().clone();
        group.reverse();
        let second = select(&PackageSpec::bare("a"), &group).unwrap().clone();

        assert_eq!(first.folder, PathBuf::from("/r/alpha/node_modules/a"));
        assert_eq!(first, second);
    }

    #[test]
    fn test_prerelease_ranks_below_release() {
        let group = vec![
            candidate("a", "2.0.0-beta.1", "/r/p1/node_modules/a"),
            candidate("a", "1.9.0", "/r/p2/node_modules/a"),
            candidate("a", "2.0.0", "/r/p3/node_modules/a"),
        ];
        let chosen = select(&PackageSpec::bare("a"), &group).unwrap();
        assert_eq!(chosen.version, Version::new(2, 0, 0));
    }

    #[test]
    fn test_resolve_requests_partitions_input() {
        let mut candidates = group();
        candidates.push(candidate("b", "1.0.0", "/r/p1/node_modules/b"));
        let groups = group_by_name(candidates);

        let requests = vec![
            PackageSpec::bare("a"),
            PackageSpec::parse("b@2.0.0").unwrap(),
            PackageSpec::bare("c"),
        ];
        let result = resolve_requests(&requests, &groups);

        assert_eq!(result.resolved.keys().collect::<Vec<_>>(), vec!["a"]);
        assert_eq!(result.missing_names(), vec!["b", "c"]);
        assert_eq!(result.missing[0].version.as_deref(), Some("2.0.0"));
        assert_eq!(result.resolved.len() + result.missing.len(), requests.len());
    }

    #[test]
    fn test_resolve_empty_requests() {
        let result = resolve_requests(&[], &CandidateGroups::new());
        assert!(result.resolved.is_empty());
        assert!(result.missing.is_empty());
    }
}
