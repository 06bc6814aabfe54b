//! Frame classification: which stack frames belong to profiled packages.
//!
//! The profiler only aggregates frames whose class lives in one of the
//! user-selected packages. Everything else (JDK internals, libraries, proxies)
//! is dropped before the hot-spot and call-tree models see the stack.
//!
//! # Package Specs
//!
//! - `com.example.server` → exact package match only
//! - `com.example.*` → the package and all sub-packages
//!
//! A wildcard spec `P*` matches when the frame's package name with a trailing
//! `.` starts with `P`. An empty spec set profiles nothing.
//!
//! # Package Derivation
//!
//! 1. Class names starting with `$` are synthetic proxies → never profiled
//! 2. `com.example.Server` → package `com.example`
//! 3. `Server` (no qualifier) → [`DEFAULT_PACKAGE_NAME`]

use log::debug;
use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, OnceLock};

use serde::{Deserialize, Serialize};
use stackscope_common::DEFAULT_PACKAGE_NAME;

/// A single profiled-package entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PackageSpec {
    /// Matches exactly one package
    Exact(String),
    /// Matches any package whose name plus `.` starts with the prefix
    Prefix(String),
}

impl PackageSpec {
    /// Parse `com.foo.bar` or `com.foo.*`.
    #[must_use]
    pub fn parse(spec: &str) -> Self {
        let spec = spec.trim();
        match spec.strip_suffix('*') {
            Some(prefix) => PackageSpec::Prefix(prefix.to_owned()),
            None => PackageSpec::Exact(spec.to_owned()),
        }
    }

    /// Returns true if `package` is covered by this spec.
    #[must_use]
    pub fn matches(&self, package: &str) -> bool {
        match self {
            PackageSpec::Exact(name) => package == name,
            PackageSpec::Prefix(prefix) => format!("{package}.").starts_with(prefix.as_str()),
        }
    }
}

impl fmt::Display for PackageSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PackageSpec::Exact(name) => f.write_str(name),
            PackageSpec::Prefix(prefix) => write!(f, "{prefix}*"),
        }
    }
}

/// The set of packages selected for profiling.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct ProfiledPackages {
    specs: Vec<PackageSpec>,
}

impl ProfiledPackages {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a spec; duplicates are ignored.
    pub fn insert(&mut self, spec: &str) {
        let spec = PackageSpec::parse(spec);
        if !self.specs.contains(&spec) {
            self.specs.push(spec);
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PackageSpec> {
        self.specs.iter()
    }
}

impl<S: AsRef<str>> FromIterator<S> for ProfiledPackages {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut packages = ProfiledPackages::new();
        for spec in iter {
            packages.insert(spec.as_ref());
        }
        packages
    }
}

impl From<Vec<String>> for ProfiledPackages {
    fn from(specs: Vec<String>) -> Self {
        specs.into_iter().collect()
    }
}

impl From<ProfiledPackages> for Vec<String> {
    fn from(packages: ProfiledPackages) -> Self {
        packages.specs.iter().map(ToString::to_string).collect()
    }
}

/// Derive the package of a class, or `None` for synthetic proxy classes.
#[must_use]
pub fn package_of(class_name: &str) -> Option<&str> {
    if class_name.starts_with('$') {
        return None;
    }
    match class_name.rfind('.') {
        Some(idx) => Some(&class_name[..idx]),
        None => Some(DEFAULT_PACKAGE_NAME),
    }
}

/// Returns true if frames of `class_name` should be aggregated.
#[must_use]
pub fn is_profiled(class_name: &str, packages: &ProfiledPackages) -> bool {
    if packages.is_empty() {
        return false;
    }

    let Some(package) = package_of(class_name) else {
        diagnostics().record_synthetic(class_name);
        return false;
    };

    packages.iter().any(|spec| spec.matches(package))
}

// =============================================================================
// FILTER DIAGNOSTICS
// =============================================================================

/// Counts kept and dropped frames so reports can show how much of each stack
/// the package selection actually covers.
pub struct FilterDiagnostics {
    /// Synthetic classes already logged (to avoid log spam)
    seen_synthetic: Mutex<HashSet<String>>,
    frames_kept: AtomicU64,
    frames_dropped: AtomicU64,
}

impl FilterDiagnostics {
    #[must_use]
    pub fn new() -> Self {
        Self {
            seen_synthetic: Mutex::new(HashSet::new()),
            frames_kept: AtomicU64::new(0),
            frames_dropped: AtomicU64::new(0),
        }
    }

    /// Record the outcome of filtering one frame.
    pub fn record_frame(&self, kept: bool) {
        if kept {
            self.frames_kept.fetch_add(1, Ordering::Relaxed);
        } else {
            self.frames_dropped.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn record_synthetic(&self, class_name: &str) {
        if let Ok(mut seen) = self.seen_synthetic.lock() {
            if seen.insert(class_name.to_owned()) {
                debug!("Excluding synthetic class '{class_name}' from profile");
            }
        }
    }

    /// Percentage of sampled frames that fell into a profiled package.
    ///
    /// Returns 0.0 if no frames have been filtered yet.
    #[allow(clippy::cast_precision_loss)]
    pub fn coverage(&self) -> f64 {
        let kept = self.frames_kept.load(Ordering::Relaxed);
        let total = kept + self.frames_dropped.load(Ordering::Relaxed);
        if total > 0 {
            (kept as f64 / total as f64) * 100.0
        } else {
            0.0
        }
    }

    pub fn frames_kept(&self) -> u64 {
        self.frames_kept.load(Ordering::Relaxed)
    }
}

impl Default for FilterDiagnostics {
    fn default() -> Self {
        Self::new()
    }
}

static DIAGNOSTICS: OnceLock<FilterDiagnostics> = OnceLock::new();

/// Get the global filter diagnostics tracker.
pub fn diagnostics() -> &'static FilterDiagnostics {
    DIAGNOSTICS.get_or_init(FilterDiagnostics::new)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn packages(specs: &[&str]) -> ProfiledPackages {
        specs.iter().collect()
    }

    #[test]
    fn test_empty_set_profiles_nothing() {
        assert!(!is_profiled("com.foo.Bar", &ProfiledPackages::new()));
    }

    #[test]
    fn test_exact_package() {
        let p = packages(&["com.foo"]);
        assert!(is_profiled("com.foo.Bar", &p));
        assert!(!is_profiled("com.foo.sub.Bar", &p));
        assert!(!is_profiled("com.foobar.Baz", &p));
    }

    #[test]
    fn test_wildcard_includes_subpackages() {
        let p = packages(&["com.foo.*"]);
        assert!(is_profiled("com.foo.Bar", &p));
        assert!(is_profiled("com.foo.sub.deep.Bar", &p));
        assert!(!is_profiled("com.foobar.Baz", &p));
        assert!(!is_profiled("org.foo.Bar", &p));
    }

    #[test]
    fn test_wildcard_without_dot_is_plain_prefix() {
        let p = packages(&["com.foo*"]);
        assert!(is_profiled("com.foobar.Baz", &p));
    }

    #[test]
    fn test_default_package() {
        assert_eq!(package_of("Main"), Some(DEFAULT_PACKAGE_NAME));
        assert!(is_profiled("Main", &packages(&["<default>"])));
        assert!(!is_profiled("Main", &packages(&["com.*"])));
    }

    #[test]
    fn test_synthetic_proxy_excluded() {
        assert_eq!(package_of("$Proxy12"), None);
        assert!(!is_profiled("$Proxy12", &packages(&["<default>", "*"])));
    }

    #[test]
    fn test_star_matches_everything_else() {
        let p = packages(&["*"]);
        assert!(is_profiled("java.lang.Thread", &p));
        assert!(is_profiled("Main", &p));
    }

    #[test]
    fn test_spec_round_trip_through_strings() {
        let p = packages(&["com.foo.*", "org.bar", "com.foo.*"]);
        let specs: Vec<String> = p.clone().into();
        assert_eq!(specs, vec!["com.foo.*".to_string(), "org.bar".to_string()]);
        assert_eq!(ProfiledPackages::from(specs), p);
    }

    #[test]
    fn test_diagnostics_coverage() {
        let diag = FilterDiagnostics::new();
        assert!((diag.coverage() - 0.0).abs() < f64::EPSILON);
        diag.record_frame(true);
        diag.record_frame(false);
        assert!((diag.coverage() - 50.0).abs() < 0.01);
        assert_eq!(diag.frames_kept(), 1);
    }
}
