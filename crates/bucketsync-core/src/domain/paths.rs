//! Relative path helpers
//!
//! Every key in a local or remote file map is a root-relative path using
//! forward slashes. Scope and protection checks are plain string-prefix
//! tests over that form, so `docs` also covers `docs-old/readme.md`.

use std::path::Path;

/// Suffix of the temporary file a download is written to before it is
/// renamed into place.
pub const PARTIAL_DOWNLOAD_SUFFIX: &str = ".bucketsync-part";

/// Normalize a user-supplied or provider-reported relative path.
///
/// Backslashes become forward slashes and any leading `./` or `/`
/// segments are stripped. Trailing slashes are kept.
pub fn normalize_relative(path: &str) -> String {
    let mut normalized = path.replace('\\', "/");
    loop {
        if let Some(rest) = normalized.strip_prefix("./") {
            normalized = rest.to_string();
        } else if let Some(rest) = normalized.strip_prefix('/') {
            normalized = rest.to_string();
        } else {
            break;
        }
    }
    normalized
}

fn slashed(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

// ============================================================================
// ScopePaths
// ============================================================================

/// The sub-paths a sync run is restricted to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopePaths {
    prefixes: Vec<String>,
}

impl ScopePaths {
    /// Build a scope from configured or caller-supplied paths.
    ///
    /// Returns `None` for an empty list, which means "the whole tree".
    pub fn from_paths<S: AsRef<str>>(paths: &[S]) -> Option<Self> {
        if paths.is_empty() {
            return None;
        }
        Some(Self {
            prefixes: paths
                .iter()
                .map(|p| normalize_relative(p.as_ref()))
                .collect(),
        })
    }

    /// Normalized scope entries, in the order given.
    pub fn entries(&self) -> &[String] {
        &self.prefixes
    }

    /// Whether a relative path falls under any scope prefix.
    pub fn contains(&self, relative_path: &str) -> bool {
        self.prefixes
            .iter()
            .any(|prefix| relative_path.starts_with(prefix.as_str()))
    }
}

// ============================================================================
// ProtectedPaths
// ============================================================================

/// Local paths that must never be overwritten by a download.
#[derive(Debug, Clone, Default)]
pub struct ProtectedPaths {
    root: String,
    prefixes: Vec<String>,
}

impl ProtectedPaths {
    /// No protection at all.
    pub fn none() -> Self {
        Self::default()
    }

    /// Protect `root.join(p)` for each entry of `paths`.
    pub fn new<S: AsRef<str>>(root: &Path, paths: &[S]) -> Self {
        Self {
            root: slashed(root),
            prefixes: paths
                .iter()
                .map(|p| slashed(&root.join(normalize_relative(p.as_ref()))))
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.prefixes.is_empty()
    }

    /// Whether downloading `relative_path` would write under a protected path.
    pub fn protects(&self, relative_path: &str) -> bool {
        if self.prefixes.is_empty() {
            return false;
        }
        let target = slashed(&Path::new(&self.root).join(relative_path));
        self.prefixes
            .iter()
            .any(|prefix| target.starts_with(prefix.as_str()))
    }
}
