//! Include/exclude path filters

use regex::Regex;

use crate::SyncError;

/// Regex filters applied to relative paths before planning.
///
/// Patterns use search semantics: `\.md$` keeps every markdown file at any
/// depth. An empty pattern string is treated as absent.
#[derive(Debug, Clone, Default)]
pub struct PathFilter {
    include: Option<Regex>,
    exclude: Option<Regex>,
}

impl PathFilter {
    pub fn new(include: Option<&str>, exclude: Option<&str>) -> Result<Self, SyncError> {
        Ok(Self {
            include: compile(include)?,
            exclude: compile(exclude)?,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.include.is_none() && self.exclude.is_none()
    }

    /// Whether `path` survives both filters.
    pub fn allows(&self, path: &str) -> bool {
        if let Some(include) = &self.include {
            if !include.is_match(path) {
                return false;
            }
        }
        if let Some(exclude) = &self.exclude {
            if exclude.is_match(path) {
                return false;
            }
        }
        true
    }

    /// Drop every entry whose key the filter rejects.
    pub fn retain<V>(&self, map: &mut std::collections::BTreeMap<String, V>) {
        if self.is_empty() {
            return;
        }
        map.retain(|path, _| self.allows(path));
    }
}

fn compile(pattern: Option<&str>) -> Result<Option<Regex>, SyncError> {
    match pattern.filter(|p| !p.is_empty()) {
        Some(p) => Regex::new(p)
            .map(Some)
            .map_err(|source| SyncError::InvalidPattern {
                pattern: p.to_string(),
                source,
            }),
        None => Ok(None),
    }
}
