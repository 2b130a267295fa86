//! Configuration objects and generation context
//!
//! Provides the [`Configuration`] trait implemented by every typed
//! configuration the registry manages, and the [`GenerationContext`] handed
//! to generators and overlays.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt::Debug;

/// Typed configuration with "set if unset" merge
///
/// Unset is modelled explicitly: optional scalars are `Option`, lists are
/// unset while empty, maps are merged key by key.
pub trait Configuration: Any + Clone + Default + Debug {
    /// Name used in logs and diagnostics
    const NAME: &'static str;

    /// Fill every unset field of `self` from `defaults`
    ///
    /// Fields already set are never overwritten.
    fn fill_unset(&mut self, defaults: &Self);
}

/// Configuration that can take project coordinates
pub trait ProjectAware: Configuration {
    /// Partial configuration carrying only the project coordinates
    fn from_project(project: &ProjectInfo) -> Self;
}

/// Project coordinates supplied by the surrounding build
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectInfo {
    /// Artifact name
    pub name: Option<String>,
    /// Artifact version
    pub version: Option<String>,
    /// Group / organisation
    pub group: Option<String>,
}

impl ProjectInfo {
    /// Create project info with a name
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// With version
    #[inline]
    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// With group
    #[inline]
    #[must_use]
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }
}

/// Context of one generation pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationContext {
    /// Project coordinates
    pub project: ProjectInfo,
    /// Active profile, carried through to config references
    pub profile: Option<String>,
}

impl GenerationContext {
    /// Create context for a project
    #[inline]
    #[must_use]
    pub fn new(project: ProjectInfo) -> Self {
        Self {
            project,
            profile: None,
        }
    }

    /// With profile
    #[inline]
    #[must_use]
    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = Some(profile.into());
        self
    }
}

/// Set `target` from `source` if `target` is unset
#[inline]
pub fn fill<T: Clone>(target: &mut Option<T>, source: &Option<T>) {
    if target.is_none() {
        target.clone_from(source);
    }
}

/// Set `target` from `source` if `target` is empty
#[inline]
pub fn fill_vec<T: Clone>(target: &mut Vec<T>, source: &[T]) {
    if target.is_empty() {
        target.extend_from_slice(source);
    }
}

/// Add every key of `source` missing from `target`
pub fn fill_map<V: Clone>(target: &mut IndexMap<String, V>, source: &IndexMap<String, V>) {
    for (key, value) in source {
        if !target.contains_key(key) {
            target.insert(key.clone(), value.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fill_keeps_set_value() {
        let mut target = Some(3);
        fill(&mut target, &Some(1));
        assert_eq!(target, Some(3));
    }

    #[test]
    fn fill_sets_unset_value() {
        let mut target = None;
        fill(&mut target, &Some(1));
        assert_eq!(target, Some(1));
    }

    #[test]
    fn fill_vec_only_when_empty() {
        let mut target = vec![1];
        fill_vec(&mut target, &[2, 3]);
        assert_eq!(target, vec![1]);

        let mut empty: Vec<i32> = Vec::new();
        fill_vec(&mut empty, &[2, 3]);
        assert_eq!(empty, vec![2, 3]);
    }

    #[test]
    fn fill_map_is_per_key() {
        let mut target = IndexMap::new();
        target.insert("app".to_string(), "web".to_string());
        let mut source = IndexMap::new();
        source.insert("app".to_string(), "other".to_string());
        source.insert("tier".to_string(), "front".to_string());

        fill_map(&mut target, &source);
        assert_eq!(target["app"], "web");
        assert_eq!(target["tier"], "front");
    }

    #[test]
    fn project_builder() {
        let project = ProjectInfo::new("web").with_version("1.0").with_group("acme");
        assert_eq!(project.name.as_deref(), Some("web"));
        assert_eq!(project.version.as_deref(), Some("1.0"));
        assert_eq!(project.group.as_deref(), Some("acme"));
    }
}
