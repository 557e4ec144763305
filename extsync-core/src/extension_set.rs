//! A set of extensions keyed by versioned identity.

use std::collections::BTreeSet;
use std::path::PathBuf;

use crate::catalog::ContentLayout;
use crate::types::{Extension, ExtensionRef};

/// Extensions known at one point in time: either the cached (last committed)
/// snapshot or the current (freshly discovered) one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtensionSet {
    extensions: BTreeSet<Extension>,
}

impl ExtensionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an extension. Returns `false` if an identical one was present.
    pub fn insert(&mut self, extension: Extension) -> bool {
        self.extensions.insert(extension)
    }

    pub fn len(&self) -> usize {
        self.extensions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Extension> {
        self.extensions.iter()
    }

    /// Look up the extension with reference `reference`.
    pub fn get(&self, reference: &ExtensionRef) -> Option<&Extension> {
        self.extensions.iter().find(|e| e.reference() == reference)
    }

    pub fn refs(&self) -> BTreeSet<&ExtensionRef> {
        self.extensions.iter().map(Extension::reference).collect()
    }

    /// References whose extension differs between `self` and `other`.
    ///
    /// The symmetric difference is taken on full identity and then projected
    /// onto the reference, so a commit bump yields the reference once.
    pub fn changed_refs(&self, other: &ExtensionSet) -> BTreeSet<ExtensionRef> {
        self.extensions
            .symmetric_difference(&other.extensions)
            .map(|e| e.reference().clone())
            .collect()
    }

    /// References present in `current` but not in `cached`.
    pub fn added(cached: &ExtensionSet, current: &ExtensionSet) -> BTreeSet<ExtensionRef> {
        let known = cached.refs();
        current
            .refs()
            .into_iter()
            .filter(|r| !known.contains(r))
            .cloned()
            .collect()
    }

    /// References present in `cached` but not in `current`.
    pub fn removed(cached: &ExtensionSet, current: &ExtensionSet) -> BTreeSet<ExtensionRef> {
        Self::added(current, cached)
    }

    /// References present on both sides with a different extension value.
    pub fn updated(cached: &ExtensionSet, current: &ExtensionSet) -> BTreeSet<ExtensionRef> {
        let old_refs = cached.refs();
        let new_refs = current.refs();
        cached
            .changed_refs(current)
            .into_iter()
            .filter(|r| old_refs.contains(r) && new_refs.contains(r))
            .collect()
    }

    /// Content directories of every extension, in set order.
    pub fn content_fallback_dirs(&self, layout: &ContentLayout) -> Vec<PathBuf> {
        self.extensions
            .iter()
            .map(|e| layout.content_dir(e.name()))
            .collect()
    }
}

impl FromIterator<Extension> for ExtensionSet {
    fn from_iter<I: IntoIterator<Item = Extension>>(iter: I) -> Self {
        Self {
            extensions: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for ExtensionSet {
    type Item = Extension;
    type IntoIter = std::collections::btree_set::IntoIter<Extension>;

    fn into_iter(self) -> Self::IntoIter {
        self.extensions.into_iter()
    }
}

impl<'a> IntoIterator for &'a ExtensionSet {
    type Item = &'a Extension;
    type IntoIter = std::collections::btree_set::Iter<'a, Extension>;

    fn into_iter(self) -> Self::IntoIter {
        self.extensions.iter()
    }
}
