use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet};

/// Namespace shared by every galaxy tag: `misp-galaxy:{galaxy}="{value}"`.
pub const GALAXY_TAG_NAMESPACE: &str = "misp-galaxy";

/// Canonical tag prefix for a galaxy, e.g. `misp-galaxy:threat-actor`.
pub fn default_tag_prefix(galaxy: &str) -> String {
    format!("{GALAXY_TAG_NAMESPACE}:{galaxy}")
}

/// Full tag string for a value under a prefix, double quotes included.
/// This is both the display form and the lookup key in the tag store.
pub fn tag_for(prefix: &str, value: &str) -> String {
    format!("{prefix}=\"{value}\"")
}

/// One canonical entry ("cluster") within a galaxy.
///
/// Immutable for the lifetime of a loaded snapshot. `value` is the
/// canonical display name; everything else rides along in `meta`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GalaxyEntry {
    /// Canonical display name.
    pub value: String,

    /// Synonyms plus the opaque remainder of the cluster metadata.
    #[serde(default)]
    pub meta: EntryMeta,
}

impl GalaxyEntry {
    pub fn new(value: impl Into<String>, synonyms: impl IntoIterator<Item = String>) -> Self {
        Self {
            value: value.into(),
            meta: EntryMeta {
                synonyms: synonyms.into_iter().collect(),
                extra: HashMap::new(),
            },
        }
    }
}

/// Cluster metadata. Only `synonyms` is interpreted; the rest is
/// carried verbatim so a `Discernment` can hand back the raw entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EntryMeta {
    #[serde(default)]
    pub synonyms: Vec<String>,

    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

/// One loaded galaxy: an ordered list of canonical entries.
///
/// Rebuilt once per galaxy per run from provider data and discarded at
/// process end. Entry order is the provider's order and is load-bearing:
/// it is the documented tie-break for stale-tag detection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GalaxySnapshot {
    pub name: String,
    pub values: Vec<GalaxyEntry>,
}

impl GalaxySnapshot {
    pub fn new(name: impl Into<String>, values: Vec<GalaxyEntry>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }
}

/// The resolution of one raw label to a canonical entry, with provenance.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Discernment {
    /// The label as the caller supplied it.
    pub label: String,

    /// Canonical display name of the matched entry.
    pub discerned_name: String,

    /// Which upstream the galaxy data came from ("misp", "mitre", ...).
    pub source: String,

    /// Galaxy the match was made against.
    pub galaxy: String,

    /// The matched entry, untouched.
    pub raw_entry: GalaxyEntry,
}

impl Discernment {
    /// Tag string for this discernment. A pure function of
    /// `(galaxy, discerned_name)`.
    pub fn tag(&self) -> String {
        tag_for(&default_tag_prefix(&self.galaxy), &self.discerned_name)
    }
}

/// A single proposed old → new tag rename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagRename {
    pub old_tag: String,
    pub new_tag: String,
}

/// Ordered rename plan for one reconciliation pass.
///
/// Insertion order is preserved and the first rename recorded for an
/// old tag wins; later candidates for the same old tag are dropped.
#[derive(Debug, Clone, Default)]
pub struct TagRenamePlan {
    renames: Vec<TagRename>,
    planned: HashSet<String>,
}

impl TagRenamePlan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a rename. Returns false (and changes nothing) when a
    /// rename for `old_tag` is already planned.
    pub fn insert(&mut self, old_tag: impl Into<String>, new_tag: impl Into<String>) -> bool {
        let old_tag = old_tag.into();
        if !self.planned.insert(old_tag.clone()) {
            return false;
        }
        self.renames.push(TagRename {
            old_tag,
            new_tag: new_tag.into(),
        });
        true
    }

    pub fn iter(&self) -> impl Iterator<Item = &TagRename> {
        self.renames.iter()
    }

    pub fn len(&self) -> usize {
        self.renames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.renames.is_empty()
    }
}

impl<'a> IntoIterator for &'a TagRenamePlan {
    type Item = &'a TagRename;
    type IntoIter = std::slice::Iter<'a, TagRename>;

    fn into_iter(self) -> Self::IntoIter {
        self.renames.iter()
    }
}
