use crate::types::{tag_for, GalaxySnapshot, TagRenamePlan, GALAXY_TAG_NAMESPACE};
use std::collections::{BTreeSet, HashSet};

/// Galaxies whose clusters keep their identity through a stable
/// trailing identifier, e.g. MITRE techniques: the display name can be
/// renamed, but the technique id after the last `" - "` stays put.
pub const SUFFIX_IDENTITY_GALAXIES: &[&str] = &["mitre-attack-pattern"];

/// Separator in front of the trailing identifier.
pub const SUFFIX_SEPARATOR: &str = " - ";

pub fn is_suffix_identity(galaxy: &str) -> bool {
    SUFFIX_IDENTITY_GALAXIES.contains(&galaxy)
}

/// Text after the last occurrence of the suffix separator; the whole
/// tag when the separator is absent.
fn identity_suffix(tag: &str) -> &str {
    tag.rsplit(SUFFIX_SEPARATOR).next().unwrap_or(tag)
}

/// Galaxy names referenced by `misp-galaxy:{name}="…"` tag strings,
/// sorted and deduplicated. Tags outside the namespace and malformed
/// names (no `:` in the prefix, more than one, empty name) are ignored.
pub fn galaxy_names_from_tags<'a>(tag_names: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut names = BTreeSet::new();
    for tag_name in tag_names {
        let prefix = tag_name.split('=').next().unwrap_or(tag_name);
        let mut parts = prefix.split(':');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(GALAXY_TAG_NAMESPACE), Some(galaxy), None) if !galaxy.is_empty() => {
                names.insert(galaxy.to_string());
            }
            _ => continue,
        }
    }
    names.into_iter().collect()
}

/// One canonical tag plus the synonym tags that should migrate to it.
#[derive(Debug, Clone)]
struct CanonicalTag {
    tag: String,
    synonym_tags: HashSet<String>,
}

/// Decides which applied tags are stale against one galaxy snapshot.
///
/// Two rules, in order: an applied tag that is a synonym of a canonical
/// entry is stale; for suffix-identity galaxies, an applied tag sharing
/// the canonical tag's trailing identifier is stale. Canonical entries
/// are evaluated in snapshot order and the first match wins — the
/// documented tie-break when one applied tag matches several entries.
#[derive(Debug, Clone)]
pub struct StaleTagDetector {
    galaxy: String,
    suffix_identity: bool,
    canonical: Vec<CanonicalTag>,
}

impl StaleTagDetector {
    pub fn new(snapshot: &GalaxySnapshot, tag_prefix: &str) -> Self {
        let canonical = snapshot
            .values
            .iter()
            .map(|entry| CanonicalTag {
                tag: tag_for(tag_prefix, &entry.value),
                synonym_tags: entry
                    .meta
                    .synonyms
                    .iter()
                    .map(|synonym| tag_for(tag_prefix, synonym))
                    .collect(),
            })
            .collect();

        Self {
            galaxy: snapshot.name.clone(),
            suffix_identity: is_suffix_identity(&snapshot.name),
            canonical,
        }
    }

    pub fn galaxy(&self) -> &str {
        &self.galaxy
    }

    /// The canonical tag `applied` should be renamed to, if any.
    pub fn rename_for(&self, applied: &str) -> Option<&str> {
        self.canonical.iter().find_map(|canonical| {
            if applied == canonical.tag {
                return None;
            }
            if canonical.synonym_tags.contains(applied) {
                return Some(canonical.tag.as_str());
            }
            if self.suffix_identity
                && identity_suffix(applied) == identity_suffix(&canonical.tag)
            {
                return Some(canonical.tag.as_str());
            }
            None
        })
    }

    /// Rename plan for a set of applied tags, in their given order.
    pub fn plan<'a>(&self, applied_tags: impl IntoIterator<Item = &'a str>) -> TagRenamePlan {
        let mut plan = TagRenamePlan::new();
        for applied in applied_tags {
            if let Some(new_tag) = self.rename_for(applied) {
                plan.insert(applied, new_tag);
            }
        }
        plan
    }
}
