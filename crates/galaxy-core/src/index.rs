use crate::types::GalaxyEntry;
use std::collections::{HashMap, HashSet};

/// Normalize a label into the key form used for all matching:
/// trim, lowercase, then strip whitespace, hyphens and underscores.
///
/// Pure and idempotent; never fails.
pub fn normalize(label: &str) -> String {
    label
        .trim()
        .to_lowercase()
        .chars()
        .filter(|c| !c.is_whitespace() && !matches!(c, '-' | '_'))
        .collect()
}

/// Per-galaxy index from normalized label to canonical entry.
///
/// Built in two phases: every canonical value first (these raw values
/// form the protected set), then every synonym that does not collide —
/// raw — with a canonical value. A synonym whose normalized key is
/// already taken never shadows it: canonical wins, and among synonyms
/// the first one indexed wins.
#[derive(Debug, Clone, Default)]
pub struct LabelIndex {
    entries: HashMap<String, GalaxyEntry>,
    /// Index keys sorted shortest-first, then lexicographic. This is
    /// the scan order for partial matching, so substring hits are
    /// reproducible across runs.
    scan_keys: Vec<String>,
}

impl LabelIndex {
    pub fn build(values: &[GalaxyEntry]) -> Self {
        let protected: HashSet<&str> = values.iter().map(|e| e.value.as_str()).collect();

        let mut entries = HashMap::with_capacity(values.len());
        for entry in values {
            entries.insert(normalize(&entry.value), entry.clone());
        }

        for entry in values {
            for synonym in &entry.meta.synonyms {
                if protected.contains(synonym.as_str()) {
                    continue;
                }
                entries
                    .entry(normalize(synonym))
                    .or_insert_with(|| entry.clone());
            }
        }

        let mut scan_keys: Vec<String> = entries.keys().cloned().collect();
        scan_keys.sort_by(|a, b| a.len().cmp(&b.len()).then_with(|| a.cmp(b)));

        Self { entries, scan_keys }
    }

    /// Exact lookup by normalized key.
    pub fn exact(&self, normalized: &str) -> Option<&GalaxyEntry> {
        self.entries.get(normalized)
    }

    /// First index key containing `normalized` as a substring, in scan
    /// order (shortest key first, ties lexicographic).
    pub fn partial(&self, normalized: &str) -> Option<&GalaxyEntry> {
        self.scan_keys
            .iter()
            .find(|key| key.contains(normalized))
            .and_then(|key| self.entries.get(key))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
