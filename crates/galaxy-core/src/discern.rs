use crate::error::{FailedDiscernment, Result};
use crate::index::{normalize, LabelIndex};
use crate::provider::GalaxyProvider;
use crate::types::Discernment;

/// Generic terms that never resolve, even when a galaxy happens to
/// carry one as a canonical value. Checked in normalized form.
pub const REJECTED_LABELS: &[&str] = &[
    "backdoor",
    "encrypted",
    "malware",
    "phishing",
    "ransomware",
    "threat",
    "trojan",
];

/// Default separator set for compound decomposition.
pub const DEFAULT_SEPARATORS: &str = " ,";

/// Resolution of raw labels against one galaxy.
pub trait Discern {
    /// Resolve one label. `partial` additionally allows substring
    /// containment against the index keys when the exact lookup misses.
    fn discern(&self, label: &str, partial: bool) -> std::result::Result<Discernment, FailedDiscernment>;

    /// Decompose a compound label on any of the separator characters
    /// and resolve each fragment independently. Empty fragments are
    /// dropped and fragments that fail to resolve are silently omitted;
    /// successful discernments come back in input order.
    fn discern_compound(&self, label: &str, partial: bool, separators: &str) -> Vec<Discernment> {
        label
            .split(|c| separators.contains(c))
            .filter(|fragment| !fragment.is_empty())
            .filter_map(|fragment| self.discern(fragment, partial).ok())
            .collect()
    }
}

/// The single, data-parameterized discerner: a `(galaxy, source)` pair
/// plus the label index built from that galaxy's snapshot.
#[derive(Debug, Clone)]
pub struct GalaxyDiscerner {
    galaxy: String,
    source: String,
    index: LabelIndex,
}

impl GalaxyDiscerner {
    pub fn new(galaxy: impl Into<String>, source: impl Into<String>, index: LabelIndex) -> Self {
        Self {
            galaxy: galaxy.into(),
            source: source.into(),
            index,
        }
    }

    /// Fetch `galaxy` from the provider and index it.
    pub async fn from_provider<P: GalaxyProvider + ?Sized>(
        provider: &P,
        galaxy: &str,
        source: &str,
    ) -> Result<Self> {
        let snapshot = provider.galaxy(galaxy).await?;
        Ok(Self::new(galaxy, source, LabelIndex::build(&snapshot.values)))
    }

    pub fn galaxy(&self) -> &str {
        &self.galaxy
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    fn failure(&self, label: &str) -> FailedDiscernment {
        FailedDiscernment {
            label: label.to_string(),
            galaxy: self.galaxy.clone(),
        }
    }
}

impl Discern for GalaxyDiscerner {
    fn discern(&self, label: &str, partial: bool) -> std::result::Result<Discernment, FailedDiscernment> {
        let normalized = normalize(label);

        // An empty key would substring-match every index key.
        if normalized.is_empty() || REJECTED_LABELS.contains(&normalized.as_str()) {
            return Err(self.failure(label));
        }

        let entry = match self.index.exact(&normalized) {
            Some(entry) => entry,
            None if partial => self.index.partial(&normalized).ok_or_else(|| self.failure(label))?,
            None => return Err(self.failure(label)),
        };

        Ok(Discernment {
            label: label.to_string(),
            discerned_name: entry.value.clone(),
            source: self.source.clone(),
            galaxy: self.galaxy.clone(),
            raw_entry: entry.clone(),
        })
    }
}

/// Build one discerner per requested galaxy, all against the same
/// provider. With `source = None` each discerner gets the well-known
/// upstream for its galaxy (see [`profiles`]).
pub async fn discerners_for<P: GalaxyProvider + ?Sized>(
    provider: &P,
    galaxies: &[String],
    source: Option<&str>,
) -> Result<Vec<GalaxyDiscerner>> {
    let mut discerners = Vec::with_capacity(galaxies.len());
    for galaxy in galaxies {
        let source = source.unwrap_or_else(|| profiles::source_for(galaxy));
        discerners.push(GalaxyDiscerner::from_provider(provider, galaxy, source).await?);
    }
    Ok(discerners)
}

/// Well-known `(galaxy, source)` pairs used to pre-seed discerner
/// configuration. Anything else falls back to the "custom" source.
pub mod profiles {
    /// A galaxy name paired with the upstream that curates it.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct DiscernerProfile {
        pub galaxy: &'static str,
        pub source: &'static str,
    }

    pub const MISP_THREAT_ACTOR: DiscernerProfile = DiscernerProfile {
        galaxy: "threat-actor",
        source: "misp",
    };
    pub const MISP_TOOL: DiscernerProfile = DiscernerProfile {
        galaxy: "tool",
        source: "misp",
    };
    pub const MITRE_INTRUSION_SET: DiscernerProfile = DiscernerProfile {
        galaxy: "mitre-intrusion-set",
        source: "mitre",
    };
    pub const MITRE_MALWARE: DiscernerProfile = DiscernerProfile {
        galaxy: "mitre-malware",
        source: "mitre",
    };
    pub const MITRE_TOOL: DiscernerProfile = DiscernerProfile {
        galaxy: "mitre-tool",
        source: "mitre",
    };
    pub const MALPEDIA: DiscernerProfile = DiscernerProfile {
        galaxy: "malpedia",
        source: "malpedia",
    };

    pub const FALLBACK_SOURCE: &str = "custom";

    pub fn all() -> Vec<DiscernerProfile> {
        vec![
            MISP_THREAT_ACTOR,
            MISP_TOOL,
            MITRE_INTRUSION_SET,
            MITRE_MALWARE,
            MITRE_TOOL,
            MALPEDIA,
        ]
    }

    /// Source for a galaxy name, falling back to [`FALLBACK_SOURCE`]
    /// for galaxies outside the registry.
    pub fn source_for(galaxy: &str) -> &'static str {
        all()
            .into_iter()
            .find(|profile| profile.galaxy == galaxy)
            .map(|profile| profile.source)
            .unwrap_or(FALLBACK_SOURCE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::StaticGalaxyProvider;
    use crate::types::{GalaxyEntry, GalaxySnapshot};

    fn entry(value: &str, synonyms: &[&str]) -> GalaxyEntry {
        GalaxyEntry::new(value, synonyms.iter().map(|s| s.to_string()))
    }

    fn actor_discerner() -> GalaxyDiscerner {
        let index = LabelIndex::build(&[
            entry("APT28", &["Sofacy", "Fancy Bear"]),
            entry("Emotet", &["Geodo"]),
            entry("TrickBot", &[]),
        ]);
        GalaxyDiscerner::new("threat-actor", "misp", index)
    }

    #[test]
    fn canonical_value_discerns_to_itself() {
        let discerner = actor_discerner();
        for value in ["APT28", "Emotet", "TrickBot"] {
            let d = discerner.discern(value, false).unwrap();
            assert_eq!(d.discerned_name, value);
            assert_eq!(d.galaxy, "threat-actor");
            assert_eq!(d.source, "misp");
            assert_eq!(d.label, value);
        }
    }

    #[test]
    fn synonym_discerns_to_canonical_value() {
        let discerner = actor_discerner();
        let d = discerner.discern("fancy-bear", false).unwrap();
        assert_eq!(d.discerned_name, "APT28");
        assert_eq!(d.raw_entry.meta.synonyms, vec!["Sofacy", "Fancy Bear"]);
        assert_eq!(d.tag(), "misp-galaxy:threat-actor=\"APT28\"");
    }

    #[test]
    fn rejected_label_fails_even_when_canonical() {
        let index = LabelIndex::build(&[entry("Malware", &[])]);
        let discerner = GalaxyDiscerner::new("threat-actor", "misp", index);
        assert!(discerner.discern("malware", false).is_err());
        assert!(discerner.discern("  MAL-WARE ", true).is_err());
    }

    #[test]
    fn unknown_label_fails() {
        let discerner = actor_discerner();
        let err = discerner.discern("Lazarus", false).unwrap_err();
        assert_eq!(err.label, "Lazarus");
        assert_eq!(err.galaxy, "threat-actor");
    }

    #[test]
    fn empty_label_fails_instead_of_matching_everything() {
        let discerner = actor_discerner();
        assert!(discerner.discern("", true).is_err());
        assert!(discerner.discern(" -_ ", true).is_err());
    }

    #[test]
    fn partial_match_requires_opt_in() {
        let discerner = actor_discerner();
        assert!(discerner.discern("Trick", false).is_err());
        let d = discerner.discern("Trick", true).unwrap();
        assert_eq!(d.discerned_name, "TrickBot");
    }

    #[test]
    fn compound_preserves_order_and_omits_failures() {
        let discerner = actor_discerner();
        let results = discerner.discern_compound("Emotet, TrickBot", false, DEFAULT_SEPARATORS);
        let names: Vec<_> = results.iter().map(|d| d.discerned_name.as_str()).collect();
        assert_eq!(names, ["Emotet", "TrickBot"]);

        let results =
            discerner.discern_compound("Qakbot, Emotet,, malware", false, DEFAULT_SEPARATORS);
        let names: Vec<_> = results.iter().map(|d| d.discerned_name.as_str()).collect();
        assert_eq!(names, ["Emotet"]);
    }

    #[test]
    fn compound_on_unmatched_input_is_empty() {
        let discerner = actor_discerner();
        assert!(discerner
            .discern_compound("nothing here", false, DEFAULT_SEPARATORS)
            .is_empty());
    }

    #[tokio::test]
    async fn factory_binds_galaxy_and_registry_source() {
        let provider = StaticGalaxyProvider::new([
            GalaxySnapshot::new("mitre-malware", vec![entry("Emotet", &[])]),
            GalaxySnapshot::new("my-own-galaxy", vec![entry("Thing", &[])]),
        ]);

        let discerners = discerners_for(
            &provider,
            &["mitre-malware".into(), "my-own-galaxy".into()],
            None,
        )
        .await
        .unwrap();

        assert_eq!(discerners[0].galaxy(), "mitre-malware");
        assert_eq!(discerners[0].source(), "mitre");
        assert_eq!(discerners[1].source(), "custom");

        let d = discerners[0].discern("emotet", false).unwrap();
        assert_eq!(d.source, "mitre");
    }

    #[tokio::test]
    async fn factory_propagates_missing_galaxy() {
        let provider = StaticGalaxyProvider::new([]);
        let result = discerners_for(&provider, &["threat-actor".into()], Some("misp")).await;
        assert!(result.is_err());
    }

    #[test]
    fn registry_covers_the_default_upstreams() {
        assert_eq!(profiles::source_for("threat-actor"), "misp");
        assert_eq!(profiles::source_for("mitre-intrusion-set"), "mitre");
        assert_eq!(profiles::source_for("malpedia"), "malpedia");
        assert_eq!(profiles::source_for("exotic"), "custom");
    }
}
