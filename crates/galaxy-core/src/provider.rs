use crate::error::{GalaxyError, Result};
use crate::types::{default_tag_prefix, GalaxySnapshot};
use async_trait::async_trait;
use std::collections::HashMap;

/// Source of galaxy snapshots.
///
/// Network-backed implementations live outside the engine crate; the
/// engine only ever sees immutable snapshots through this seam.
#[async_trait]
pub trait GalaxyProvider: Send + Sync {
    /// Load one galaxy by name.
    async fn galaxy(&self, name: &str) -> Result<GalaxySnapshot>;

    /// Canonical tag prefix for a galaxy.
    fn tag_prefix(&self, name: &str) -> String {
        default_tag_prefix(name)
    }
}

/// In-memory provider over pre-loaded snapshots. Used for embedding
/// and as the test double throughout the engine.
#[derive(Debug, Clone, Default)]
pub struct StaticGalaxyProvider {
    snapshots: HashMap<String, GalaxySnapshot>,
}

impl StaticGalaxyProvider {
    pub fn new(snapshots: impl IntoIterator<Item = GalaxySnapshot>) -> Self {
        Self {
            snapshots: snapshots
                .into_iter()
                .map(|snapshot| (snapshot.name.clone(), snapshot))
                .collect(),
        }
    }

    pub fn insert(&mut self, snapshot: GalaxySnapshot) {
        self.snapshots.insert(snapshot.name.clone(), snapshot);
    }
}

#[async_trait]
impl GalaxyProvider for StaticGalaxyProvider {
    async fn galaxy(&self, name: &str) -> Result<GalaxySnapshot> {
        self.snapshots
            .get(name)
            .cloned()
            .ok_or_else(|| GalaxyError::GalaxyNotFound(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::GalaxyEntry;

    #[tokio::test]
    async fn static_provider_serves_known_and_rejects_unknown() {
        let provider = StaticGalaxyProvider::new([GalaxySnapshot::new(
            "threat-actor",
            vec![GalaxyEntry::new("APT28", [])],
        )]);

        let snapshot = provider.galaxy("threat-actor").await.unwrap();
        assert_eq!(snapshot.values.len(), 1);
        assert_eq!(provider.tag_prefix("threat-actor"), "misp-galaxy:threat-actor");

        assert!(matches!(
            provider.galaxy("tool").await,
            Err(GalaxyError::GalaxyNotFound(name)) if name == "tool"
        ));
    }
}
