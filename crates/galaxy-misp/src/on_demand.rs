use async_trait::async_trait;
use galaxy_core::{GalaxyEntry, GalaxyError, GalaxyProvider, GalaxySnapshot, Result};
use reqwest::StatusCode;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Upstream of the published cluster definitions.
pub const DEFAULT_CLUSTER_BASE_URL: &str =
    "https://raw.githubusercontent.com/MISP/misp-galaxy/main/clusters";

fn provider_err(e: reqwest::Error) -> GalaxyError {
    GalaxyError::Provider(e.to_string())
}

/// Galaxy provider that downloads cluster JSON on demand and caches
/// the raw body on disk. Subsequent loads are served from the cache
/// unless `force_download` is set.
pub struct OnDemandGalaxyProvider {
    base_url: String,
    cache_dir: PathBuf,
    force: bool,
    http: reqwest::Client,
}

impl OnDemandGalaxyProvider {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_url: DEFAULT_CLUSTER_BASE_URL.to_string(),
            cache_dir: cache_dir.into(),
            force: false,
            http: reqwest::Client::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Ignore the cache and re-download.
    pub fn force_download(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    fn cache_path(&self, name: &str) -> PathBuf {
        self.cache_dir.join(format!("misp_galaxy_{name}.json"))
    }

    async fn fetch_raw(&self, name: &str) -> Result<String> {
        // Galaxy names become path segments in both the cache and the
        // download URL.
        if !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
            || name.is_empty()
        {
            return Err(GalaxyError::Provider(format!("invalid galaxy name '{name}'")));
        }

        let path = self.cache_path(name);
        if !self.force {
            if let Ok(cached) = tokio::fs::read_to_string(&path).await {
                debug!(galaxy = name, cache = %path.display(), "serving galaxy from cache");
                return Ok(cached);
            }
        }

        let url = format!("{}/{}.json", self.base_url.trim_end_matches('/'), name);
        debug!(galaxy = name, %url, "downloading galaxy");
        let response = self.http.get(&url).send().await.map_err(provider_err)?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(GalaxyError::GalaxyNotFound(name.to_string()));
        }
        let body = response
            .error_for_status()
            .map_err(provider_err)?
            .text()
            .await
            .map_err(provider_err)?;

        tokio::fs::create_dir_all(&self.cache_dir).await?;
        tokio::fs::write(&path, &body).await?;
        Ok(body)
    }
}

#[async_trait]
impl GalaxyProvider for OnDemandGalaxyProvider {
    async fn galaxy(&self, name: &str) -> Result<GalaxySnapshot> {
        let raw = self.fetch_raw(name).await?;
        let cluster: RawCluster = serde_json::from_str(&raw).map_err(|e| {
            GalaxyError::MalformedGalaxy {
                galaxy: name.to_string(),
                source: e,
            }
        })?;
        Ok(GalaxySnapshot::new(name, cluster.values))
    }
}

/// The slice of a published cluster file the engine cares about.
#[derive(Debug, Deserialize)]
struct RawCluster {
    #[serde(default)]
    values: Vec<GalaxyEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_CLUSTER: &str = r#"{
        "authors": ["Various"],
        "category": "actor",
        "name": "Threat Actor",
        "type": "threat-actor",
        "values": [
            {
                "value": "APT28",
                "meta": {
                    "synonyms": ["Sofacy", "Fancy Bear"],
                    "country": "RU"
                }
            },
            {"value": "Lazarus Group"}
        ]
    }"#;

    #[tokio::test]
    async fn serves_from_cache_without_touching_the_network() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("misp_galaxy_threat-actor.json"),
            SAMPLE_CLUSTER,
        )
        .unwrap();

        // Unroutable base url: any network attempt would fail loudly.
        let provider = OnDemandGalaxyProvider::new(dir.path())
            .with_base_url("http://192.0.2.1/clusters");

        let snapshot = provider.galaxy("threat-actor").await.unwrap();
        assert_eq!(snapshot.name, "threat-actor");
        assert_eq!(snapshot.values.len(), 2);
        assert_eq!(snapshot.values[0].value, "APT28");
        assert_eq!(snapshot.values[0].meta.synonyms, vec!["Sofacy", "Fancy Bear"]);
        // Unknown meta keys ride along in the opaque remainder.
        assert!(snapshot.values[0].meta.extra.contains_key("country"));
        assert!(snapshot.values[1].meta.synonyms.is_empty());
    }

    #[tokio::test]
    async fn force_download_bypasses_the_cache() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("misp_galaxy_threat-actor.json"),
            SAMPLE_CLUSTER,
        )
        .unwrap();

        // A base url that cannot even be parsed: the request fails
        // before any I/O, proving the cache was not consulted.
        let provider = OnDemandGalaxyProvider::new(dir.path())
            .with_base_url("not a url")
            .force_download(true);
        assert!(matches!(
            provider.galaxy("threat-actor").await,
            Err(GalaxyError::Provider(_))
        ));
    }

    #[tokio::test]
    async fn malformed_cache_is_a_data_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("misp_galaxy_tool.json"), "{not json").unwrap();

        let provider =
            OnDemandGalaxyProvider::new(dir.path()).with_base_url("http://192.0.2.1/clusters");
        assert!(matches!(
            provider.galaxy("tool").await,
            Err(GalaxyError::MalformedGalaxy { galaxy, .. }) if galaxy == "tool"
        ));
    }

    #[tokio::test]
    async fn rejects_path_like_galaxy_names() {
        let dir = tempfile::tempdir().unwrap();
        let provider = OnDemandGalaxyProvider::new(dir.path());
        assert!(provider.galaxy("../etc/passwd").await.is_err());
        assert!(provider.galaxy("").await.is_err());
    }

    #[tokio::test]
    #[ignore] // Hits the live misp-galaxy repository
    async fn downloads_and_caches_a_real_cluster() {
        let dir = tempfile::tempdir().unwrap();
        let provider = OnDemandGalaxyProvider::new(dir.path());

        let snapshot = provider.galaxy("threat-actor").await.unwrap();
        assert!(!snapshot.values.is_empty());
        assert!(dir.path().join("misp_galaxy_threat-actor.json").exists());
    }
}
