use crate::config::MispConfig;
use async_trait::async_trait;
use galaxy_core::{EntityScope, GalaxyError, Result, TagStore, TaggedEntity};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::collections::BTreeSet;
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

fn store_err(e: reqwest::Error) -> GalaxyError {
    GalaxyError::Store(e.to_string())
}

/// Thin client for the MISP automation API, implementing the
/// [`TagStore`] seam. One request at a time; no retries — a failed
/// call aborts the run and the whole pass is re-runnable.
pub struct MispClient {
    base: reqwest::Url,
    http: reqwest::Client,
}

impl MispClient {
    pub fn connect(config: &MispConfig) -> Result<Self> {
        let mut base = reqwest::Url::parse(&config.misp.url)
            .map_err(|e| GalaxyError::Config(format!("invalid MISP url: {e}")))?;
        // Url::join resolves relative to the last slash, so a subpath
        // base like https://host/misp needs a trailing slash or its
        // final segment is dropped from every request url.
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&config.misp.key)
            .map_err(|e| GalaxyError::Config(format!("invalid MISP api key: {e}")))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .danger_accept_invalid_certs(!config.misp.verify_ssl)
            .timeout(Duration::from_secs(config.misp.timeout_secs))
            .build()
            .map_err(store_err)?;

        Ok(Self { base, http })
    }

    fn url(&self, path: &str) -> Result<reqwest::Url> {
        self.base
            .join(path)
            .map_err(|e| GalaxyError::Store(format!("bad request path '{path}': {e}")))
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        debug!(path, "misp GET");
        self.http
            .get(self.url(path)?)
            .send()
            .await
            .map_err(store_err)?
            .error_for_status()
            .map_err(store_err)?
            .json()
            .await
            .map_err(store_err)
    }

    async fn post_json<T: DeserializeOwned>(&self, path: &str, body: serde_json::Value) -> Result<T> {
        debug!(path, "misp POST");
        self.http
            .post(self.url(path)?)
            .json(&body)
            .send()
            .await
            .map_err(store_err)?
            .error_for_status()
            .map_err(store_err)?
            .json()
            .await
            .map_err(store_err)
    }

    async fn post_ok(&self, path: &str, body: serde_json::Value) -> Result<()> {
        debug!(path, "misp POST");
        self.http
            .post(self.url(path)?)
            .json(&body)
            .send()
            .await
            .map_err(store_err)?
            .error_for_status()
            .map_err(store_err)?;
        Ok(())
    }
}

#[async_trait]
impl TagStore for MispClient {
    async fn list_tag_names(&self) -> Result<BTreeSet<String>> {
        let index: TagIndex = self.get_json("tags").await?;
        Ok(index.tags.into_iter().map(|tag| tag.name).collect())
    }

    async fn find_tagged(&self, scope: EntityScope, tag: &str) -> Result<Vec<TaggedEntity>> {
        match scope {
            EntityScope::Events => {
                let found: EventSearch = self
                    .post_json(
                        "events/restSearch",
                        json!({ "returnFormat": "json", "tags": tag }),
                    )
                    .await?;
                Ok(found
                    .response
                    .into_iter()
                    .map(|wrapper| wrapper.event.into_entity())
                    .collect())
            }
            EntityScope::Attributes => {
                let found: AttributeSearch = self
                    .post_json(
                        "attributes/restSearch",
                        json!({ "returnFormat": "json", "tags": tag }),
                    )
                    .await?;
                Ok(found
                    .response
                    .attributes
                    .into_iter()
                    .map(WireAttribute::into_entity)
                    .collect())
            }
        }
    }

    async fn add_tag(&self, entity: &TaggedEntity, tag: &str) -> Result<()> {
        // attachTagToObject creates the tag definition server-side
        // when it does not exist and is a no-op when already attached.
        self.post_ok(
            "tags/attachTagToObject",
            json!({ "uuid": entity.uuid, "tag": tag }),
        )
        .await
    }

    async fn remove_tag(&self, entity: &TaggedEntity, tag: &str) -> Result<()> {
        self.post_ok(
            "tags/removeTagFromObject",
            json!({ "uuid": entity.uuid, "tag": tag }),
        )
        .await
    }
}

// --- Wire types (MISP JSON shapes, private to the client) ---

#[derive(Debug, Deserialize)]
struct TagIndex {
    #[serde(rename = "Tag", default)]
    tags: Vec<WireTag>,
}

#[derive(Debug, Deserialize)]
struct WireTag {
    name: String,
}

#[derive(Debug, Deserialize)]
struct EventSearch {
    #[serde(default)]
    response: Vec<WireEventWrapper>,
}

#[derive(Debug, Deserialize)]
struct WireEventWrapper {
    #[serde(rename = "Event")]
    event: WireEvent,
}

#[derive(Debug, Deserialize)]
struct WireEvent {
    uuid: Uuid,
    #[serde(default)]
    info: String,
    #[serde(rename = "Tag", default)]
    tags: Vec<WireTag>,
}

impl WireEvent {
    fn into_entity(self) -> TaggedEntity {
        TaggedEntity {
            scope: EntityScope::Events,
            uuid: self.uuid,
            label: self.info,
            tags: self.tags.into_iter().map(|tag| tag.name).collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct AttributeSearch {
    response: WireAttributeList,
}

#[derive(Debug, Deserialize)]
struct WireAttributeList {
    #[serde(rename = "Attribute", default)]
    attributes: Vec<WireAttribute>,
}

#[derive(Debug, Deserialize)]
struct WireAttribute {
    uuid: Uuid,
    #[serde(rename = "Tag", default)]
    tags: Vec<WireTag>,
}

impl WireAttribute {
    fn into_entity(self) -> TaggedEntity {
        let label = self.uuid.to_string();
        TaggedEntity {
            scope: EntityScope::Attributes,
            uuid: self.uuid,
            label,
            tags: self.tags.into_iter().map(|tag| tag.name).collect(),
        }
    }
}
