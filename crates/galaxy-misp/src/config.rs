use galaxy_core::{GalaxyError, Result};
use serde::Deserialize;
use std::path::Path;

/// Run configuration for talking to a MISP instance, loaded from TOML:
///
/// ```toml
/// [misp]
/// url = "https://misp.example.org"
/// key = "…"
/// verify_ssl = false
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct MispConfig {
    pub misp: MispSection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MispSection {
    /// Base URL of the MISP instance.
    pub url: String,

    /// Automation API key.
    pub key: String,

    /// Verify the server certificate. Off by default; many MISP
    /// deployments run on internal CAs.
    #[serde(default)]
    pub verify_ssl: bool,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    60
}

impl MispConfig {
    /// Read and validate a config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&raw)
            .map_err(|e| GalaxyError::Config(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        reqwest::Url::parse(&self.misp.url)
            .map_err(|e| GalaxyError::Config(format!("invalid MISP url '{}': {e}", self.misp.url)))?;
        if self.misp.key.trim().is_empty() {
            return Err(GalaxyError::Config("MISP api key is empty".into()));
        }
        if self.misp.timeout_secs == 0 {
            return Err(GalaxyError::Config("timeout_secs must be > 0".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_config() {
        let config: MispConfig = toml::from_str(
            r#"
            [misp]
            url = "https://misp.example.org"
            key = "abc123"
            verify_ssl = true
            timeout_secs = 30
            "#,
        )
        .unwrap();
        config.validate().unwrap();
        assert!(config.misp.verify_ssl);
        assert_eq!(config.misp.timeout_secs, 30);
    }

    #[test]
    fn defaults_apply_to_optional_fields() {
        let config: MispConfig = toml::from_str(
            r#"
            [misp]
            url = "https://misp.example.org"
            key = "abc123"
            "#,
        )
        .unwrap();
        assert!(!config.misp.verify_ssl);
        assert_eq!(config.misp.timeout_secs, 60);
    }

    #[test]
    fn rejects_bad_url_and_empty_key() {
        let config: MispConfig = toml::from_str(
            r#"
            [misp]
            url = "not a url"
            key = "abc123"
            "#,
        )
        .unwrap();
        assert!(config.validate().is_err());

        let config: MispConfig = toml::from_str(
            r#"
            [misp]
            url = "https://misp.example.org"
            key = "  "
            "#,
        )
        .unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn load_round_trips_through_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("misp-tools.toml");
        std::fs::write(
            &path,
            "[misp]\nurl = \"https://misp.example.org\"\nkey = \"abc123\"\n",
        )
        .unwrap();

        let config = MispConfig::load(&path).unwrap();
        assert_eq!(config.misp.url, "https://misp.example.org");

        assert!(MispConfig::load(dir.path().join("missing.toml")).is_err());
    }
}
