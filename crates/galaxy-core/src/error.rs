use thiserror::Error;

pub type Result<T> = std::result::Result<T, GalaxyError>;

/// Failures of the machinery around the matching engine: providers,
/// tag stores, configuration. These abort a run.
#[derive(Debug, Error)]
pub enum GalaxyError {
    #[error("Galaxy not found: {0}")]
    GalaxyNotFound(String),

    #[error("Malformed galaxy data for '{galaxy}': {source}")]
    MalformedGalaxy {
        galaxy: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Tag store error: {0}")]
    Store(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// The expected negative result of matching one label: no canonical
/// entry matched, or the label is on the rejection list.
///
/// Deliberately not a [`GalaxyError`] variant — callers handle it
/// per-label and move on to the next candidate, so it must never be
/// swallowed into (or surfaced as) a run failure by a stray `?`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("no canonical match for label '{label}' in galaxy '{galaxy}'")]
pub struct FailedDiscernment {
    pub label: String,
    pub galaxy: String,
}
