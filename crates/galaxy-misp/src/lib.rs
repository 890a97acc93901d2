//! MISP-backed implementations of the galaxy-core seams: a REST tag
//! store client, an on-demand galaxy cluster provider with a local
//! file cache, and the TOML run configuration.

pub mod client;
pub mod config;
pub mod on_demand;

pub use client::MispClient;
pub use config::{MispConfig, MispSection};
pub use on_demand::{OnDemandGalaxyProvider, DEFAULT_CLUSTER_BASE_URL};
