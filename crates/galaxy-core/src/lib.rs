pub mod types;
pub mod error;
pub mod index;
pub mod discern;
pub mod provider;
pub mod store;
pub mod stale;
pub mod reconcile;

pub use error::{FailedDiscernment, GalaxyError, Result};
pub use types::{
    default_tag_prefix, tag_for, Discernment, EntryMeta, GalaxyEntry, GalaxySnapshot,
    TagRename, TagRenamePlan, GALAXY_TAG_NAMESPACE,
};
pub use index::{normalize, LabelIndex};
pub use discern::{
    discerners_for, profiles, Discern, GalaxyDiscerner, DEFAULT_SEPARATORS, REJECTED_LABELS,
};
pub use provider::{GalaxyProvider, StaticGalaxyProvider};
pub use store::{EntityScope, MemoryTagStore, TagStore, TaggedEntity};
pub use stale::{
    galaxy_names_from_tags, is_suffix_identity, StaleTagDetector, SUFFIX_IDENTITY_GALAXIES,
    SUFFIX_SEPARATOR,
};
pub use reconcile::{ReconcileStats, Reconciler};
