use crate::error::{GalaxyError, Result};
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::sync::Mutex;
use uuid::Uuid;

/// Which kind of stored entity a tag query runs against. Reconciliation
/// processes all events, then all attributes, strictly in that order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityScope {
    Events,
    Attributes,
}

impl EntityScope {
    pub const ALL: [EntityScope; 2] = [EntityScope::Events, EntityScope::Attributes];
}

impl std::fmt::Display for EntityScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntityScope::Events => write!(f, "events"),
            EntityScope::Attributes => write!(f, "attributes"),
        }
    }
}

/// Handle to one stored entity plus the tag names it carried when
/// fetched. The tag list is a point-in-time view; the store remains
/// the source of truth.
#[derive(Debug, Clone, PartialEq)]
pub struct TaggedEntity {
    pub scope: EntityScope,
    pub uuid: Uuid,
    /// Human-readable handle for progress logging: the event's info
    /// line, or the attribute's uuid rendered as text.
    pub label: String,
    pub tags: Vec<String>,
}

impl TaggedEntity {
    pub fn has_tag(&self, name: &str) -> bool {
        self.tags.iter().any(|tag| tag == name)
    }
}

/// The external tag store. Every method is an independent, idempotent
/// edit or read; there is no transaction across calls, which is why
/// reconciliation must stay safely re-runnable.
#[async_trait]
pub trait TagStore: Send + Sync {
    /// Names of every tag defined in the store.
    async fn list_tag_names(&self) -> Result<BTreeSet<String>>;

    /// Entities in `scope` currently bearing `tag`.
    async fn find_tagged(&self, scope: EntityScope, tag: &str) -> Result<Vec<TaggedEntity>>;

    /// Attach `tag` to the entity, creating the tag definition in the
    /// store first when it does not exist. No-op when already attached.
    async fn add_tag(&self, entity: &TaggedEntity, tag: &str) -> Result<()>;

    /// Detach `tag` from the entity. No-op when not attached.
    async fn remove_tag(&self, entity: &TaggedEntity, tag: &str) -> Result<()>;
}

/// In-memory tag store used in tests. Counts every effective mutation
/// so idempotency can be asserted, not just observed.
#[derive(Debug, Default)]
pub struct MemoryTagStore {
    state: Mutex<MemoryState>,
}

#[derive(Debug, Default)]
struct MemoryState {
    tag_names: BTreeSet<String>,
    entities: Vec<TaggedEntity>,
    mutations: u64,
}

impl MemoryTagStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_entity(&self, entity: TaggedEntity) {
        let mut state = self.state.lock().unwrap();
        for tag in &entity.tags {
            state.tag_names.insert(tag.clone());
        }
        state.entities.push(entity);
    }

    pub fn define_tag(&self, name: impl Into<String>) {
        self.state.lock().unwrap().tag_names.insert(name.into());
    }

    /// Number of state changes performed so far (tag definitions
    /// created, tags attached, tags detached). No-ops don't count.
    pub fn mutation_count(&self) -> u64 {
        self.state.lock().unwrap().mutations
    }

    pub fn entity_tags(&self, uuid: Uuid) -> Vec<String> {
        let state = self.state.lock().unwrap();
        state
            .entities
            .iter()
            .find(|entity| entity.uuid == uuid)
            .map(|entity| entity.tags.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl TagStore for MemoryTagStore {
    async fn list_tag_names(&self) -> Result<BTreeSet<String>> {
        Ok(self.state.lock().unwrap().tag_names.clone())
    }

    async fn find_tagged(&self, scope: EntityScope, tag: &str) -> Result<Vec<TaggedEntity>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .entities
            .iter()
            .filter(|entity| entity.scope == scope && entity.has_tag(tag))
            .cloned()
            .collect())
    }

    async fn add_tag(&self, entity: &TaggedEntity, tag: &str) -> Result<()> {
        let mut guard = self.state.lock().unwrap();
        let state = &mut *guard;
        if state.tag_names.insert(tag.to_string()) {
            state.mutations += 1;
        }
        let stored = state
            .entities
            .iter_mut()
            .find(|candidate| candidate.uuid == entity.uuid)
            .ok_or_else(|| GalaxyError::Store(format!("unknown entity {}", entity.uuid)))?;
        if !stored.tags.iter().any(|existing| existing == tag) {
            stored.tags.push(tag.to_string());
            state.mutations += 1;
        }
        Ok(())
    }

    async fn remove_tag(&self, entity: &TaggedEntity, tag: &str) -> Result<()> {
        let mut guard = self.state.lock().unwrap();
        let state = &mut *guard;
        let stored = state
            .entities
            .iter_mut()
            .find(|candidate| candidate.uuid == entity.uuid)
            .ok_or_else(|| GalaxyError::Store(format!("unknown entity {}", entity.uuid)))?;
        let before = stored.tags.len();
        stored.tags.retain(|existing| existing != tag);
        if stored.tags.len() != before {
            state.mutations += 1;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(tags: &[&str]) -> TaggedEntity {
        TaggedEntity {
            scope: EntityScope::Events,
            uuid: Uuid::new_v4(),
            label: "test event".into(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn add_and_remove_are_idempotent_edits() {
        let store = MemoryTagStore::new();
        let entity = event(&["a"]);
        store.insert_entity(entity.clone());

        store.add_tag(&entity, "b").await.unwrap();
        // definition + attachment
        assert_eq!(store.mutation_count(), 2);

        store.add_tag(&entity, "b").await.unwrap();
        assert_eq!(store.mutation_count(), 2);

        store.remove_tag(&entity, "a").await.unwrap();
        assert_eq!(store.mutation_count(), 3);
        store.remove_tag(&entity, "a").await.unwrap();
        assert_eq!(store.mutation_count(), 3);

        assert_eq!(store.entity_tags(entity.uuid), vec!["b"]);
    }

    #[tokio::test]
    async fn listing_covers_defined_and_carried_tags() {
        let store = MemoryTagStore::new();
        // A tag can be defined in the store without being attached to
        // anything, same as on a real instance.
        store.define_tag("tlp:amber");
        store.insert_entity(event(&["misp-galaxy:threat-actor=\"Sofacy\""]));

        let names = store.list_tag_names().await.unwrap();
        assert!(names.contains("tlp:amber"));
        assert!(names.contains("misp-galaxy:threat-actor=\"Sofacy\""));
        assert_eq!(names.len(), 2);
    }

    #[tokio::test]
    async fn find_tagged_filters_by_scope_and_tag() {
        let store = MemoryTagStore::new();
        let tagged = event(&["x"]);
        store.insert_entity(tagged.clone());
        store.insert_entity(event(&["y"]));

        let found = store.find_tagged(EntityScope::Events, "x").await.unwrap();
        assert_eq!(found, vec![tagged]);
        assert!(store
            .find_tagged(EntityScope::Attributes, "x")
            .await
            .unwrap()
            .is_empty());
    }
}
