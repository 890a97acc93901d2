use crate::error::Result;
use crate::store::{EntityScope, TagStore, TaggedEntity};
use crate::types::{TagRename, TagRenamePlan};
use log::info;

/// Counters for one reconciliation pass. A second pass over an
/// already-migrated store reports zero added and zero removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileStats {
    pub renames: usize,
    pub entities_seen: usize,
    pub tags_added: u64,
    pub tags_removed: u64,
}

impl ReconcileStats {
    pub fn merge(&mut self, other: ReconcileStats) {
        self.renames += other.renames;
        self.entities_seen += other.entities_seen;
        self.tags_added += other.tags_added;
        self.tags_removed += other.tags_removed;
    }
}

/// Executes a rename plan against the external tag store.
///
/// All store calls are issued strictly one at a time: every rename
/// against all events, then every rename against all attributes. Each
/// per-entity edit is independently idempotent, so an interrupted run
/// leaves a state the next run finishes from; there is no rollback.
pub struct Reconciler<'a, S: TagStore + ?Sized> {
    store: &'a S,
    dry_run: bool,
}

impl<'a, S: TagStore + ?Sized> Reconciler<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self {
            store,
            dry_run: false,
        }
    }

    /// In dry-run mode every affected entity is still fetched and
    /// logged, but nothing is written.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub async fn apply(&self, plan: &TagRenamePlan) -> Result<ReconcileStats> {
        let mut stats = ReconcileStats {
            renames: plan.len(),
            ..ReconcileStats::default()
        };

        for scope in EntityScope::ALL {
            info!("Processing {scope}");
            for (idx, rename) in plan.iter().enumerate() {
                info!(
                    "[{}/{}] Replacing tag '{}' with '{}'",
                    idx + 1,
                    plan.len(),
                    rename.old_tag,
                    rename.new_tag
                );
                let entities = self.store.find_tagged(scope, &rename.old_tag).await?;
                let total = entities.len();
                for (idx2, entity) in entities.iter().enumerate() {
                    info!("\t[{}/{}] Processing '{}'", idx2 + 1, total, entity.label);
                    stats.entities_seen += 1;
                    if !self.dry_run {
                        self.migrate_entity(entity, rename, &mut stats).await?;
                    }
                }
            }
        }

        Ok(stats)
    }

    /// Migrate one entity from the old tag to the new one. A no-op for
    /// an entity that no longer carries the old tag, and only removes
    /// the old tag when the new one is already present.
    async fn migrate_entity(
        &self,
        entity: &TaggedEntity,
        rename: &TagRename,
        stats: &mut ReconcileStats,
    ) -> Result<()> {
        if !entity.has_tag(&rename.old_tag) {
            return Ok(());
        }
        if !entity.has_tag(&rename.new_tag) {
            self.store.add_tag(entity, &rename.new_tag).await?;
            stats.tags_added += 1;
        }
        self.store.remove_tag(entity, &rename.old_tag).await?;
        stats.tags_removed += 1;
        Ok(())
    }
}
