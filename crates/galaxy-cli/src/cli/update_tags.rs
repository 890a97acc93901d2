use crate::cli::UpdateTagsArgs;
use galaxy_core::{
    galaxy_names_from_tags, GalaxyError, GalaxyProvider, ReconcileStats, Reconciler,
    StaleTagDetector, TagStore,
};
use galaxy_misp::{MispClient, MispConfig, OnDemandGalaxyProvider};
use tracing::{info, warn};

pub async fn run(args: UpdateTagsArgs) -> anyhow::Result<()> {
    let config = MispConfig::load(&args.config)?;
    let client = MispClient::connect(&config)?;

    let cache_dir = args.cache_dir.unwrap_or_else(std::env::temp_dir);
    let provider = OnDemandGalaxyProvider::new(cache_dir);

    info!("Scanning tags");
    let all_tags = client.list_tag_names().await?;
    let galaxy_names = if args.galaxies.is_empty() {
        galaxy_names_from_tags(all_tags.iter().map(String::as_str))
    } else {
        args.galaxies.clone()
    };
    info!(
        "{} tags in the store, {} galaxies to inspect",
        all_tags.len(),
        galaxy_names.len()
    );

    let reconciler = Reconciler::new(&client).dry_run(args.dry_run);
    let mut totals = ReconcileStats::default();

    for galaxy_name in &galaxy_names {
        let snapshot = match provider.galaxy(galaxy_name).await {
            Ok(snapshot) => snapshot,
            // Store tags may reference local or retired galaxies that
            // have no published cluster file; skip those.
            Err(GalaxyError::GalaxyNotFound(_)) => {
                warn!("No cluster data for galaxy '{galaxy_name}', skipping");
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        let prefix = provider.tag_prefix(galaxy_name);
        let applied = all_tags
            .iter()
            .filter(|name| name.starts_with(&prefix))
            .map(String::as_str);

        let detector = StaleTagDetector::new(&snapshot, &prefix);
        let plan = detector.plan(applied);
        for rename in &plan {
            info!(
                "Tag '{}' should be replaced with '{}'",
                rename.old_tag, rename.new_tag
            );
        }
        if plan.is_empty() {
            continue;
        }

        let stats = reconciler.apply(&plan).await?;
        totals.merge(stats);
    }

    if args.dry_run {
        info!(
            "Dry run complete: {} renames across {} entities (nothing applied)",
            totals.renames, totals.entities_seen
        );
    } else {
        info!(
            "Done: {} renames, {} entities processed, {} tags added, {} tags removed",
            totals.renames, totals.entities_seen, totals.tags_added, totals.tags_removed
        );
    }

    Ok(())
}
