use crate::cli::QueryArgs;
use galaxy_core::{discerners_for, Discern, DEFAULT_SEPARATORS};
use galaxy_misp::OnDemandGalaxyProvider;
use tracing::info;

pub async fn run(args: QueryArgs) -> anyhow::Result<()> {
    let cache_dir = args.cache_dir.unwrap_or_else(std::env::temp_dir);
    let provider = OnDemandGalaxyProvider::new(cache_dir).force_download(args.force_download);

    info!("Loading {} galaxies", args.galaxies.len());
    let discerners = discerners_for(&provider, &args.galaxies, None).await?;

    let mut tags = Vec::new();
    for discerner in &discerners {
        if args.compound {
            for discernment in
                discerner.discern_compound(&args.query, args.partial, DEFAULT_SEPARATORS)
            {
                tags.push(discernment.tag());
            }
        } else if let Ok(discernment) = discerner.discern(&args.query, args.partial) {
            tags.push(discernment.tag());
        }
    }

    println!("Mapping '{}' to:", args.query);
    for tag in &tags {
        println!("  {tag}");
    }
    if tags.is_empty() {
        println!("  (no match)");
    }

    Ok(())
}
