use dotenvy::dotenv;
use std::sync::Arc;
use stowage::{
    cache::LocalCache,
    config::{database, session::Session, settings},
    core::{Catalog, ItemStore, LocationStore},
    errors::Result,
    remote::{DatabaseRemote, RemoteStore},
};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; variables may also come from the environment
    dotenv().ok();

    // 3. Settings and identity
    let config = settings::load_default_config()
        .inspect_err(|e| error!("Failed to load configuration: {}", e))?;
    let cache_dir = config.storage.cache_dir.clone();
    std::fs::create_dir_all(&cache_dir)?;

    // 4. Build the stores for the configured mode
    let catalog = if config.storage.local_only {
        info!("Running in local-only mode, mirror at {:?}", cache_dir);
        let seeds = config.locations.iter().map(settings::SeedLocation::to_input).collect();
        Catalog::new(
            Arc::new(LocationStore::local(Some(LocalCache::locations(&cache_dir)), seeds)),
            Arc::new(ItemStore::local(Some(LocalCache::items(&cache_dir)))),
        )
    } else {
        let db = database::create_connection()
            .await
            .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
        database::create_tables(&db).await?;

        let session = Session::from_env();
        match session.user_id() {
            Some(user_id) => info!("Signed in as {}", user_id),
            None => warn!("STOWAGE_USER_ID is not set; collections will be empty"),
        }
        let remote: Arc<dyn RemoteStore> = Arc::new(DatabaseRemote::new(db));
        Catalog::new(
            Arc::new(LocationStore::remote(
                Arc::clone(&remote),
                session.clone(),
                Some(LocalCache::locations(&cache_dir)),
            )),
            Arc::new(ItemStore::remote(
                remote,
                session,
                Some(LocalCache::items(&cache_dir)),
            )),
        )
    };

    // 5. Load and report
    catalog
        .load()
        .await
        .inspect_err(|e| error!("Failed to load inventory: {}", e))?;

    let items = catalog.items().await;
    let total_value = catalog
        .item_store()
        .total_value()
        .await
        .inspect_err(|e| error!("Failed to total inventory value: {}", e))?;
    info!(
        "{} locations, {} items, total value {}",
        catalog.locations().all().await.len(),
        items.len(),
        total_value.round_dp(2)
    );
    for summary in catalog.summaries().await? {
        info!(
            "{}: {} loose, {} held in total",
            summary.path, summary.item_count, summary.recursive_item_count
        );
    }

    Ok(())
}
