//! Layout store construction and dependency injection

use std::sync::Arc;

use sqlx::PgPool;
use tracing::info;

use crate::{
    config::StorageBackend,
    repository::{LayoutRepository, MemoryLayoutRepository, PgLayoutRepository},
    service::{CatalogClient, LayoutPublisher, LayoutStore},
    Config,
};

/// Build the catalog client, if one is configured
pub fn init_catalog(config: &Config) -> anyhow::Result<Option<Arc<CatalogClient>>> {
    if config.catalog.base_url.is_empty() {
        info!("Catalog not configured, content search and section resolution disabled");
        return Ok(None);
    }

    let client = CatalogClient::new(&config.catalog)?;
    info!(base_url = %client.base_url(), "Catalog client initialized");
    Ok(Some(Arc::new(client)))
}

/// Build the layout store for the configured storage backend
///
/// `pool` is required for the postgres backend and ignored otherwise.
pub fn init_layout_store(
    config: &Config,
    pool: Option<PgPool>,
    publisher: Arc<dyn LayoutPublisher>,
    catalog: Option<Arc<CatalogClient>>,
) -> anyhow::Result<LayoutStore> {
    let repository: Arc<dyn LayoutRepository> = match config.storage.backend {
        StorageBackend::Postgres => {
            let pool = pool.ok_or_else(|| {
                anyhow::anyhow!("postgres storage backend selected but no database pool")
            })?;
            info!("Using postgres layout repository");
            Arc::new(PgLayoutRepository::new(pool))
        }
        StorageBackend::Memory => {
            info!("Using in-memory layout repository (layouts are lost on restart)");
            Arc::new(MemoryLayoutRepository::new())
        }
    };

    let mut store = LayoutStore::new(repository, publisher);
    if let Some(catalog) = catalog {
        store = store.with_resolver(catalog, config.catalog.resolve_limit);
    }
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PageKey;
    use crate::service::NoopPublisher;

    #[tokio::test]
    async fn test_memory_backend_store() {
        let mut config = Config::default();
        config.storage.backend = StorageBackend::Memory;

        let store = init_layout_store(&config, None, Arc::new(NoopPublisher), None).unwrap();
        assert!(store.get(&PageKey::home()).await.unwrap().is_empty());
    }

    #[test]
    fn test_postgres_backend_requires_pool() {
        let config = Config::default();
        assert!(init_layout_store(&config, None, Arc::new(NoopPublisher), None).is_err());
    }

    #[test]
    fn test_catalog_disabled_by_default() {
        assert!(init_catalog(&Config::default()).unwrap().is_none());
    }
}
