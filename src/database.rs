use crate::reply::ApiError;
use personal_site::config::StoreKind;
use personal_site::error::StoreError;
use personal_site::store::{ContentStore, MemoryStore, MySqlStore};
use std::sync::Arc;

pub fn open_store(kind: &StoreKind) -> Result<Arc<dyn ContentStore>, StoreError> {
    match kind {
        StoreKind::Mysql(db_url) => {
            let store = MySqlStore::connect(db_url)?;
            tracing::info!("connected to mysql store");
            Ok(Arc::new(store))
        }
        StoreKind::Memory => {
            tracing::warn!("using in-memory store, content is lost on exit");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

/// Runs a store call on the blocking pool; the mysql driver is synchronous.
pub async fn blocking<T, F>(store: &Arc<dyn ContentStore>, job: F) -> Result<T, ApiError>
where
    F: FnOnce(&dyn ContentStore) -> personal_site::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let store = Arc::clone(store);
    let result = tokio::task::spawn_blocking(move || job(store.as_ref())).await?;
    Ok(result?)
}
