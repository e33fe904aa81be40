use std::sync::Arc;
use tokio::sync::OnceCell;

use crate::Result;

type Loader<T> = Box<dyn Fn() -> Result<Arc<T>> + Send + Sync>;

/// A model client created on first use and kept for the life of the process.
///
/// A failed load leaves the slot empty so the next request tries again.
pub struct LazyModel<T: ?Sized> {
    name: &'static str,
    cell: OnceCell<Arc<T>>,
    loader: Loader<T>,
}

impl<T: ?Sized + 'static> LazyModel<T> {
    pub fn new<F>(name: &'static str, loader: F) -> Self
    where
        F: Fn() -> Result<Arc<T>> + Send + Sync + 'static,
    {
        Self {
            name,
            cell: OnceCell::new(),
            loader: Box::new(loader),
        }
    }

    /// A slot that is already populated
    pub fn ready(name: &'static str, model: Arc<T>) -> Self {
        Self {
            name,
            cell: OnceCell::new_with(Some(model)),
            loader: Box::new(move || -> Result<Arc<T>> {
                anyhow::bail!("{} is already loaded", name)
            }),
        }
    }

    /// Get the model, loading it on first use
    pub async fn get(&self) -> Result<Arc<T>> {
        let model = self
            .cell
            .get_or_try_init(|| async {
                tracing::info!("Loading {}...", self.name);
                (self.loader)()
            })
            .await?;
        Ok(Arc::clone(model))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_loads_once() {
        let loads = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&loads);
        let model: LazyModel<String> = LazyModel::new("test model", move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new("loaded".to_string()))
        });

        assert!(!model.cell.initialized());
        assert_eq!(model.get().await.unwrap().as_str(), "loaded");
        assert_eq!(model.get().await.unwrap().as_str(), "loaded");
        assert!(model.cell.initialized());
        assert_eq!(loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_load_is_retried() {
        let loads = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&loads);
        let model: LazyModel<String> = LazyModel::new("flaky model", move || {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                anyhow::bail!("no token");
            }
            Ok(Arc::new("loaded".to_string()))
        });

        assert!(model.get().await.is_err());
        assert!(!model.cell.initialized());
        assert!(model.get().await.is_ok());
        assert_eq!(loads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_ready_skips_loader() {
        let model = LazyModel::ready("prebuilt", Arc::new(7_u32));
        assert!(model.cell.initialized());
        assert_eq!(*model.get().await.unwrap(), 7);
    }
}
