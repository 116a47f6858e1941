//! Lesson catalog cache.
//!
//! The ordered lesson list is fetched once per session and cached; neighbor
//! queries for prev/next navigation run against the cached order. A lesson
//! created or reordered after the cache populated is invisible until the next
//! full reload (documented limitation; `refresh` forces one).

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use lesson_core::model::{
    AnnotatedEntry, CatalogEntry, CompletionRecord, CompletionStatus, Lesson, LessonId,
};
use remote::CatalogGateway;

use crate::error::CatalogError;

/// Adjacent catalog entries around a lesson. Absent at either boundary;
/// navigation never wraps.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Neighbors {
    pub previous: Option<CatalogEntry>,
    pub next: Option<CatalogEntry>,
}

/// Cloneable handle to the once-per-session catalog cache.
#[derive(Clone)]
pub struct CatalogService {
    gateway: Arc<dyn CatalogGateway>,
    cache: Arc<Mutex<Option<Vec<CatalogEntry>>>>,
}

impl CatalogService {
    #[must_use]
    pub fn new(gateway: Arc<dyn CatalogGateway>) -> Self {
        Self {
            gateway,
            cache: Arc::new(Mutex::new(None)),
        }
    }

    fn cached(&self) -> Result<Option<Vec<CatalogEntry>>, CatalogError> {
        let cache = self.cache.lock().map_err(|_| CatalogError::Poisoned)?;
        Ok(cache.clone())
    }

    fn fill(&self, entries: Vec<CatalogEntry>) -> Result<Vec<CatalogEntry>, CatalogError> {
        let mut cache = self.cache.lock().map_err(|_| CatalogError::Poisoned)?;
        *cache = Some(entries.clone());
        Ok(entries)
    }

    /// The ordered catalog, fetched on first call and cached thereafter.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` when the initial fetch fails.
    pub async fn entries(&self) -> Result<Vec<CatalogEntry>, CatalogError> {
        if let Some(entries) = self.cached()? {
            return Ok(entries);
        }
        // Two racing first calls may both fetch; the later fill wins with
        // identical data, so nothing is lost.
        let entries = self.gateway.list_lessons().await?;
        self.fill(entries)
    }

    /// Drop the cache and fetch the list again.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` when the fetch fails.
    pub async fn refresh(&self) -> Result<Vec<CatalogEntry>, CatalogError> {
        let entries = self.gateway.list_lessons().await?;
        self.fill(entries)
    }

    /// Find a catalog entry by lesson id.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` when the initial fetch fails.
    pub async fn lookup(&self, id: LessonId) -> Result<Option<CatalogEntry>, CatalogError> {
        let entries = self.entries().await?;
        Ok(entries.into_iter().find(|entry| entry.id == id))
    }

    /// Previous/next entries around the given lesson in catalog order.
    ///
    /// A lesson missing from the catalog has no neighbors.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` when the initial fetch fails.
    pub async fn neighbors(&self, id: LessonId) -> Result<Neighbors, CatalogError> {
        let entries = self.entries().await?;
        let Some(index) = entries.iter().position(|entry| entry.id == id) else {
            return Ok(Neighbors::default());
        };
        Ok(Neighbors {
            previous: index.checked_sub(1).and_then(|i| entries.get(i)).cloned(),
            next: entries.get(index + 1).cloned(),
        })
    }

    /// Catalog entries annotated with the user's completion status for badge
    /// display. Lessons without a record show as not started.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` when the initial fetch fails.
    pub async fn entries_with_status(
        &self,
        records: &[CompletionRecord],
    ) -> Result<Vec<AnnotatedEntry>, CatalogError> {
        let by_lesson: HashMap<LessonId, CompletionStatus> = records
            .iter()
            .map(|record| (record.lesson_id, record.status))
            .collect();
        let entries = self.entries().await?;
        Ok(entries
            .into_iter()
            .map(|entry| {
                let status = by_lesson
                    .get(&entry.id)
                    .copied()
                    .unwrap_or(CompletionStatus::NotStarted);
                AnnotatedEntry { entry, status }
            })
            .collect())
    }

    /// Uncached fetch of a full lesson body.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Remote(RemoteError::NotFound)` for an unknown
    /// id; fatal for the calling view.
    pub async fn lesson(&self, id: LessonId) -> Result<Lesson, CatalogError> {
        Ok(self.gateway.get_lesson(id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use lesson_core::model::UserId;
    use remote::{InMemoryBackend, RemoteError};

    fn lesson(id: u64, title: &str) -> Lesson {
        Lesson::new(LessonId::new(id), title, format!("# {title}"), None, None, None).unwrap()
    }

    fn seeded_backend() -> InMemoryBackend {
        let backend = InMemoryBackend::new();
        backend.add_lesson(lesson(1, "A")).unwrap();
        backend.add_lesson(lesson(2, "B")).unwrap();
        backend.add_lesson(lesson(3, "C")).unwrap();
        backend
    }

    /// Counts catalog fetches so the fetch-once contract is observable.
    struct CountingCatalog {
        inner: InMemoryBackend,
        fetches: AtomicUsize,
    }

    #[async_trait]
    impl CatalogGateway for CountingCatalog {
        async fn list_lessons(&self) -> Result<Vec<CatalogEntry>, RemoteError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            self.inner.list_lessons().await
        }

        async fn get_lesson(&self, id: LessonId) -> Result<Lesson, RemoteError> {
            self.inner.get_lesson(id).await
        }
    }

    #[tokio::test]
    async fn catalog_is_fetched_once_and_cached() {
        let counting = Arc::new(CountingCatalog {
            inner: seeded_backend(),
            fetches: AtomicUsize::new(0),
        });
        let catalog = CatalogService::new(counting.clone());

        catalog.entries().await.unwrap();
        catalog.entries().await.unwrap();
        catalog.neighbors(LessonId::new(2)).await.unwrap();
        assert_eq!(counting.fetches.load(Ordering::SeqCst), 1);

        catalog.refresh().await.unwrap();
        assert_eq!(counting.fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn neighbors_follow_catalog_order_without_wrapping() {
        let catalog = CatalogService::new(Arc::new(seeded_backend()));

        let middle = catalog.neighbors(LessonId::new(2)).await.unwrap();
        assert_eq!(middle.previous.unwrap().title, "A");
        assert_eq!(middle.next.unwrap().title, "C");

        let first = catalog.neighbors(LessonId::new(1)).await.unwrap();
        assert!(first.previous.is_none());
        assert_eq!(first.next.unwrap().title, "B");

        let last = catalog.neighbors(LessonId::new(3)).await.unwrap();
        assert_eq!(last.previous.unwrap().title, "B");
        assert!(last.next.is_none());
    }

    #[tokio::test]
    async fn unknown_lesson_has_no_neighbors() {
        let catalog = CatalogService::new(Arc::new(seeded_backend()));
        let none = catalog.neighbors(LessonId::new(99)).await.unwrap();
        assert_eq!(none, Neighbors::default());
    }

    #[tokio::test]
    async fn entries_with_status_defaults_to_not_started() {
        let catalog = CatalogService::new(Arc::new(seeded_backend()));
        let mut record = CompletionRecord::started(UserId::new(1), LessonId::new(2), "");
        record.mark_completed("x = 3");

        let annotated = catalog.entries_with_status(&[record]).await.unwrap();
        let statuses: Vec<CompletionStatus> = annotated.iter().map(|a| a.status).collect();
        assert_eq!(
            statuses,
            [
                CompletionStatus::NotStarted,
                CompletionStatus::Completed,
                CompletionStatus::NotStarted
            ]
        );
    }
}
