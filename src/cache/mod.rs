//! Cache module for incremental revalidation
//!
//! Rendered pages are kept in a bounded moka cache for the configured
//! revalidation window and rendered again on the first request after they
//! expire. Preview requests never read from or write to the cache.

use moka::future::Cache;
use std::time::Duration;

/// A rendered page with its response status
#[derive(Debug, Clone)]
pub struct CachedPage {
    pub status: u16,
    pub html: String,
}

/// Rendered pages keyed by request path
#[derive(Clone)]
pub struct RenderCache {
    pages: Option<Cache<String, CachedPage>>,
}

impl RenderCache {
    /// A zero `ttl` or `capacity` disables caching
    pub fn new(ttl: Duration, capacity: u64) -> Self {
        let pages = (!ttl.is_zero() && capacity > 0).then(|| {
            Cache::builder()
                .max_capacity(capacity)
                .time_to_live(ttl)
                .build()
        });

        tracing::debug!(
            cache_capacity = capacity,
            cache_ttl_secs = ttl.as_secs(),
            enabled = pages.is_some(),
            "render cache initialized"
        );

        Self { pages }
    }

    /// The cached page for `path`, if it is still fresh
    pub async fn get(&self, path: &str) -> Option<CachedPage> {
        let page = self.pages.as_ref()?.get(path).await;
        if page.is_some() {
            tracing::debug!("Cache hit: {}", path);
        }
        page
    }

    pub async fn insert(&self, path: &str, status: u16, html: &str) {
        if let Some(pages) = &self.pages {
            let page = CachedPage {
                status,
                html: html.to_string(),
            };
            pages.insert(path.to_string(), page).await;
        }
    }

    /// Number of live entries, after pending evictions are applied
    pub async fn len(&self) -> u64 {
        match &self.pages {
            Some(pages) => {
                pages.run_pending_tasks().await;
                pages.entry_count()
            }
            None => 0,
        }
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_insert_and_get() {
        let cache = RenderCache::new(Duration::from_secs(60), 100);
        assert!(cache.get("/").await.is_none());

        cache.insert("/", 200, "<html>home</html>").await;
        let page = cache.get("/").await.unwrap();
        assert_eq!(page.status, 200);
        assert_eq!(page.html, "<html>home</html>");
        assert!(cache.get("/page/2/").await.is_none());
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_entries_expire() {
        let cache = RenderCache::new(Duration::from_millis(20), 100);
        cache.insert("/post/a", 404, "missing").await;
        assert_eq!(cache.get("/post/a").await.map(|p| p.status), Some(404));

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(cache.get("/post/a").await.is_none());
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_zero_ttl_disables_cache() {
        let cache = RenderCache::new(Duration::ZERO, 100);
        cache.insert("/", 200, "home").await;
        assert!(cache.get("/").await.is_none());
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_capacity_is_bounded() {
        let cache = RenderCache::new(Duration::from_secs(60), 16);
        for i in 0..500 {
            cache.insert(&format!("/post/missing-{}", i), 404, "missing").await;
        }
        assert!(cache.len().await <= 16);
    }
}
