//! Pagination controller - accumulates post summaries page by page
//!
//! The accumulated listing is an explicit [`PaginationState`] owned by the
//! caller (one per rendered view). [`PaginationController::load_next`]
//! follows the state's cursor and appends the next page in place; the state
//! is only touched once a page has been fetched and accepted, so a failed,
//! timed out, or cancelled load leaves it ready for a retry.

use indexmap::IndexMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use crate::client::{ContentSource, Cursor, Ordering as QueryOrdering, Predicate, QueryOptions};
use crate::config::SiteConfig;
use crate::content::{reduce_page, PostPage, PostSummary};
use crate::error::{FetchError, Result};

/// Predicates and options of the post listing, newest first
pub fn listing_query(config: &SiteConfig, reference: Option<&str>) -> (Vec<Predicate>, QueryOptions) {
    let predicates = vec![Predicate::document_type(&config.document_type)];
    let options = QueryOptions::new()
        .fetch(config.summary_fields())
        .page_size(config.page_size)
        .orderings(QueryOrdering::last_publication(true))
        .reference(reference);
    (predicates, options)
}

/// Ordered, duplicate-free summaries plus the cursor to the next page
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PaginationState {
    items: IndexMap<String, PostSummary>,
    cursor: Option<Cursor>,
}

impl PaginationState {
    /// Seed the state from an initial page
    pub fn initialize(page: PostPage) -> Self {
        let mut state = Self::default();
        state.append(page);
        state
    }

    /// Summaries in repository order
    pub fn items(&self) -> impl Iterator<Item = &PostSummary> {
        self.items.values()
    }

    pub fn to_vec(&self) -> Vec<PostSummary> {
        self.items.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn cursor(&self) -> Option<&Cursor> {
        self.cursor.as_ref()
    }

    pub fn has_more(&self) -> bool {
        self.cursor.is_some()
    }

    /// Append a page and take over its cursor; returns how many items were new
    fn append(&mut self, page: PostPage) -> usize {
        let before = self.items.len();
        for item in page.items {
            if self.items.contains_key(&item.uid) {
                tracing::warn!("Dropping duplicate post {} from later page", item.uid);
                continue;
            }
            self.items.insert(item.uid.clone(), item);
        }
        self.cursor = page.next_cursor;
        self.items.len() - before
    }
}

/// Result of a `load_next` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// A page was fetched and this many items were appended
    Appended(usize),
    /// No cursor left; nothing was fetched
    Exhausted,
    /// Another load was already in flight on this controller
    Ignored,
    /// The view was cancelled while the page was in flight
    Discarded,
}

impl LoadOutcome {
    pub fn fetched(&self) -> usize {
        match self {
            LoadOutcome::Appended(n) => *n,
            _ => 0,
        }
    }
}

/// Resets the in-flight flag when a load finishes or is dropped
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Fetches pages for one view, at most one request at a time
pub struct PaginationController<S> {
    source: S,
    timeout: Duration,
    in_flight: AtomicBool,
    generation: AtomicU64,
}

impl<S: ContentSource> PaginationController<S> {
    pub fn new(source: S, timeout: Duration) -> Self {
        Self {
            source,
            timeout,
            in_flight: AtomicBool::new(false),
            generation: AtomicU64::new(0),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Invalidate every request issued so far; their responses are dropped
    pub fn cancel(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
    }

    /// Run the initial listing query and seed a state from it
    pub async fn load_first(
        &self,
        predicates: &[Predicate],
        options: &QueryOptions,
    ) -> Result<PaginationState> {
        let response = self.bounded(self.source.query(predicates, options)).await?;
        let state = PaginationState::initialize(reduce_page(response));
        tracing::debug!(
            "Loaded first page: {} posts, more={}",
            state.len(),
            state.has_more()
        );
        Ok(state)
    }

    /// Follow the cursor and append the next page to `state`
    pub async fn load_next(&self, state: &mut PaginationState) -> Result<LoadOutcome> {
        let Some(cursor) = state.cursor.clone() else {
            return Ok(LoadOutcome::Exhausted);
        };

        let Some(_guard) = InFlight::acquire(&self.in_flight) else {
            tracing::debug!("Load already in flight, ignoring {}", cursor);
            return Ok(LoadOutcome::Ignored);
        };

        let issued = self.generation.load(Ordering::Acquire);
        let response = self.bounded(self.source.fetch_page(&cursor)).await?;

        if self.generation.load(Ordering::Acquire) != issued {
            tracing::debug!("Discarding stale page for {}", cursor);
            return Ok(LoadOutcome::Discarded);
        }

        let appended = state.append(reduce_page(response));
        tracing::debug!("Appended {} posts, more={}", appended, state.has_more());
        Ok(LoadOutcome::Appended(appended))
    }

    /// Keep loading until the cursor runs out or `max_pages` follow-ups were made
    pub async fn load_all(
        &self,
        state: &mut PaginationState,
        max_pages: Option<usize>,
    ) -> Result<usize> {
        let mut pages = 0;
        while state.has_more() && max_pages.map_or(true, |max| pages < max) {
            match self.load_next(state).await? {
                LoadOutcome::Appended(_) => pages += 1,
                LoadOutcome::Exhausted => break,
                LoadOutcome::Ignored | LoadOutcome::Discarded => break,
            }
        }
        Ok(pages)
    }

    /// Seed a state and accumulate up to the first `pages` pages into it
    ///
    /// Returns the state and how many pages it holds, which is less than
    /// `pages` when the listing runs out first.
    pub async fn load_through(
        &self,
        predicates: &[Predicate],
        options: &QueryOptions,
        pages: usize,
    ) -> Result<(PaginationState, usize)> {
        let mut state = self.load_first(predicates, options).await?;
        let followed = self.load_all(&mut state, Some(pages.saturating_sub(1))).await?;
        Ok((state, followed + 1))
    }

    async fn bounded<T>(
        &self,
        request: impl Future<Output = std::result::Result<T, FetchError>>,
    ) -> std::result::Result<T, FetchError> {
        match tokio::time::timeout(self.timeout, request).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout(self.timeout)),
        }
    }
}
