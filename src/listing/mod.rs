//! Listing controller - accumulates pages of posts behind a "load more" action
//!
//! The controller is seeded with the first page (fetched while rendering the
//! listing) and appends each following page in fetch order. Only one load may
//! be in flight at a time: a second `load_more` while one is running returns
//! [`LoadMore::InFlight`] without touching the repository.

use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::cms;
use crate::content::{PostPage, PostStore, PostSummary};

/// Numeric pagination cursor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageCursor {
    /// Last page loaded (1-based)
    pub page: u32,
    pub total_pages: u32,
}

impl PageCursor {
    pub fn new(page: u32, total_pages: u32) -> Self {
        Self { page, total_pages }
    }

    pub fn has_more(&self) -> bool {
        self.page < self.total_pages
    }

    /// Page to request next, if any
    pub fn next_page(&self) -> Option<u32> {
        self.has_more().then(|| self.page + 1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoadPhase {
    Idle,
    Loading,
    Exhausted,
}

/// Outcome of a `load_more` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadMore {
    /// A page was fetched and `added` posts appended
    Loaded { added: usize },
    /// Every page has been loaded; nothing was requested
    Exhausted,
    /// Another load is running; nothing was requested
    InFlight,
}

#[derive(Debug)]
struct ListingState {
    posts: Vec<PostSummary>,
    cursor: PageCursor,
    phase: LoadPhase,
}

impl ListingState {
    fn settle(&mut self) {
        self.phase = if self.cursor.has_more() {
            LoadPhase::Idle
        } else {
            LoadPhase::Exhausted
        };
    }
}

pub struct ListingController {
    store: PostStore,
    page_size: u32,
    state: Mutex<ListingState>,
}

impl ListingController {
    /// Seed the controller with an already fetched first page
    pub fn new(store: PostStore, first: PostPage, page_size: u32) -> Self {
        let mut state = ListingState {
            posts: first.results,
            cursor: PageCursor::new(first.page, first.total_pages),
            phase: LoadPhase::Idle,
        };
        state.settle();

        Self {
            store,
            page_size,
            state: Mutex::new(state),
        }
    }

    /// Fetch the first page and seed a controller with it
    pub async fn load(store: PostStore, page_size: u32) -> cms::Result<Self> {
        let first = store.query_posts(1, page_size).await?;
        Ok(Self::new(store, first, page_size))
    }

    fn lock(&self) -> MutexGuard<'_, ListingState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Snapshot of the accumulated posts in fetch order
    pub fn posts(&self) -> Vec<PostSummary> {
        self.lock().posts.clone()
    }

    pub fn len(&self) -> usize {
        self.lock().posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().posts.is_empty()
    }

    pub fn cursor(&self) -> PageCursor {
        self.lock().cursor
    }

    pub fn has_more(&self) -> bool {
        self.lock().cursor.has_more()
    }

    pub fn is_loading(&self) -> bool {
        self.lock().phase == LoadPhase::Loading
    }

    /// Fetch the next page and append it
    ///
    /// On error the posts and cursor are left as they were and the
    /// controller accepts another `load_more`.
    pub async fn load_more(&self) -> cms::Result<LoadMore> {
        let page = {
            let mut state = self.lock();
            match state.phase {
                LoadPhase::Loading => return Ok(LoadMore::InFlight),
                LoadPhase::Exhausted => return Ok(LoadMore::Exhausted),
                LoadPhase::Idle => {}
            }
            let Some(page) = state.cursor.next_page() else {
                state.phase = LoadPhase::Exhausted;
                return Ok(LoadMore::Exhausted);
            };
            state.phase = LoadPhase::Loading;
            page
        };

        let guard = InFlight { state: &self.state };
        let result = self.store.query_posts(page, self.page_size).await;

        let mut state = self.lock();
        let outcome = match result {
            Ok(next) => {
                let added = next.results.len();
                state.posts.extend(next.results);
                state.cursor = PageCursor::new(next.page, next.total_pages);
                tracing::debug!(
                    "Loaded page {}/{} ({} posts total)",
                    next.page,
                    next.total_pages,
                    state.posts.len()
                );
                Ok(LoadMore::Loaded { added })
            }
            Err(e) => {
                tracing::error!("Failed to load page {}: {}", page, e);
                Err(e)
            }
        };
        state.settle();
        drop(state);
        drop(guard);

        outcome
    }
}

/// Returns the phase to idle if a load is dropped before it completes
struct InFlight<'a> {
    state: &'a Mutex<ListingState>,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.phase == LoadPhase::Loading {
            state.settle();
        }
    }
}
