//! Post search.
//!
//! Ranked full-text matching first; when that finds nothing or the full-text
//! query fails, a case-insensitive substring match ordered by recency.

use inkpost_common::{AppResult, Timer, get_metrics};
use inkpost_db::repositories::BlogRepository;

use super::blog::{BlogService, BlogSummary};

/// Maximum number of search results.
pub const SEARCH_LIMIT: u64 = 20;

/// Service for searching posts.
#[derive(Clone)]
pub struct SearchService {
    blog_repo: BlogRepository,
    blog_service: BlogService,
}

impl SearchService {
    /// Create a new search service.
    #[must_use]
    pub const fn new(blog_repo: BlogRepository, blog_service: BlogService) -> Self {
        Self {
            blog_repo,
            blog_service,
        }
    }

    /// Search posts. A blank query returns nothing.
    pub async fn search(&self, query: &str) -> AppResult<Vec<BlogSummary>> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(vec![]);
        }

        let timer = Timer::start();

        let ranked = match self.blog_repo.search_fulltext(query, SEARCH_LIMIT).await {
            Ok(hits) => hits,
            Err(e) => {
                tracing::warn!(error = %e, "Full-text search failed, using substring match");
                vec![]
            }
        };

        let used_fallback = ranked.is_empty();
        let hits = if used_fallback {
            self.blog_repo.search_substring(query, SEARCH_LIMIT).await?
        } else {
            ranked
        };

        get_metrics().record_search(timer.elapsed(), used_fallback);
        tracing::debug!(results = hits.len(), used_fallback, "Searched posts");

        self.blog_service.summaries(hits).await
    }
}
