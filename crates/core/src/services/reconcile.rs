//! Consistency repair for denormalized counters.
//!
//! Request-path writes keep counters in step where they can; this pass fixes
//! whatever a failed follow-up write left behind. Running it twice in a row
//! changes nothing the second time.

use inkpost_common::{AppResult, get_metrics};
use inkpost_db::repositories::ReconcileRepository;
use serde::Serialize;

/// Rows touched by each repair step.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileReport {
    pub orphan_comments_removed: u64,
    pub orphan_replies_removed: u64,
    pub blog_comment_counts_fixed: u64,
    pub blog_like_counts_fixed: u64,
    pub category_counts_fixed: u64,
    pub tag_counts_fixed: u64,
}

impl ReconcileReport {
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.orphan_comments_removed
            + self.orphan_replies_removed
            + self.blog_comment_counts_fixed
            + self.blog_like_counts_fixed
            + self.category_counts_fixed
            + self.tag_counts_fixed
    }
}

#[derive(Clone)]
pub struct ReconcileService {
    reconcile_repo: ReconcileRepository,
}

impl ReconcileService {
    #[must_use]
    pub const fn new(reconcile_repo: ReconcileRepository) -> Self {
        Self { reconcile_repo }
    }

    /// Purge orphaned comments, then recompute every counter.
    ///
    /// Orphans go first so the comment counts see the purged state.
    pub async fn run(&self) -> AppResult<ReconcileReport> {
        let report = ReconcileReport {
            orphan_comments_removed: self.reconcile_repo.purge_orphan_comments().await?,
            orphan_replies_removed: self.reconcile_repo.purge_orphan_replies().await?,
            blog_comment_counts_fixed: self.reconcile_repo.recount_blog_comments().await?,
            blog_like_counts_fixed: self.reconcile_repo.recount_blog_likes().await?,
            category_counts_fixed: self.reconcile_repo.recount_category_blogs().await?,
            tag_counts_fixed: self.reconcile_repo.recount_tag_blogs().await?,
        };

        get_metrics().record_reconcile(report.total());
        if report.total() > 0 {
            tracing::info!(?report, "Reconciliation repaired rows");
        } else {
            tracing::debug!("Reconciliation found nothing to repair");
        }

        Ok(report)
    }
}
