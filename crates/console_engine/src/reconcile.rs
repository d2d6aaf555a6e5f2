use crate::api::StoredOutputApi;
use crate::types::{format_budget, ErrorKind, JobError, ParseSummary};

/// Resolves the post-timeout ambiguity with exactly one read of persisted
/// state: stored output present means the slow parse completed and the job is
/// reclassified as a success, not a failure.
///
/// Presence alone cannot distinguish a fresh result from output left by an
/// earlier parse of the same document; a monotonic job token on the store
/// would close that gap.
pub async fn reconcile_after_deadline(
    store: &dyn StoredOutputApi,
    document_id: &str,
    budget_ms: u64,
) -> Result<ParseSummary, JobError> {
    match store.stored_summary(document_id).await {
        Ok(Some(summary)) => Ok(summary),
        Ok(None) => Err(JobError::new(
            ErrorKind::TimedOut { budget_ms },
            format!(
                "parse did not complete within {} and no stored output was found",
                format_budget(budget_ms)
            ),
        )),
        Err(read_error) => Err(JobError::new(
            ErrorKind::TimedOut { budget_ms },
            format!(
                "parse did not complete within {}; stored-output check failed: {}",
                format_budget(budget_ms),
                read_error.message
            ),
        )),
    }
}
