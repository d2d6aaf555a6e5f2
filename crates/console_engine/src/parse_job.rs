use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::api::{ParseApi, ParseRequest, StoredOutputApi};
use crate::reconcile::reconcile_after_deadline;
use crate::{EngineEvent, ErrorKind, EventSink, JobError, JobId};

/// Drives one parse job: a single blocking request raced against its timeout
/// budget.
///
/// When the deadline fires first the request is NOT aborted (it may still
/// complete server-side); resolution is handed to a single reconciliation
/// read of persisted state. Explicit cancellation does abort the request.
pub async fn run_parse_job(
    api: Arc<dyn ParseApi>,
    store: Arc<dyn StoredOutputApi>,
    job_id: JobId,
    request: ParseRequest,
    budget: Duration,
    cancel: &CancellationToken,
    sink: &dyn EventSink,
) {
    if cancel.is_cancelled() {
        return;
    }

    let document_id = request.document_id.clone();
    let mut call = {
        let api = api.clone();
        tokio::spawn(async move { api.parse(&request).await })
    };

    tokio::select! {
        _ = cancel.cancelled() => {
            call.abort();
        }
        joined = &mut call => {
            let result = match joined {
                Ok(result) => result,
                Err(join_err) => Err(JobError::new(
                    ErrorKind::Network,
                    format!("parse request task failed: {join_err}"),
                )),
            };
            sink.emit(EngineEvent::ParseResolved { job_id, result });
        }
        _ = tokio::time::sleep(budget) => {
            let budget_ms = budget.as_millis() as u64;
            sink.emit(EngineEvent::ParseDeadlineElapsed { job_id, budget_ms });
            let result = reconcile_after_deadline(store.as_ref(), &document_id, budget_ms).await;
            sink.emit(EngineEvent::ParseResolved { job_id, result });
        }
    }
}
