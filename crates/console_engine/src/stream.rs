use console_logging::{console_debug, console_warn};
use futures_util::StreamExt;
use tokio_util::sync::CancellationToken;

use crate::api::ExtractApi;
use crate::classify::{classify, ClassifiedEvent};
use crate::frame::FrameReassembler;
use crate::{EngineEvent, ErrorKind, EventSink, JobError, JobId};

/// Drives one extraction job: opens the chunked channel, reassembles and
/// classifies records, and emits engine events until a terminal record.
///
/// Cancellation is checked at request issuance and again before every record,
/// so one buffered chunk delivered after an abort never reaches the job log.
pub async fn run_extraction_job(
    api: &dyn ExtractApi,
    job_id: JobId,
    document_id: &str,
    mode: &str,
    cancel: &CancellationToken,
    sink: &dyn EventSink,
) {
    if cancel.is_cancelled() {
        return;
    }

    let mut stream = match api.open_stream(document_id, mode).await {
        Ok(stream) => stream,
        Err(error) => {
            sink.emit(EngineEvent::StreamFailed { job_id, error });
            return;
        }
    };
    sink.emit(EngineEvent::StreamOpened { job_id });

    let mut frames = FrameReassembler::new();
    loop {
        let chunk = tokio::select! {
            _ = cancel.cancelled() => return,
            chunk = stream.next() => chunk,
        };
        let chunk = match chunk {
            Some(Ok(chunk)) => chunk,
            Some(Err(error)) => {
                sink.emit(EngineEvent::StreamFailed { job_id, error });
                return;
            }
            None => break,
        };

        for payload in frames.push(&chunk) {
            if cancel.is_cancelled() {
                return;
            }
            match classify(&payload) {
                Ok(ClassifiedEvent::Log { message }) => {
                    sink.emit(EngineEvent::StreamLogged { job_id, message });
                }
                Ok(ClassifiedEvent::Success { summary }) => {
                    // Terminal record: stop consuming.
                    sink.emit(EngineEvent::StreamSucceeded { job_id, summary });
                    return;
                }
                Ok(ClassifiedEvent::Error { message }) => {
                    sink.emit(EngineEvent::StreamFailed {
                        job_id,
                        error: JobError::new(ErrorKind::Server { status: None }, message),
                    });
                    return;
                }
                Err(err) => {
                    console_warn!("job {job_id}: malformed event record: {err}");
                    sink.emit(EngineEvent::StreamLogged {
                        job_id,
                        message: "warning: skipping malformed event record".to_string(),
                    });
                }
            }
        }
    }

    // Channel closed without a terminal record.
    if let Some(tail) = frames.finish() {
        console_debug!("job {job_id}: discarding partial trailing record: {tail:?}");
    }
    sink.emit(EngineEvent::StreamFailed {
        job_id,
        error: JobError::new(ErrorKind::Network, "extraction stream ended without a result"),
    });
}
