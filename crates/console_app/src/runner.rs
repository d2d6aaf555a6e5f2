use chrono::Utc;
use console_logging::{console_info, console_warn};

use console_core::{Effect, FailureKind, JobFailure, Msg, Resolution};
use console_engine::{EngineEvent, EngineHandle, ErrorKind, ParseRequest};

/// Executes core effects against the engine and maps engine events back into
/// core messages.
pub struct EffectRunner {
    engine: EngineHandle,
}

impl EffectRunner {
    pub fn new(engine: EngineHandle) -> Self {
        Self { engine }
    }

    /// Forwards one effect. Resolution effects are returned to the caller
    /// instead: they terminate the run.
    pub fn apply(&self, effect: Effect) -> Option<Resolution> {
        match effect {
            Effect::StartExtraction {
                job_id,
                document_id,
                mode,
            } => {
                console_info!(
                    "StartExtraction job_id={} document={} mode={}",
                    job_id,
                    document_id,
                    mode.wire_name()
                );
                self.engine
                    .start_extraction(job_id, document_id, mode.wire_name());
                None
            }
            Effect::StartParse {
                job_id,
                document_id,
                parser,
                options,
            } => {
                console_info!(
                    "StartParse job_id={} document={} parser={}",
                    job_id,
                    document_id,
                    parser.wire_name()
                );
                self.engine.start_parse(
                    job_id,
                    ParseRequest {
                        document_id,
                        parser: parser.wire_name().to_string(),
                        prompt: options.prompt,
                        schema: options.schema,
                        page_num: options.page_num,
                    },
                );
                None
            }
            Effect::CancelJob { job_id } => {
                self.engine.cancel(job_id);
                None
            }
            Effect::ScheduleRedirect { job_id } => {
                self.engine.schedule_redirect(job_id);
                None
            }
            Effect::Resolve(resolution) => Some(resolution),
        }
    }

    pub fn poll_event(&self) -> Option<Msg> {
        self.engine
            .try_recv()
            .map(|event| map_event(event, now_ms()))
    }
}

pub fn now_ms() -> u64 {
    Utc::now().timestamp_millis().max(0) as u64
}

fn map_event(event: EngineEvent, at_ms: u64) -> Msg {
    match event {
        EngineEvent::StreamOpened { job_id } => Msg::StreamOpened { job_id, at_ms },
        EngineEvent::StreamLogged { job_id, message } => Msg::StreamLine {
            job_id,
            message,
            at_ms,
        },
        EngineEvent::StreamSucceeded { job_id, summary } => Msg::StreamSucceeded {
            job_id,
            summary: console_core::ExtractionSummary {
                pages: summary.pages,
                method: summary.method,
                chars: summary.chars,
            },
            at_ms,
        },
        EngineEvent::StreamFailed { job_id, error } => {
            console_warn!("job {} failed: {}", job_id, error.message);
            Msg::StreamFailed {
                job_id,
                failure: map_error(error),
                at_ms,
            }
        }
        EngineEvent::ParseDeadlineElapsed { job_id, budget_ms } => Msg::ParseDeadlineElapsed {
            job_id,
            budget_ms,
            at_ms,
        },
        EngineEvent::ParseResolved { job_id, result } => Msg::ParseResolved {
            job_id,
            result: result.map(map_parse_summary).map_err(map_error),
            at_ms,
        },
        EngineEvent::RedirectDue { job_id } => Msg::RedirectDue { job_id, at_ms },
    }
}

fn map_parse_summary(summary: console_engine::ParseSummary) -> console_core::ParseSummary {
    console_core::ParseSummary {
        parser_used: summary.parser_used,
        extraction_mode_used: summary.extraction_mode_used,
        num_entries: summary.num_entries,
        saved_as: summary.saved_as,
    }
}

fn map_error(error: console_engine::JobError) -> JobFailure {
    let kind = match error.kind {
        ErrorKind::Network => FailureKind::Network,
        ErrorKind::Server { status } => FailureKind::Server { status },
        ErrorKind::TimedOut { budget_ms } => FailureKind::TimedOut { budget_ms },
        ErrorKind::Cancelled => FailureKind::Cancelled,
    };
    JobFailure::new(kind, error.message)
}
