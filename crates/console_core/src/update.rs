use crate::{
    AppState, Effect, ExtractionMode, FailureKind, Job, JobFailure, JobKind, JobLog, JobOutcome,
    JobPhase, Msg, ParseOptions, ParserKind, Resolution,
};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let effects = match msg {
        Msg::ExtractSubmitted {
            document_id,
            mode,
            at_ms,
        } => start_extraction(&mut state, document_id, mode, at_ms),
        Msg::ParseSubmitted {
            document_id,
            parser,
            options,
            at_ms,
        } => start_parse(&mut state, document_id, parser, options, at_ms),
        Msg::CancelClicked { kind, at_ms } => match state.apply_cancel(kind, at_ms) {
            Some((job_id, resolution)) => {
                vec![Effect::CancelJob { job_id }, Effect::Resolve(resolution)]
            }
            None => Vec::new(),
        },
        Msg::StreamOpened { job_id, .. } => {
            state.apply_stream_opened(job_id);
            Vec::new()
        }
        Msg::StreamLine {
            job_id,
            message,
            at_ms,
        } => {
            state.apply_stream_line(job_id, message, at_ms);
            Vec::new()
        }
        Msg::StreamSucceeded {
            job_id,
            summary,
            at_ms,
        } => {
            if state.apply_stream_succeeded(job_id, &summary, at_ms) {
                vec![Effect::ScheduleRedirect { job_id }]
            } else {
                Vec::new()
            }
        }
        Msg::StreamFailed {
            job_id,
            failure,
            at_ms,
        } => match state.apply_stream_failed(job_id, failure, at_ms) {
            Some(resolution) => vec![Effect::Resolve(resolution)],
            None => Vec::new(),
        },
        Msg::ParseDeadlineElapsed {
            job_id,
            budget_ms,
            at_ms,
        } => {
            state.apply_parse_deadline(job_id, budget_ms, at_ms);
            Vec::new()
        }
        Msg::ParseResolved {
            job_id,
            result,
            at_ms,
        } => match state.apply_parse_resolved(job_id, result, at_ms) {
            Some(resolution) => vec![Effect::Resolve(resolution)],
            None => Vec::new(),
        },
        Msg::RedirectDue { job_id, .. } => match state.apply_redirect_due(job_id) {
            Some(resolution) => vec![Effect::Resolve(resolution)],
            None => Vec::new(),
        },
        Msg::NoOp => Vec::new(),
    };

    (state, effects)
}

fn start_extraction(
    state: &mut AppState,
    document_id: String,
    mode: ExtractionMode,
    at_ms: u64,
) -> Vec<Effect> {
    // Re-entrant starts are rejected, never queued.
    if state.kind_busy(JobKind::Extraction) {
        return Vec::new();
    }
    let job_id = state.allocate_job_id();
    let mut log = JobLog::new();
    log.push_echo(
        at_ms,
        format!("$ extract --mode {} {}", mode.wire_name(), document_id),
    );

    if document_id.trim().is_empty() {
        return reject_missing_input(state, job_id, document_id, JobKind::Extraction, log, at_ms);
    }

    log.push(at_ms, "Requesting extraction...");
    state.install_job(
        Job {
            id: job_id,
            document_id: document_id.clone(),
            kind: JobKind::Extraction,
            phase: JobPhase::Starting,
            started_at_ms: at_ms,
            resolved: false,
        },
        log,
    );
    vec![Effect::StartExtraction {
        job_id,
        document_id,
        mode,
    }]
}

fn start_parse(
    state: &mut AppState,
    document_id: String,
    parser: ParserKind,
    options: ParseOptions,
    at_ms: u64,
) -> Vec<Effect> {
    if state.kind_busy(JobKind::Parse) {
        return Vec::new();
    }
    let job_id = state.allocate_job_id();
    let mut log = JobLog::new();
    log.push_echo(
        at_ms,
        format!("$ parse --parser {} {}", parser.wire_name(), document_id),
    );

    if document_id.trim().is_empty() {
        return reject_missing_input(state, job_id, document_id, JobKind::Parse, log, at_ms);
    }

    log.push(
        at_ms,
        format!("Parsing extracted text with {}...", parser.wire_name()),
    );
    state.install_job(
        Job {
            id: job_id,
            document_id: document_id.clone(),
            kind: JobKind::Parse,
            phase: JobPhase::Awaiting,
            started_at_ms: at_ms,
            resolved: false,
        },
        log,
    );
    vec![Effect::StartParse {
        job_id,
        document_id,
        parser,
        options,
    }]
}

/// Fails a job before any network call: a required identifier is missing.
fn reject_missing_input(
    state: &mut AppState,
    job_id: crate::JobId,
    document_id: String,
    kind: JobKind,
    mut log: JobLog,
    at_ms: u64,
) -> Vec<Effect> {
    let failure = JobFailure::new(FailureKind::MissingInput, "no document selected");
    let verb = match kind {
        JobKind::Extraction => "Extraction",
        JobKind::Parse => "Parse",
    };
    log.push(at_ms, format!("{verb} failed: {}", failure.message));
    log.seal();
    state.install_job(
        Job {
            id: job_id,
            document_id,
            kind,
            phase: JobPhase::Failed,
            started_at_ms: at_ms,
            resolved: true,
        },
        log,
    );
    vec![Effect::Resolve(Resolution {
        job_id,
        outcome: JobOutcome::Failed(failure),
        navigate_to: None,
    })]
}
