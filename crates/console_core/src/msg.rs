use crate::{
    ExtractionMode, ExtractionSummary, JobFailure, JobId, JobKind, ParseOptions, ParseSummary,
    ParserKind,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// User submitted an extraction request for a document.
    ExtractSubmitted {
        document_id: String,
        mode: ExtractionMode,
        at_ms: u64,
    },
    /// User submitted a parse request for a document.
    ParseSubmitted {
        document_id: String,
        parser: ParserKind,
        options: ParseOptions,
        at_ms: u64,
    },
    /// User clicked cancel for the given job kind.
    CancelClicked { kind: JobKind, at_ms: u64 },
    /// The extraction channel opened.
    StreamOpened { job_id: JobId, at_ms: u64 },
    /// One classified log record arrived on the extraction stream.
    StreamLine {
        job_id: JobId,
        message: String,
        at_ms: u64,
    },
    /// The extraction stream delivered its terminal success record.
    StreamSucceeded {
        job_id: JobId,
        summary: ExtractionSummary,
        at_ms: u64,
    },
    /// The extraction stream delivered an error record or broke.
    StreamFailed {
        job_id: JobId,
        failure: JobFailure,
        at_ms: u64,
    },
    /// The parse deadline elapsed before a response; reconciliation started.
    ParseDeadlineElapsed {
        job_id: JobId,
        budget_ms: u64,
        at_ms: u64,
    },
    /// The parse job reached its terminal outcome (response or reconciliation).
    ParseResolved {
        job_id: JobId,
        result: Result<ParseSummary, JobFailure>,
        at_ms: u64,
    },
    /// The post-success redirect delay elapsed.
    RedirectDue { job_id: JobId, at_ms: u64 },
    /// Fallback for placeholder wiring.
    NoOp,
}
