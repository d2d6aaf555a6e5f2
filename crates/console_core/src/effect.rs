use crate::{ExtractionMode, JobFailure, JobId, ParseOptions, ParserKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    StartExtraction {
        job_id: JobId,
        document_id: String,
        mode: ExtractionMode,
    },
    StartParse {
        job_id: JobId,
        document_id: String,
        parser: ParserKind,
        options: ParseOptions,
    },
    /// Close the cancellation token shared with the job's network operation.
    CancelJob { job_id: JobId },
    /// Start the short fixed delay before an extraction success resolves.
    ScheduleRedirect { job_id: JobId },
    /// Deliver the job's resolution event to the caller. Emitted exactly once
    /// per job.
    Resolve(Resolution),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub job_id: JobId,
    pub outcome: JobOutcome,
    pub navigate_to: Option<NavTarget>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Succeeded,
    Failed(JobFailure),
    Cancelled,
}

/// Where the caller should navigate after a successful job. Routing stays
/// with the caller; this only names the destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavTarget {
    ParseConsole { document_id: String },
    Preview { document_id: String },
}

impl NavTarget {
    pub fn path(&self) -> String {
        match self {
            NavTarget::ParseConsole { document_id } => format!("/parse/{document_id}"),
            NavTarget::Preview { document_id } => format!("/preview/{document_id}"),
        }
    }
}
