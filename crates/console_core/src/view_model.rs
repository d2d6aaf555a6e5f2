use crate::state::JobSlot;
use crate::{JobId, JobKind, JobPhase, LogEntry};

/// Pure projection of the session for rendering; never a mutator.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConsoleViewModel {
    pub extraction: Option<JobView>,
    pub parse: Option<JobView>,
    pub dirty: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobView {
    pub job_id: JobId,
    pub document_id: String,
    pub kind: JobKind,
    pub phase: JobPhase,
    pub entries: Vec<LogEntry>,
}

impl JobView {
    pub(crate) fn from_slot(slot: &JobSlot) -> Self {
        Self {
            job_id: slot.job.id,
            document_id: slot.job.document_id.clone(),
            kind: slot.job.kind,
            phase: slot.job.phase,
            entries: slot.log.entries().to_vec(),
        }
    }
}
