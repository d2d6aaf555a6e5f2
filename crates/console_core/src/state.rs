use crate::view_model::{ConsoleViewModel, JobView};
use crate::{
    ExtractionSummary, Job, JobFailure, JobId, JobKind, JobLog, JobOutcome, JobPhase, NavTarget,
    ParseSummary, Resolution,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSlot {
    pub job: Job,
    pub log: JobLog,
}

/// Console session state: at most one job slot per kind. A slot keeps the
/// last terminal job visible until a new start replaces it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppState {
    next_job_id: JobId,
    extraction: Option<JobSlot>,
    parse: Option<JobSlot>,
    dirty: bool,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            next_job_id: 1,
            extraction: None,
            parse: None,
            dirty: false,
        }
    }
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view(&self) -> ConsoleViewModel {
        ConsoleViewModel {
            extraction: self.extraction.as_ref().map(JobView::from_slot),
            parse: self.parse.as_ref().map(JobView::from_slot),
            dirty: self.dirty,
        }
    }

    pub fn consume_dirty(&mut self) -> bool {
        let was = self.dirty;
        self.dirty = false;
        was
    }

    fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    fn slot(&self, kind: JobKind) -> Option<&JobSlot> {
        match kind {
            JobKind::Extraction => self.extraction.as_ref(),
            JobKind::Parse => self.parse.as_ref(),
        }
    }

    fn slot_mut(&mut self, kind: JobKind) -> Option<&mut JobSlot> {
        match kind {
            JobKind::Extraction => self.extraction.as_mut(),
            JobKind::Parse => self.parse.as_mut(),
        }
    }

    /// A start of `kind` must be rejected while its current job is live.
    pub(crate) fn kind_busy(&self, kind: JobKind) -> bool {
        self.slot(kind)
            .is_some_and(|slot| !slot.job.phase.is_terminal())
    }

    pub(crate) fn allocate_job_id(&mut self) -> JobId {
        let id = self.next_job_id;
        self.next_job_id += 1;
        id
    }

    pub(crate) fn install_job(&mut self, job: Job, log: JobLog) {
        let kind = job.kind;
        let slot = JobSlot { job, log };
        match kind {
            JobKind::Extraction => self.extraction = Some(slot),
            JobKind::Parse => self.parse = Some(slot),
        }
        self.mark_dirty();
    }

    /// The slot for `kind` iff it still owns `job_id` and is not terminal.
    /// Stale timers and late stream events fail this check and are dropped.
    fn live_slot(&mut self, kind: JobKind, job_id: JobId) -> Option<&mut JobSlot> {
        let slot = self.slot_mut(kind)?;
        if slot.job.id != job_id || slot.job.phase.is_terminal() {
            return None;
        }
        Some(slot)
    }

    pub(crate) fn apply_stream_opened(&mut self, job_id: JobId) {
        if let Some(slot) = self.live_slot(JobKind::Extraction, job_id) {
            if slot.job.phase == JobPhase::Starting {
                slot.job.phase = JobPhase::Streaming;
                self.mark_dirty();
            }
        }
    }

    pub(crate) fn apply_stream_line(&mut self, job_id: JobId, message: String, at_ms: u64) {
        if let Some(slot) = self.live_slot(JobKind::Extraction, job_id) {
            slot.log.push(at_ms, message);
            self.mark_dirty();
        }
    }

    /// Returns true when the redirect delay should be scheduled.
    pub(crate) fn apply_stream_succeeded(
        &mut self,
        job_id: JobId,
        summary: &ExtractionSummary,
        at_ms: u64,
    ) -> bool {
        let Some(slot) = self.live_slot(JobKind::Extraction, job_id) else {
            return false;
        };
        slot.log.push(
            at_ms,
            format!(
                "Extraction complete: {} pages via {}, {} chars",
                summary.pages, summary.method, summary.chars
            ),
        );
        slot.log.seal();
        slot.log.push_synthetic(at_ms, "Opening parse console...");
        slot.job.phase = JobPhase::Succeeded;
        self.mark_dirty();
        true
    }

    pub(crate) fn apply_stream_failed(
        &mut self,
        job_id: JobId,
        failure: JobFailure,
        at_ms: u64,
    ) -> Option<Resolution> {
        let slot = self.live_slot(JobKind::Extraction, job_id)?;
        slot.log
            .push(at_ms, format!("Extraction failed: {}", failure.message));
        slot.log.seal();
        slot.job.phase = JobPhase::Failed;
        slot.job.resolved = true;
        self.mark_dirty();
        Some(Resolution {
            job_id,
            outcome: JobOutcome::Failed(failure),
            navigate_to: None,
        })
    }

    pub(crate) fn apply_redirect_due(&mut self, job_id: JobId) -> Option<Resolution> {
        let slot = self.slot_mut(JobKind::Extraction)?;
        if slot.job.id != job_id || slot.job.phase != JobPhase::Succeeded || slot.job.resolved {
            return None;
        }
        slot.job.resolved = true;
        let document_id = slot.job.document_id.clone();
        Some(Resolution {
            job_id,
            outcome: JobOutcome::Succeeded,
            navigate_to: Some(NavTarget::ParseConsole { document_id }),
        })
    }

    pub(crate) fn apply_parse_deadline(&mut self, job_id: JobId, budget_ms: u64, at_ms: u64) {
        let Some(slot) = self.live_slot(JobKind::Parse, job_id) else {
            return;
        };
        if slot.job.phase != JobPhase::Awaiting {
            return;
        }
        slot.job.phase = JobPhase::Reconciling;
        slot.log.push(
            at_ms,
            format!(
                "No response within {}, checking stored results...",
                format_budget(budget_ms)
            ),
        );
        self.mark_dirty();
    }

    pub(crate) fn apply_parse_resolved(
        &mut self,
        job_id: JobId,
        result: Result<ParseSummary, JobFailure>,
        at_ms: u64,
    ) -> Option<Resolution> {
        let slot = self.live_slot(JobKind::Parse, job_id)?;
        let resolution = match result {
            Ok(summary) => {
                slot.log.push(
                    at_ms,
                    format!(
                        "Parse complete: {} entries via {} ({} extraction)",
                        summary.num_entries, summary.parser_used, summary.extraction_mode_used
                    ),
                );
                slot.log.seal();
                slot.log.push_synthetic(at_ms, "Opening preview...");
                slot.job.phase = JobPhase::Succeeded;
                let document_id = slot.job.document_id.clone();
                Resolution {
                    job_id,
                    outcome: JobOutcome::Succeeded,
                    navigate_to: Some(NavTarget::Preview { document_id }),
                }
            }
            Err(failure) => {
                slot.log
                    .push(at_ms, format!("Parse failed: {}", failure.message));
                slot.log.seal();
                slot.job.phase = JobPhase::Failed;
                Resolution {
                    job_id,
                    outcome: JobOutcome::Failed(failure),
                    navigate_to: None,
                }
            }
        };
        slot.job.resolved = true;
        self.mark_dirty();
        Some(resolution)
    }

    /// Cancels the live job of `kind`, if any. Not offered during
    /// Reconciling: that phase is a single bounded read.
    pub(crate) fn apply_cancel(&mut self, kind: JobKind, at_ms: u64) -> Option<(JobId, Resolution)> {
        let slot = self.slot_mut(kind)?;
        if slot.job.phase.is_terminal() || slot.job.phase == JobPhase::Reconciling {
            return None;
        }
        let job_id = slot.job.id;
        slot.log.push(at_ms, "Cancelled by user");
        slot.log.seal();
        slot.job.phase = JobPhase::Cancelled;
        slot.job.resolved = true;
        self.mark_dirty();
        Some((
            job_id,
            Resolution {
                job_id,
                outcome: JobOutcome::Cancelled,
                navigate_to: None,
            },
        ))
    }
}

pub(crate) fn format_budget(budget_ms: u64) -> String {
    if budget_ms >= 1000 && budget_ms % 1000 == 0 {
        format!("{}s", budget_ms / 1000)
    } else {
        format!("{budget_ms}ms")
    }
}
