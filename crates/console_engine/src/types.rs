use std::fmt;

pub type JobId = u64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    StreamOpened {
        job_id: JobId,
    },
    StreamLogged {
        job_id: JobId,
        message: String,
    },
    StreamSucceeded {
        job_id: JobId,
        summary: ExtractionSummary,
    },
    StreamFailed {
        job_id: JobId,
        error: JobError,
    },
    ParseDeadlineElapsed {
        job_id: JobId,
        budget_ms: u64,
    },
    ParseResolved {
        job_id: JobId,
        result: Result<ParseSummary, JobError>,
    },
    RedirectDue {
        job_id: JobId,
    },
}

/// Terminal payload of a successful extraction stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionSummary {
    pub pages: u32,
    pub method: String,
    pub chars: u64,
}

/// What the client keeps from a successful parse response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseSummary {
    pub parser_used: String,
    pub extraction_mode_used: String,
    pub num_entries: u32,
    pub saved_as: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobError {
    pub kind: ErrorKind,
    pub message: String,
}

impl JobError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Network,
    /// Failure reported by a service: a non-2xx status, or an error record
    /// inside an otherwise-successful stream (no status).
    Server { status: Option<u16> },
    TimedOut { budget_ms: u64 },
    Cancelled,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Network => write!(f, "network error"),
            ErrorKind::Server { status: Some(code) } => write!(f, "server status {code}"),
            ErrorKind::Server { status: None } => write!(f, "server-reported error"),
            ErrorKind::TimedOut { budget_ms } => {
                write!(f, "timed out after {budget_ms}ms budget")
            }
            ErrorKind::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Formats a timeout budget for human-readable messages.
pub fn format_budget(budget_ms: u64) -> String {
    if budget_ms >= 1000 && budget_ms % 1000 == 0 {
        format!("{}s", budget_ms / 1000)
    } else {
        format!("{budget_ms}ms")
    }
}

pub trait EventSink: Send + Sync {
    fn emit(&self, event: EngineEvent);
}

pub struct ChannelEventSink {
    tx: std::sync::mpsc::Sender<EngineEvent>,
}

impl ChannelEventSink {
    pub fn new(tx: std::sync::mpsc::Sender<EngineEvent>) -> Self {
        Self { tx }
    }
}

impl EventSink for ChannelEventSink {
    fn emit(&self, event: EngineEvent) {
        let _ = self.tx.send(event);
    }
}
