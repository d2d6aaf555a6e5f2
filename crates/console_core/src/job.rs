use std::fmt;

pub type JobId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobKind {
    Extraction,
    Parse,
}

/// Text extraction strategy requested from the extraction service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionMode {
    Digital,
    Ocr,
    Auto,
}

impl ExtractionMode {
    pub fn wire_name(self) -> &'static str {
        match self {
            ExtractionMode::Digital => "digital",
            ExtractionMode::Ocr => "ocr",
            ExtractionMode::Auto => "auto",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "digital" => Some(ExtractionMode::Digital),
            "ocr" => Some(ExtractionMode::Ocr),
            "auto" => Some(ExtractionMode::Auto),
            _ => None,
        }
    }
}

/// Parser identity sent to the parse service. The AI-backed parser gets a
/// materially larger timeout budget than the rule-based one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserKind {
    Daybook,
    Ai,
}

impl ParserKind {
    pub fn wire_name(self) -> &'static str {
        match self {
            ParserKind::Daybook => "DaybookParser",
            ParserKind::Ai => "AIParser",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "DaybookParser" => Some(ParserKind::Daybook),
            "AIParser" => Some(ParserKind::Ai),
            _ => None,
        }
    }
}

/// Optional knobs forwarded to the parse service for AI-backed parsing.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParseOptions {
    pub prompt: Option<String>,
    pub schema: Option<String>,
    pub page_num: u32,
}

/// Lifecycle phase of a job. Extraction jobs move Starting -> Streaming ->
/// terminal; parse jobs move Awaiting -> terminal, possibly via Reconciling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobPhase {
    Starting,
    Streaming,
    Awaiting,
    Reconciling,
    Succeeded,
    Failed,
    Cancelled,
}

impl JobPhase {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobPhase::Succeeded | JobPhase::Failed | JobPhase::Cancelled
        )
    }
}

/// One logical invocation of an extraction or parse operation for a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub id: JobId,
    pub document_id: String,
    pub kind: JobKind,
    pub phase: JobPhase,
    pub started_at_ms: u64,
    /// Whether the resolution event for this job has already been emitted.
    pub resolved: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionSummary {
    pub pages: u32,
    pub method: String,
    pub chars: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseSummary {
    pub parser_used: String,
    pub extraction_mode_used: String,
    pub num_entries: u32,
    pub saved_as: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl JobFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// A required local identifier was missing before any network call.
    MissingInput,
    /// Connection or transport failure; retry-eligible.
    Network,
    /// Failure reported by a service: a non-2xx status, or an error record
    /// inside an otherwise-successful stream (no status).
    Server { status: Option<u16> },
    /// The timeout budget elapsed and reconciliation found no stored output.
    TimedOut { budget_ms: u64 },
    Cancelled,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::MissingInput => write!(f, "missing input"),
            FailureKind::Network => write!(f, "network error"),
            FailureKind::Server { status: Some(code) } => write!(f, "server status {code}"),
            FailureKind::Server { status: None } => write!(f, "server-reported error"),
            FailureKind::TimedOut { budget_ms } => {
                write!(f, "timed out after {budget_ms}ms budget")
            }
            FailureKind::Cancelled => write!(f, "cancelled"),
        }
    }
}
