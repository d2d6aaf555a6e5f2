//! Console core: pure job state machine and view-model helpers.
mod effect;
mod job;
mod log;
mod msg;
mod state;
mod update;
mod view_model;

pub use effect::{Effect, JobOutcome, NavTarget, Resolution};
pub use job::{
    ExtractionMode, ExtractionSummary, FailureKind, Job, JobFailure, JobId, JobKind, JobPhase,
    ParseOptions, ParseSummary, ParserKind,
};
pub use log::{JobLog, LineKind, LogEntry};
pub use msg::Msg;
pub use state::{AppState, JobSlot};
pub use update::update;
pub use view_model::{ConsoleViewModel, JobView};
