//! Console engine: IO pipeline for streamed extraction and blocking parse jobs.
mod api;
mod classify;
mod engine;
mod frame;
mod parse_job;
mod reconcile;
mod stream;
mod types;

pub use api::{
    ByteStream, ExtractApi, ParseApi, ParseRequest, ReqwestApi, ServiceSettings, StoredOutputApi,
    AI_PARSER,
};
pub use classify::{classify, ClassifiedEvent, ClassifyError};
pub use engine::EngineHandle;
pub use frame::{FrameReassembler, RECORD_PREFIX};
pub use parse_job::run_parse_job;
pub use reconcile::reconcile_after_deadline;
pub use stream::run_extraction_job;
pub use types::{
    format_budget, ChannelEventSink, EngineEvent, ErrorKind, EventSink, ExtractionSummary,
    JobError, JobId, ParseSummary,
};
