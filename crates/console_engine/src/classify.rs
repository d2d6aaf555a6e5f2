use serde_json::Value;

use crate::ExtractionSummary;

/// A record payload sorted into the three stream event shapes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassifiedEvent {
    Log { message: String },
    Success { summary: ExtractionSummary },
    Error { message: String },
}

#[derive(Debug, thiserror::Error)]
pub enum ClassifyError {
    #[error("payload is not valid json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("payload has no type discriminator")]
    MissingType,
    #[error("unknown record type `{0}`")]
    UnknownType(String),
    #[error("missing field `{0}`")]
    MissingField(&'static str),
}

/// Classifies one complete record payload. Errors mean warn-and-skip for the
/// caller; they never stop the stream.
pub fn classify(payload: &str) -> Result<ClassifiedEvent, ClassifyError> {
    let value: Value = serde_json::from_str(payload)?;
    let kind = value
        .get("type")
        .and_then(Value::as_str)
        .ok_or(ClassifyError::MissingType)?;
    match kind {
        "log" => Ok(ClassifiedEvent::Log {
            message: str_field(&value, "message")?,
        }),
        "success" => Ok(ClassifiedEvent::Success {
            summary: ExtractionSummary {
                pages: u64_field(&value, "pages")? as u32,
                method: str_field(&value, "method")?,
                chars: u64_field(&value, "chars")?,
            },
        }),
        "error" => Ok(ClassifiedEvent::Error {
            message: str_field(&value, "message")?,
        }),
        other => Err(ClassifyError::UnknownType(other.to_string())),
    }
}

fn str_field(value: &Value, name: &'static str) -> Result<String, ClassifyError> {
    value
        .get(name)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or(ClassifyError::MissingField(name))
}

fn u64_field(value: &Value, name: &'static str) -> Result<u64, ClassifyError> {
    value
        .get(name)
        .and_then(Value::as_u64)
        .ok_or(ClassifyError::MissingField(name))
}
