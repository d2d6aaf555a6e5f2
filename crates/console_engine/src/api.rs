use std::time::Duration;

use bytes::Bytes;
use futures_util::stream::BoxStream;
use futures_util::TryStreamExt;
use serde::Deserialize;

use crate::{ErrorKind, JobError, ParseSummary};

/// Name of the AI-backed parser, which gets the larger timeout budget.
pub const AI_PARSER: &str = "AIParser";

#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub base_url: String,
    pub connect_timeout: Duration,
    /// Timeout budget for rule-based parsers.
    pub default_parse_budget: Duration,
    /// Timeout budget for the AI-backed parser; materially larger.
    pub ai_parse_budget: Duration,
    /// Fixed delay between extraction success and its resolution event.
    pub redirect_delay: Duration,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
            connect_timeout: Duration::from_secs(10),
            default_parse_budget: Duration::from_secs(30),
            ai_parse_budget: Duration::from_secs(120),
            redirect_delay: Duration::from_millis(1200),
        }
    }
}

impl ServiceSettings {
    /// The budget is chosen once, at job start, from the parser identity.
    pub fn parse_budget_for(&self, parser: &str) -> Duration {
        if parser == AI_PARSER {
            self.ai_parse_budget
        } else {
            self.default_parse_budget
        }
    }
}

pub type ByteStream = BoxStream<'static, Result<Bytes, JobError>>;

#[async_trait::async_trait]
pub trait ExtractApi: Send + Sync {
    /// Opens the chunked extraction channel for a document.
    async fn open_stream(&self, document_id: &str, mode: &str) -> Result<ByteStream, JobError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParseRequest {
    pub document_id: String,
    pub parser: String,
    pub prompt: Option<String>,
    pub schema: Option<String>,
    pub page_num: u32,
}

#[async_trait::async_trait]
pub trait ParseApi: Send + Sync {
    /// Issues the single blocking parse request.
    async fn parse(&self, request: &ParseRequest) -> Result<ParseSummary, JobError>;
}

#[async_trait::async_trait]
pub trait StoredOutputApi: Send + Sync {
    /// Reads persisted state: the stored parse document, if any. Used only by
    /// post-timeout reconciliation.
    async fn stored_summary(&self, document_id: &str) -> Result<Option<ParseSummary>, JobError>;
}

/// HTTP implementation of all three service contracts.
pub struct ReqwestApi {
    settings: ServiceSettings,
    client: reqwest::Client,
}

impl ReqwestApi {
    /// Note: no whole-request timeout on the client. The parse deadline is the
    /// job runner's budget, and the extraction stream has no fixed length.
    pub fn new(settings: ServiceSettings) -> Result<Self, JobError> {
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .build()
            .map_err(|err| JobError::new(ErrorKind::Network, err.to_string()))?;
        Ok(Self { settings, client })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.settings.base_url.trim_end_matches('/'), path)
    }
}

#[async_trait::async_trait]
impl ExtractApi for ReqwestApi {
    async fn open_stream(&self, document_id: &str, mode: &str) -> Result<ByteStream, JobError> {
        let response = self
            .client
            .post(self.url("/extract"))
            .form(&[("file_id", document_id), ("mode", mode)])
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(server_error(status.as_u16(), &body));
        }
        Ok(Box::pin(response.bytes_stream().map_err(map_reqwest_error)))
    }
}

#[derive(Debug, Deserialize)]
struct ParseResponse {
    parser_used: String,
    extraction_mode_used: String,
    num_entries: u32,
    saved_as: String,
}

#[async_trait::async_trait]
impl ParseApi for ReqwestApi {
    async fn parse(&self, request: &ParseRequest) -> Result<ParseSummary, JobError> {
        let page_num = request.page_num.to_string();
        let mut form: Vec<(&str, &str)> = vec![
            ("file_id", request.document_id.as_str()),
            ("parser", request.parser.as_str()),
            ("page_num", page_num.as_str()),
        ];
        if let Some(prompt) = request.prompt.as_deref() {
            form.push(("prompt", prompt));
        }
        if let Some(schema) = request.schema.as_deref() {
            form.push(("json_schema", schema));
        }

        let response = self
            .client
            .post(self.url("/parse"))
            .form(&form)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        let body = response.text().await.map_err(map_reqwest_error)?;
        if !status.is_success() {
            return Err(server_error(status.as_u16(), &body));
        }

        let parsed: ParseResponse = serde_json::from_str(&body).map_err(|err| {
            JobError::new(ErrorKind::Network, format!("unreadable parse response: {err}"))
        })?;
        Ok(ParseSummary {
            parser_used: parsed.parser_used,
            extraction_mode_used: parsed.extraction_mode_used,
            num_entries: parsed.num_entries,
            saved_as: parsed.saved_as,
        })
    }
}

#[async_trait::async_trait]
impl StoredOutputApi for ReqwestApi {
    async fn stored_summary(&self, document_id: &str) -> Result<Option<ParseSummary>, JobError> {
        let response = self
            .client
            .get(self.url(&format!("/api/data/{document_id}")))
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if status.as_u16() == 404 {
            return Ok(None);
        }
        let body = response.text().await.map_err(map_reqwest_error)?;
        if !status.is_success() {
            return Err(server_error(status.as_u16(), &body));
        }

        let value: serde_json::Value = serde_json::from_str(&body).map_err(|err| {
            JobError::new(ErrorKind::Network, format!("unreadable stored output: {err}"))
        })?;
        Ok(Some(ParseSummary {
            parser_used: str_or_unknown(&value, "parser"),
            extraction_mode_used: str_or_unknown(&value, "extraction_mode_used"),
            num_entries: value
                .get("num_entries")
                .and_then(serde_json::Value::as_u64)
                .unwrap_or(0) as u32,
            // The store names files by convention; the read endpoint does not
            // repeat the name.
            saved_as: format!("parsed_{document_id}.json"),
        }))
    }
}

fn str_or_unknown(value: &serde_json::Value, name: &str) -> String {
    value
        .get(name)
        .and_then(serde_json::Value::as_str)
        .unwrap_or("unknown")
        .to_string()
}

/// Non-2xx responses pass the server's structured detail through verbatim
/// when present, else fall back to a generic message naming the status.
fn server_error(status: u16, body: &str) -> JobError {
    let detail = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| {
            value
                .get("detail")
                .and_then(serde_json::Value::as_str)
                .map(str::to_string)
        });
    let message = detail.unwrap_or_else(|| format!("service returned status {status}"));
    JobError::new(ErrorKind::Server { status: Some(status) }, message)
}

fn map_reqwest_error(err: reqwest::Error) -> JobError {
    JobError::new(ErrorKind::Network, err.to_string())
}
