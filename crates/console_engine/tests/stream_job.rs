use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use console_engine::{
    run_extraction_job, ByteStream, EngineEvent, ErrorKind, EventSink, ExtractApi,
    ExtractionSummary, JobError, ReqwestApi, ServiceSettings,
};
use pretty_assertions::assert_eq;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Default)]
struct TestSink {
    events: Arc<Mutex<Vec<EngineEvent>>>,
}

impl TestSink {
    fn new() -> Self {
        Self::default()
    }

    fn take(&self) -> Vec<EngineEvent> {
        self.events.lock().unwrap().drain(..).collect()
    }
}

impl EventSink for TestSink {
    fn emit(&self, event: EngineEvent) {
        self.events.lock().unwrap().push(event);
    }
}

fn api_for(server: &MockServer) -> ReqwestApi {
    let settings = ServiceSettings {
        base_url: server.uri(),
        ..ServiceSettings::default()
    };
    ReqwestApi::new(settings).expect("client")
}

#[tokio::test]
async fn well_formed_stream_produces_open_logs_and_success() {
    let server = MockServer::start().await;
    let body = "data: {\"type\":\"log\",\"message\":\"Reading PDF\"}\n\
                data: {\"type\":\"log\",\"message\":\"Extracting page 1\"}\n\
                data: {\"type\":\"success\",\"pages\":2,\"method\":\"digital\",\"chars\":840}\n";
    Mock::given(method("POST"))
        .and(path("/extract"))
        .and(body_string_contains("file_id=doc-1"))
        .and(body_string_contains("mode=auto"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .mount(&server)
        .await;

    let api = api_for(&server);
    let sink = TestSink::new();
    let cancel = CancellationToken::new();
    run_extraction_job(&api, 1, "doc-1", "auto", &cancel, &sink).await;

    assert_eq!(
        sink.take(),
        vec![
            EngineEvent::StreamOpened { job_id: 1 },
            EngineEvent::StreamLogged {
                job_id: 1,
                message: "Reading PDF".to_string()
            },
            EngineEvent::StreamLogged {
                job_id: 1,
                message: "Extracting page 1".to_string()
            },
            EngineEvent::StreamSucceeded {
                job_id: 1,
                summary: ExtractionSummary {
                    pages: 2,
                    method: "digital".to_string(),
                    chars: 840,
                }
            },
        ]
    );
}

#[tokio::test]
async fn malformed_records_warn_and_never_abort_the_stream() {
    let server = MockServer::start().await;
    let body = "data: {\"type\":\"log\",\"message\":\"ok\"}\n\
                data: {broken json\n\
                data: {\"type\":\"telemetry\",\"value\":3}\n\
                data: {\"type\":\"success\",\"pages\":1,\"method\":\"ocr\",\"chars\":5}\n";
    Mock::given(method("POST"))
        .and(path("/extract"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .mount(&server)
        .await;

    let api = api_for(&server);
    let sink = TestSink::new();
    let cancel = CancellationToken::new();
    run_extraction_job(&api, 2, "doc-1", "ocr", &cancel, &sink).await;

    let events = sink.take();
    assert_eq!(events.len(), 5);
    assert!(matches!(events[0], EngineEvent::StreamOpened { .. }));
    assert_eq!(
        events[2],
        EngineEvent::StreamLogged {
            job_id: 2,
            message: "warning: skipping malformed event record".to_string()
        }
    );
    assert_eq!(
        events[3],
        EngineEvent::StreamLogged {
            job_id: 2,
            message: "warning: skipping malformed event record".to_string()
        }
    );
    assert!(matches!(events[4], EngineEvent::StreamSucceeded { .. }));
}

#[tokio::test]
async fn error_record_fails_the_job_with_the_message_verbatim() {
    let server = MockServer::start().await;
    let body = "data: {\"type\":\"log\",\"message\":\"Reading PDF\"}\n\
                data: {\"type\":\"error\",\"message\":\"no text layer found\"}\n\
                data: {\"type\":\"log\",\"message\":\"never seen\"}\n";
    Mock::given(method("POST"))
        .and(path("/extract"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .mount(&server)
        .await;

    let api = api_for(&server);
    let sink = TestSink::new();
    let cancel = CancellationToken::new();
    run_extraction_job(&api, 3, "doc-1", "auto", &cancel, &sink).await;

    let events = sink.take();
    assert_eq!(
        events.last(),
        Some(&EngineEvent::StreamFailed {
            job_id: 3,
            error: JobError::new(ErrorKind::Server { status: None }, "no text layer found"),
        })
    );
    // Consumption stopped at the terminal record.
    assert_eq!(events.len(), 3);
}

#[tokio::test]
async fn non_2xx_open_passes_the_detail_through() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/extract"))
        .respond_with(
            ResponseTemplate::new(404).set_body_raw(
                "{\"detail\":\"Original PDF not found\"}",
                "application/json",
            ),
        )
        .mount(&server)
        .await;

    let api = api_for(&server);
    let sink = TestSink::new();
    let cancel = CancellationToken::new();
    run_extraction_job(&api, 4, "missing", "auto", &cancel, &sink).await;

    assert_eq!(
        sink.take(),
        vec![EngineEvent::StreamFailed {
            job_id: 4,
            error: JobError::new(
                ErrorKind::Server { status: Some(404) },
                "Original PDF not found"
            ),
        }]
    );
}

#[tokio::test]
async fn stream_ending_without_terminal_record_is_a_transport_failure() {
    let server = MockServer::start().await;
    let body = "data: {\"type\":\"log\",\"message\":\"started\"}\n\
                data: {\"type\":\"log\",\"mess";
    Mock::given(method("POST"))
        .and(path("/extract"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .mount(&server)
        .await;

    let api = api_for(&server);
    let sink = TestSink::new();
    let cancel = CancellationToken::new();
    run_extraction_job(&api, 5, "doc-1", "auto", &cancel, &sink).await;

    let events = sink.take();
    match events.last() {
        Some(EngineEvent::StreamFailed { error, .. }) => {
            assert_eq!(error.kind, ErrorKind::Network);
            assert!(error.message.contains("ended without a result"));
        }
        other => panic!("expected a stream failure, got {other:?}"),
    }
}

/// Serves a fixed set of chunks without a network; counts stream opens.
struct FakeExtract {
    chunks: Vec<Vec<u8>>,
    opened: Arc<Mutex<u32>>,
}

#[async_trait]
impl ExtractApi for FakeExtract {
    async fn open_stream(&self, _document_id: &str, _mode: &str) -> Result<ByteStream, JobError> {
        *self.opened.lock().unwrap() += 1;
        let items: Vec<Result<bytes::Bytes, JobError>> = self
            .chunks
            .iter()
            .map(|chunk| Ok(bytes::Bytes::from(chunk.clone())))
            .collect();
        Ok(Box::pin(futures_util::stream::iter(items)))
    }
}

/// Cancels the shared token as soon as the first log record is seen, as a
/// user clicking cancel mid-chunk would.
struct CancellingSink {
    inner: TestSink,
    cancel: CancellationToken,
}

impl EventSink for CancellingSink {
    fn emit(&self, event: EngineEvent) {
        let is_log = matches!(event, EngineEvent::StreamLogged { .. });
        self.inner.emit(event);
        if is_log {
            self.cancel.cancel();
        }
    }
}

#[tokio::test]
async fn cancellation_mid_chunk_halts_before_the_next_record() {
    let chunk = b"data: {\"type\":\"log\",\"message\":\"one\"}\n\
                  data: {\"type\":\"log\",\"message\":\"two\"}\n\
                  data: {\"type\":\"success\",\"pages\":1,\"method\":\"digital\",\"chars\":1}\n";
    let api = FakeExtract {
        chunks: vec![chunk.to_vec()],
        opened: Arc::new(Mutex::new(0)),
    };
    let cancel = CancellationToken::new();
    let sink = CancellingSink {
        inner: TestSink::new(),
        cancel: cancel.clone(),
    };

    run_extraction_job(&api, 6, "doc-1", "auto", &cancel, &sink).await;

    // The remaining records of the already-delivered chunk are discarded.
    assert_eq!(
        sink.inner.take(),
        vec![
            EngineEvent::StreamOpened { job_id: 6 },
            EngineEvent::StreamLogged {
                job_id: 6,
                message: "one".to_string()
            },
        ]
    );
}

#[tokio::test]
async fn cancellation_before_issuance_makes_no_network_call() {
    let opened = Arc::new(Mutex::new(0));
    let api = FakeExtract {
        chunks: Vec::new(),
        opened: opened.clone(),
    };
    let cancel = CancellationToken::new();
    cancel.cancel();
    let sink = TestSink::new();

    run_extraction_job(&api, 7, "doc-1", "auto", &cancel, &sink).await;

    assert!(sink.take().is_empty());
    assert_eq!(*opened.lock().unwrap(), 0);
}
