use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use console_engine::{
    run_parse_job, EngineEvent, ErrorKind, EventSink, JobError, ParseApi, ParseRequest,
    ParseSummary, ReqwestApi, ServiceSettings, StoredOutputApi,
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

fn api_for(server: &MockServer) -> Arc<ReqwestApi> {
    let settings = ServiceSettings {
        base_url: server.uri(),
        ..ServiceSettings::default()
    };
    Arc::new(ReqwestApi::new(settings).expect("client"))
}

fn request(parser: &str) -> ParseRequest {
    ParseRequest {
        document_id: "doc-1".to_string(),
        parser: parser.to_string(),
        prompt: None,
        schema: None,
        page_num: 0,
    }
}

#[tokio::test]
async fn response_before_deadline_resolves_with_zero_reconciliation_reads() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/parse"))
        .and(body_string_contains("file_id=doc-1"))
        .and(body_string_contains("parser=DaybookParser"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            "{\"file_id\":\"doc-1\",\"parser_used\":\"DaybookParser\",\
             \"extraction_mode_used\":\"digital\",\"num_entries\":12,\
             \"message\":\"Parsing complete\",\"saved_as\":\"parsed_doc-1.json\",\
             \"file_path\":\"data/parsed_output/parsed_doc-1.json\"}",
            "application/json",
        ))
        .mount(&server)
        .await;
    // The reconciliation read must never run on the happy path.
    Mock::given(method("GET"))
        .and(path("/api/data/doc-1"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let api = api_for(&server);
    let sink = TestSink::new();
    let cancel = CancellationToken::new();
    run_parse_job(
        api.clone(),
        api,
        1,
        request("DaybookParser"),
        Duration::from_secs(5),
        &cancel,
        &sink,
    )
    .await;

    assert_eq!(
        sink.take(),
        vec![EngineEvent::ParseResolved {
            job_id: 1,
            result: Ok(ParseSummary {
                parser_used: "DaybookParser".to_string(),
                extraction_mode_used: "digital".to_string(),
                num_entries: 12,
                saved_as: "parsed_doc-1.json".to_string(),
            }),
        }]
    );
}

#[tokio::test]
async fn server_error_detail_is_passed_through_verbatim() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/parse"))
        .respond_with(
            ResponseTemplate::new(500)
                .set_body_raw("{\"detail\":\"bad schema\"}", "application/json"),
        )
        .mount(&server)
        .await;

    let api = api_for(&server);
    let sink = TestSink::new();
    let cancel = CancellationToken::new();
    run_parse_job(
        api.clone(),
        api,
        2,
        request("DaybookParser"),
        Duration::from_secs(5),
        &cancel,
        &sink,
    )
    .await;

    assert_eq!(
        sink.take(),
        vec![EngineEvent::ParseResolved {
            job_id: 2,
            result: Err(JobError::new(
                ErrorKind::Server { status: Some(500) },
                "bad schema"
            )),
        }]
    );
}

#[tokio::test]
async fn deadline_with_stored_output_reclassifies_the_job_as_succeeded() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/parse"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/data/doc-1"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            "{\"parser\":\"AIParser\",\"extraction_mode_used\":\"digital\",\
             \"num_entries\":4,\"processing_completed\":true}",
            "application/json",
        ))
        .expect(1)
        .mount(&server)
        .await;

    let api = api_for(&server);
    let sink = TestSink::new();
    let cancel = CancellationToken::new();
    run_parse_job(
        api.clone(),
        api,
        3,
        request("AIParser"),
        Duration::from_millis(100),
        &cancel,
        &sink,
    )
    .await;

    assert_eq!(
        sink.take(),
        vec![
            EngineEvent::ParseDeadlineElapsed {
                job_id: 3,
                budget_ms: 100
            },
            EngineEvent::ParseResolved {
                job_id: 3,
                result: Ok(ParseSummary {
                    parser_used: "AIParser".to_string(),
                    extraction_mode_used: "digital".to_string(),
                    num_entries: 4,
                    saved_as: "parsed_doc-1.json".to_string(),
                }),
            },
        ]
    );
}

#[tokio::test]
async fn deadline_without_stored_output_fails_naming_the_budget() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/parse"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/data/doc-1"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let api = api_for(&server);
    let sink = TestSink::new();
    let cancel = CancellationToken::new();
    run_parse_job(
        api.clone(),
        api,
        4,
        request("AIParser"),
        Duration::from_millis(120),
        &cancel,
        &sink,
    )
    .await;

    let events = sink.take();
    assert_eq!(events.len(), 2);
    match &events[1] {
        EngineEvent::ParseResolved {
            result: Err(error), ..
        } => {
            assert_eq!(error.kind, ErrorKind::TimedOut { budget_ms: 120 });
            assert!(error.message.contains("120"), "message: {}", error.message);
        }
        other => panic!("expected a timed-out failure, got {other:?}"),
    }
}

/// A parse service that never answers; the store is never consulted.
struct HangingParse;

#[async_trait]
impl ParseApi for HangingParse {
    async fn parse(&self, _request: &ParseRequest) -> Result<ParseSummary, JobError> {
        std::future::pending().await
    }
}

struct UnusedStore;

#[async_trait]
impl StoredOutputApi for UnusedStore {
    async fn stored_summary(&self, _document_id: &str) -> Result<Option<ParseSummary>, JobError> {
        panic!("reconciliation must not run for a cancelled job");
    }
}

#[tokio::test]
async fn cancellation_during_awaiting_aborts_without_terminal_event() {
    let sink = TestSink::new();
    let cancel = CancellationToken::new();

    let canceller = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            cancel.cancel();
        })
    };

    run_parse_job(
        Arc::new(HangingParse),
        Arc::new(UnusedStore),
        5,
        request("DaybookParser"),
        Duration::from_secs(30),
        &cancel,
        &sink,
    )
    .await;
    canceller.await.unwrap();

    // The cancelled job resolves in the state layer; the engine stays silent.
    assert!(sink.take().is_empty());
}

#[tokio::test]
async fn cancellation_before_issuance_emits_nothing() {
    let sink = TestSink::new();
    let cancel = CancellationToken::new();
    cancel.cancel();

    run_parse_job(
        Arc::new(HangingParse),
        Arc::new(UnusedStore),
        6,
        request("DaybookParser"),
        Duration::from_secs(30),
        &cancel,
        &sink,
    )
    .await;

    assert!(sink.take().is_empty());
}
