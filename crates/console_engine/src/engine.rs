use std::collections::HashMap;
use std::sync::{mpsc, Arc};
use std::thread;

use console_logging::console_error;
use tokio_util::sync::CancellationToken;

use crate::api::{ExtractApi, ParseApi, ParseRequest, ReqwestApi, ServiceSettings, StoredOutputApi};
use crate::parse_job::run_parse_job;
use crate::stream::run_extraction_job;
use crate::types::{ChannelEventSink, EngineEvent, EventSink, JobError, JobId};

enum EngineCommand {
    Extract {
        job_id: JobId,
        document_id: String,
        mode: String,
    },
    Parse {
        job_id: JobId,
        request: ParseRequest,
    },
    Cancel {
        job_id: JobId,
    },
    ScheduleRedirect {
        job_id: JobId,
    },
}

struct Services {
    extract: Arc<dyn ExtractApi>,
    parse: Arc<dyn ParseApi>,
    store: Arc<dyn StoredOutputApi>,
    settings: ServiceSettings,
}

/// Owns the engine runtime thread. Commands in, events out, both over mpsc;
/// the caller polls [`try_recv`](Self::try_recv) from its own loop.
pub struct EngineHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
    event_rx: mpsc::Receiver<EngineEvent>,
}

impl EngineHandle {
    pub fn new(settings: ServiceSettings) -> Result<Self, JobError> {
        let api = Arc::new(ReqwestApi::new(settings.clone())?);
        Ok(Self::with_services(
            api.clone(),
            api.clone(),
            api,
            settings,
        ))
    }

    /// Runs the engine over custom service implementations.
    pub fn with_services(
        extract: Arc<dyn ExtractApi>,
        parse: Arc<dyn ParseApi>,
        store: Arc<dyn StoredOutputApi>,
        settings: ServiceSettings,
    ) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();
        let services = Services {
            extract,
            parse,
            store,
            settings,
        };

        thread::spawn(move || run_engine_loop(cmd_rx, event_tx, services));

        Self { cmd_tx, event_rx }
    }

    pub fn start_extraction(
        &self,
        job_id: JobId,
        document_id: impl Into<String>,
        mode: impl Into<String>,
    ) {
        let _ = self.cmd_tx.send(EngineCommand::Extract {
            job_id,
            document_id: document_id.into(),
            mode: mode.into(),
        });
    }

    pub fn start_parse(&self, job_id: JobId, request: ParseRequest) {
        let _ = self.cmd_tx.send(EngineCommand::Parse { job_id, request });
    }

    pub fn cancel(&self, job_id: JobId) {
        let _ = self.cmd_tx.send(EngineCommand::Cancel { job_id });
    }

    pub fn schedule_redirect(&self, job_id: JobId) {
        let _ = self.cmd_tx.send(EngineCommand::ScheduleRedirect { job_id });
    }

    pub fn try_recv(&self) -> Option<EngineEvent> {
        self.event_rx.try_recv().ok()
    }
}

fn run_engine_loop(
    cmd_rx: mpsc::Receiver<EngineCommand>,
    event_tx: mpsc::Sender<EngineEvent>,
    services: Services,
) {
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(err) => {
            console_error!("failed to start engine runtime: {err}");
            return;
        }
    };
    let mut tokens: HashMap<JobId, CancellationToken> = HashMap::new();

    while let Ok(command) = cmd_rx.recv() {
        tokens.retain(|_, token| !token.is_cancelled());
        match command {
            EngineCommand::Extract {
                job_id,
                document_id,
                mode,
            } => {
                let token = CancellationToken::new();
                tokens.insert(job_id, token.clone());
                let extract = services.extract.clone();
                let sink = ChannelEventSink::new(event_tx.clone());
                runtime.spawn(async move {
                    // The guard closes the token on every exit path.
                    let _closed = token.clone().drop_guard();
                    run_extraction_job(
                        extract.as_ref(),
                        job_id,
                        &document_id,
                        &mode,
                        &token,
                        &sink,
                    )
                    .await;
                });
            }
            EngineCommand::Parse { job_id, request } => {
                let token = CancellationToken::new();
                tokens.insert(job_id, token.clone());
                let parse = services.parse.clone();
                let store = services.store.clone();
                let budget = services.settings.parse_budget_for(&request.parser);
                let sink = ChannelEventSink::new(event_tx.clone());
                runtime.spawn(async move {
                    let _closed = token.clone().drop_guard();
                    run_parse_job(parse, store, job_id, request, budget, &token, &sink).await;
                });
            }
            EngineCommand::Cancel { job_id } => {
                // Closing twice is a no-op; unknown ids mean the job already
                // tore down.
                if let Some(token) = tokens.get(&job_id) {
                    token.cancel();
                }
            }
            EngineCommand::ScheduleRedirect { job_id } => {
                let delay = services.settings.redirect_delay;
                let sink = ChannelEventSink::new(event_tx.clone());
                runtime.spawn(async move {
                    tokio::time::sleep(delay).await;
                    sink.emit(EngineEvent::RedirectDue { job_id });
                });
            }
        }
    }

    // Consumer teardown: the command channel closed, so no one can cancel
    // explicitly anymore. Close every token.
    for token in tokens.values() {
        token.cancel();
    }
}
