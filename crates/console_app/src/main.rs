mod logging;
mod runner;

use std::collections::VecDeque;
use std::thread;
use std::time::Duration;

use console_core::{
    update, AppState, ExtractionMode, JobKind, JobOutcome, JobView, Msg, ParseOptions, ParserKind,
    Resolution,
};
use console_engine::{EngineHandle, ServiceSettings};

use crate::runner::{now_ms, EffectRunner};

fn main() {
    std::process::exit(run());
}

fn run() -> i32 {
    logging::initialize(logging::LogDestination::Terminal);

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = match Command::parse(&args) {
        Some(command) => command,
        None => {
            eprint_usage();
            return 2;
        }
    };

    let mut settings = ServiceSettings::default();
    if let Ok(base_url) = std::env::var("CONSOLE_BASE_URL") {
        settings.base_url = base_url;
    }
    let engine = match EngineHandle::new(settings) {
        Ok(engine) => engine,
        Err(err) => {
            eprintln!("error: {}", err.message);
            return 1;
        }
    };
    let runner = EffectRunner::new(engine);
    drive(&runner, command)
}

/// The console update loop: one message at a time, effects out to the
/// engine, transcript to stdout, until the job's resolution event arrives.
fn drive(runner: &EffectRunner, command: Command) -> i32 {
    let kind = command.kind();
    let mut state = AppState::new();
    let mut queue = VecDeque::from([command.into_msg(now_ms())]);
    let mut printed = 0;

    loop {
        while let Some(msg) = queue.pop_front() {
            let (next, effects) = update(state, msg);
            state = next;
            printed = print_new_lines(&state, kind, printed);
            for effect in effects {
                if let Some(resolution) = runner.apply(effect) {
                    printed = print_new_lines(&state, kind, printed);
                    return finish(&resolution);
                }
            }
        }
        match runner.poll_event() {
            Some(msg) => queue.push_back(msg),
            None => thread::sleep(Duration::from_millis(20)),
        }
    }
}

fn print_new_lines(state: &AppState, kind: JobKind, printed: usize) -> usize {
    let view = state.view();
    let job: Option<&JobView> = match kind {
        JobKind::Extraction => view.extraction.as_ref(),
        JobKind::Parse => view.parse.as_ref(),
    };
    let Some(job) = job else {
        return printed;
    };
    for entry in &job.entries[printed.min(job.entries.len())..] {
        println!("{}", entry.text);
    }
    job.entries.len()
}

fn finish(resolution: &Resolution) -> i32 {
    match &resolution.outcome {
        JobOutcome::Succeeded => {
            if let Some(target) = &resolution.navigate_to {
                println!("Next: {}", target.path());
            }
            0
        }
        JobOutcome::Failed(failure) => {
            eprintln!("error ({}): {}", failure.kind, failure.message);
            1
        }
        JobOutcome::Cancelled => {
            eprintln!("cancelled");
            1
        }
    }
}

enum Command {
    Extract {
        document_id: String,
        mode: ExtractionMode,
    },
    Parse {
        document_id: String,
        parser: ParserKind,
        options: ParseOptions,
    },
}

impl Command {
    fn parse(args: &[String]) -> Option<Self> {
        let mut words = args.iter();
        match words.next()?.as_str() {
            "extract" => {
                let document_id = words.next()?.clone();
                let mode = match words.next() {
                    Some(word) => ExtractionMode::parse(word)?,
                    None => ExtractionMode::Auto,
                };
                if words.next().is_some() {
                    return None;
                }
                Some(Command::Extract { document_id, mode })
            }
            "parse" => {
                let document_id = words.next()?.clone();
                let mut parser = ParserKind::Daybook;
                let mut options = ParseOptions::default();
                let mut first = true;
                while let Some(word) = words.next() {
                    match word.as_str() {
                        "--prompt" => options.prompt = Some(words.next()?.clone()),
                        "--schema" => options.schema = Some(words.next()?.clone()),
                        "--page" => options.page_num = words.next()?.parse().ok()?,
                        other if first => parser = ParserKind::parse(other)?,
                        _ => return None,
                    }
                    first = false;
                }
                Some(Command::Parse {
                    document_id,
                    parser,
                    options,
                })
            }
            _ => None,
        }
    }

    fn kind(&self) -> JobKind {
        match self {
            Command::Extract { .. } => JobKind::Extraction,
            Command::Parse { .. } => JobKind::Parse,
        }
    }

    fn into_msg(self, at_ms: u64) -> Msg {
        match self {
            Command::Extract { document_id, mode } => Msg::ExtractSubmitted {
                document_id,
                mode,
                at_ms,
            },
            Command::Parse {
                document_id,
                parser,
                options,
            } => Msg::ParseSubmitted {
                document_id,
                parser,
                options,
                at_ms,
            },
        }
    }
}

fn eprint_usage() {
    eprintln!("Usage:");
    eprintln!("  console_app extract <document_id> [digital|ocr|auto]");
    eprintln!(
        "  console_app parse <document_id> [DaybookParser|AIParser] \
         [--prompt TEXT] [--schema TEXT] [--page N]"
    );
}
