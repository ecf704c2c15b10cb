//! `ragline chat`: single-message or interactive grounded chat.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use ragline_config::{AppConfig, TelemetryConfig};
use ragline_core::chat::{ApproachResponse, ChatTurn, RequestOverrides, RetrievalMode, SessionId};
use ragline_core::event::{NoopSink, TelemetrySink};
use ragline_core::retrieval::Retriever;
use ragline_pipeline::ReplyPipeline;
use ragline_providers::{StaticCredential, build_from_config};
use ragline_search::{EmbeddingVectorizer, InMemorySearch};
use ragline_telemetry::{EventRecorder, FanoutSink, TracingSink};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ModeArg {
    Text,
    Vector,
    Hybrid,
}

impl From<ModeArg> for RetrievalMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Text => RetrievalMode::Text,
            ModeArg::Vector => RetrievalMode::Vector,
            ModeArg::Hybrid => RetrievalMode::Hybrid,
        }
    }
}

pub struct ChatOptions {
    pub message: Option<String>,
    pub mode: RetrievalMode,
    pub top: usize,
    pub followups: bool,
    pub exclude_category: Option<String>,
    pub temperature: Option<f32>,
    pub json: bool,
    pub stats: bool,
}

impl ChatOptions {
    fn overrides(&self) -> RequestOverrides {
        RequestOverrides {
            retrieval_mode: Some(self.mode),
            top: Some(self.top),
            exclude_category: self.exclude_category.clone(),
            suggest_followup_questions: Some(self.followups),
            temperature: self.temperature,
            ..Default::default()
        }
    }
}

pub async fn run(options: ChatOptions) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    if !config.has_api_key() && config.provider != "ollama" {
        eprintln!();
        eprintln!("  ERROR: No API key configured!");
        eprintln!();
        eprintln!("  Set one of these environment variables:");
        eprintln!("    RAGLINE_API_KEY=sk-...   (highest priority)");
        eprintln!("    OPENAI_API_KEY=sk-...");
        eprintln!();
        eprintln!("  Or add it to your config file:");
        eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
        eprintln!();
        return Err("No API key found. See above for setup instructions.".into());
    }

    let (sink, recorder) = build_telemetry(&config.telemetry);
    let (pipeline, retriever) = build_pipeline(&config, sink)?;
    let overrides = options.overrides();
    let session = SessionId::new();

    if let Some(message) = &options.message {
        let history = vec![ChatTurn::new(message)];
        eprint!("  Thinking...");
        let result = ask(&pipeline, &history, &overrides, &session).await;
        eprint!("\r              \r");
        let response = result?;
        print_response(&response, options.json)?;
    } else {
        println!();
        println!("  Ragline, interactive mode");
        println!();
        println!("  Provider:  {}", config.provider);
        println!("  Corpus:    {}", retriever.name());
        println!("  Mode:      {}", options.mode);
        println!("  Images:    {}", if pipeline.supports_images() { "on" } else { "off" });
        println!("  Session:   {session}");
        println!();
        println!("  Type your question and press Enter.");
        println!("  '/reset' clears the history, 'exit' quits.");
        println!();

        interactive(&pipeline, &overrides, &session, options.json).await?;

        println!();
        println!("  Goodbye!");
        println!();
    }

    if options.stats {
        match &recorder {
            Some(recorder) => {
                println!("Telemetry");
                println!("─────────────────────────────────────");
                print!("{}", recorder.summary());
            }
            None => println!("Telemetry is disabled (telemetry.enabled = false)."),
        }
    }

    Ok(())
}

async fn interactive(
    pipeline: &ReplyPipeline,
    overrides: &RequestOverrides,
    session: &SessionId,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut history: Vec<ChatTurn> = Vec::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("  You > ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        match line {
            "" => continue,
            "exit" | "quit" => break,
            "/reset" => {
                history.clear();
                println!("  (history cleared)");
                continue;
            }
            _ => {}
        }

        history.push(ChatTurn::new(line));
        eprint!("  ...");
        let result = ask(pipeline, &history, overrides, session).await;
        eprint!("\r     \r");

        match result {
            Ok(response) => {
                println!();
                print_response(&response, json)?;
                println!();
                if let Some(turn) = history.last_mut() {
                    turn.bot = Some(response.answer);
                }
            }
            Err(e) => {
                eprintln!("  [Error] {e}");
                println!();
                history.pop();
            }
        }
    }

    Ok(())
}

/// One reply; Ctrl+C cancels it.
async fn ask(
    pipeline: &ReplyPipeline,
    history: &[ChatTurn],
    overrides: &RequestOverrides,
    session: &SessionId,
) -> ragline_core::Result<ApproachResponse> {
    let cancel = CancellationToken::new();
    let watcher = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        })
    };
    let result = pipeline.reply(history, Some(overrides), session, &cancel).await;
    watcher.abort();
    result
}

fn print_response(response: &ApproachResponse, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    if json {
        println!("{}", serde_json::to_string_pretty(response)?);
        return Ok(());
    }

    for line in response.answer.lines() {
        println!("  Assistant > {line}");
    }
    if !response.data_points.is_empty() {
        println!();
        println!("  Sources:");
        for doc in &response.data_points {
            println!("    [{}]", doc.title);
        }
    }
    if let Some(images) = response.images.as_ref().filter(|i| !i.is_empty()) {
        println!("  Images:");
        for image in images {
            println!("    {} ({})", image.title, image.url);
        }
    }
    Ok(())
}

/// Sinks per config. The recorder is returned for `--stats`.
pub fn build_telemetry(
    config: &TelemetryConfig,
) -> (Arc<dyn TelemetrySink>, Option<Arc<EventRecorder>>) {
    if !config.enabled {
        return (Arc::new(NoopSink), None);
    }
    let recorder = Arc::new(EventRecorder::new(config.capacity));
    let mut fanout = FanoutSink::new().with(recorder.clone());
    if config.log_events {
        fanout = fanout.with(Arc::new(TracingSink));
    }
    (Arc::new(fanout), Some(recorder))
}

/// Wire the pipeline from config: provider, corpus, optional image search,
/// credentials, variants, telemetry.
pub fn build_pipeline(
    config: &AppConfig,
    telemetry: Arc<dyn TelemetrySink>,
) -> Result<(ReplyPipeline, Arc<dyn Retriever>), Box<dyn std::error::Error>> {
    let corpus = config.search.corpus_path.as_deref().ok_or(
        "No corpus configured. Set search.corpus_path in config.toml or run `ragline onboard`.",
    )?;
    let search = InMemorySearch::load(
        Path::new(corpus),
        config.search.images_path.as_deref().map(Path::new),
    )?;
    info!(
        documents = search.document_count(),
        images = search.image_count(),
        "Corpus loaded"
    );
    let retriever: Arc<dyn Retriever> = Arc::new(search);

    let provider = build_from_config(config);
    let mut builder = ReplyPipeline::builder(provider.clone(), retriever.clone())
        .with_config(config)
        .telemetry(telemetry);

    if let Some(model) = &config.search.image_vectorizer_model {
        builder = builder
            .image_vectorizer(Arc::new(EmbeddingVectorizer::new(provider, model.clone())))
            .credentials(Arc::new(StaticCredential::from_storage(&config.storage)));
    }

    Ok((builder.build(), retriever))
}
