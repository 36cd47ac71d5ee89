use std::sync::Arc;

use anyhow::Context;

use convo_assist::backend::{BackgroundInvoker, HttpChatBackend};
use convo_assist::channels::http::{self, HttpState};
use convo_assist::channels::CliChannel;
use convo_assist::config::{AppConfig, RouterMode};
use convo_assist::error::{ConfigError, Error};
use convo_assist::llm::{LlmProvider, create_provider};
use convo_assist::logging;
use convo_assist::memory::{ConversationStore, HistorySummarizer};
use convo_assist::retrieval::{FixedCorpusRetriever, LiveRetriever, Retriever};
use convo_assist::support::TechnicalSupport;
use convo_assist::tasks::{StatusPoller, TaskRegistry};
use convo_assist::tools;
use convo_assist::turn::{InlinePipeline, TurnRouter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env().context("invalid configuration")?;
    let _log_guard = logging::init(config.log_dir.as_deref())?;

    eprintln!("🤖 Convo Assist v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Mode: {}", config.mode);

    let store = Arc::new(ConversationStore::new());
    let (router, llm) = build_router(&config, Arc::clone(&store))?;
    let router = Arc::new(router);

    let summarizer = Arc::new(
        HistorySummarizer::new(Arc::clone(&store), llm).with_temperature(config.temperature),
    );
    let tools = Arc::new(tools::conversation_tools(Arc::clone(&router), summarizer).await);
    eprintln!("   Tools: {}", tools.list().await.join(", "));

    // ── HTTP tool surface ───────────────────────────────────────────────
    let http_handle = config.http_port.map(|port| {
        eprintln!("   HTTP: http://0.0.0.0:{port}/api/tools/{{name}}");
        let state = HttpState {
            tools: Arc::clone(&tools),
            store: Arc::clone(&store),
            mode: config.mode,
        };
        tokio::spawn(async move {
            if let Err(e) = http::serve(state, port).await {
                tracing::error!(port, error = %e, "HTTP tool surface stopped");
            }
        })
    });

    eprintln!("   User: {}", config.user_id);
    eprintln!("   Type a message and press Enter. /help for commands, /quit to exit.\n");

    let cli = CliChannel::new(
        Arc::clone(&tools),
        Arc::clone(&router),
        StatusPoller::new(config.poll_attempts, config.poll_interval),
        config.user_id.clone(),
    );
    let result = cli.run().await;

    router.registry().abort_all().await;
    if let Some(handle) = http_handle {
        handle.abort();
    }

    result.context("reading from stdin")?;
    Ok(())
}

/// Assemble the turn router for the configured mode. Inline mode also hands
/// back the LLM so the summarizer can share it.
fn build_router(
    config: &AppConfig,
    store: Arc<ConversationStore>,
) -> Result<(TurnRouter, Option<Arc<dyn LlmProvider>>), Error> {
    match config.mode {
        RouterMode::Inline => {
            let llm_config = config.llm.as_ref().ok_or_else(|| ConfigError::MissingRequired {
                key: "CONVO_LLM_BACKEND".to_string(),
                hint: "Inline mode requires an LLM configuration.".to_string(),
            })?;
            let llm = create_provider(llm_config)?;
            eprintln!("   Model: {}", llm.model_name());

            let retriever: Arc<dyn Retriever> = match &config.retriever_url {
                Some(url) => Arc::new(LiveRetriever::new(url.clone())?),
                None => Arc::new(FixedCorpusRetriever::sample()),
            };
            eprintln!("   Retriever: {}", retriever.name());

            let pipeline = InlinePipeline::new(
                Arc::clone(&llm),
                TechnicalSupport::new(retriever),
                store,
            )
            .with_temperature(config.temperature)
            .with_history_limit(config.history_limit);

            Ok((TurnRouter::inline(pipeline), Some(llm)))
        }
        RouterMode::Deferred => {
            let backend_config = config.backend.as_ref().ok_or_else(|| ConfigError::MissingRequired {
                key: "CONVO_BACKEND_URL".to_string(),
                hint: "Deferred mode requires a chat backend configuration.".to_string(),
            })?;
            let backend = HttpChatBackend::new(
                backend_config.url.clone(),
                backend_config.api_key.clone(),
                backend_config.timeout,
            )?;
            eprintln!("   Backend: {}", backend_config.url);

            let invoker = BackgroundInvoker::new(Arc::new(backend), Arc::new(TaskRegistry::new()))
                .with_timeout(backend_config.timeout);

            let router = TurnRouter::deferred(invoker, store).with_history_limit(config.history_limit);
            Ok((router, None))
        }
    }
}
