//! Calculator & Greeting Agent server

use calc_greeting_agent::agent::Agent;
use calc_greeting_agent::api::{create_router, AgentCard, AppState};
use calc_greeting_agent::config::{AgentConfig, Cli, LlmConfig};
use calc_greeting_agent::llm::{LlmService, OpenAIService};
use calc_greeting_agent::session::InMemorySessionStore;
use clap::Parser;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // A missing .env is fine
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "calc_greeting_agent=info,tower_http=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    let cli = Cli::parse();

    let llm_config = match LlmConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Error: {e}");
            std::process::exit(1);
        }
    };
    let agent_config = AgentConfig::from_env()?;

    let openai = OpenAIService::new(
        llm_config.api_key,
        llm_config.model,
        llm_config.base_url.as_deref(),
    )?;
    let llm: Arc<dyn LlmService> = Arc::new(openai);
    tracing::info!(
        model = %llm.model_id(),
        max_steps = agent_config.max_steps,
        "LLM backend configured"
    );

    let agent = Agent::new(llm, Arc::new(InMemorySessionStore::new())).with_config(agent_config);
    let state = AppState::new(agent, AgentCard::new(&cli.host, cli.port));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind((cli.host.as_str(), cli.port)).await?;
    tracing::info!("Starting Calculator & Greeting Agent on {}:{}", cli.host, cli.port);
    tracing::info!(
        "Agent Card available at: http://{}:{}/.well-known/agent.json",
        cli.host,
        cli.port
    );
    axum::serve(listener, app).await?;

    Ok(())
}
