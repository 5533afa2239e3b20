use std::sync::Arc;
use std::time::Duration;

use wellness_intake::cli::CliRepl;
use wellness_intake::config::IntakeConfig;
use wellness_intake::error::Result;
use wellness_intake::intake::IntakeController;
use wellness_intake::llm::create_provider;
use wellness_intake::routes::intake_routes;
use wellness_intake::sessions::{SessionRegistry, spawn_expiry_task};
use wellness_intake::summary::SummaryRenderer;

/// How often idle sessions are swept, capped so short TTLs are honored.
const MAX_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let config = IntakeConfig::from_env()?;
    let cli_mode = std::env::args().skip(1).any(|arg| arg == "--cli");

    eprintln!("🩺 Wellness Intake v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Model: {} (temperature {})", config.model, config.temperature);
    eprintln!("   Detection: {:?}", config.detection);

    let llm = create_provider(&config.llm_config())?;
    let controller = IntakeController::new(llm)
        .with_temperature(config.temperature)
        .with_detection(config.detection);

    if cli_mode {
        eprintln!("   I will help match you with the right counseling expert in ~2 minutes.");
        eprintln!("   Type your answers and press Enter. /help for commands, /quit to exit.");
        let renderer = SummaryRenderer::default();
        let mut repl = CliRepl::new(&controller, &renderer);
        let stdin = tokio::io::BufReader::new(tokio::io::stdin());
        let mut stdout = tokio::io::stdout();
        return repl.run(stdin, &mut stdout).await;
    }

    eprintln!("   Idle sessions expire after {}s", config.session_ttl.as_secs());
    eprintln!("   API: http://0.0.0.0:{}/api/sessions\n", config.port);

    let sessions =
        SessionRegistry::with_idle_ttl(controller, SummaryRenderer::default(), config.session_ttl);
    let sweeper = spawn_expiry_task(
        Arc::clone(&sessions),
        (config.session_ttl / 4).clamp(Duration::from_secs(1), MAX_SWEEP_INTERVAL),
    );
    let app = intake_routes(Arc::clone(&sessions));

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port)).await?;
    tracing::info!(port = config.port, "Intake server started");
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
        })
        .await?;

    sweeper.abort();
    tracing::info!(open_sessions = sessions.count().await, "Intake server stopped");
    Ok(())
}
