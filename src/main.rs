#![cfg_attr(not(test), deny(clippy::panic))]

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use clap::Parser;

use shooter_server::config;
use shooter_server::logging;
use shooter_server::schema::SchemaValidator;
use shooter_server::scheduler::Scheduler;
use shooter_server::server::ShooterServer;
use shooter_server::websocket;

/// Authoritative server for a realtime 2D multiplayer shooter.
#[derive(Parser, Debug)]
#[command(name = "shooter-server")]
#[command(about = "Authoritative realtime server for a 2D multiplayer shooter")]
#[command(version)]
struct Cli {
    /// Validate configuration and exit without starting the server.
    #[arg(long, short = 'c', conflicts_with = "print_config")]
    validate_config: bool,

    /// Print the loaded configuration to stdout (as JSON) and exit.
    #[arg(long, conflicts_with = "validate_config")]
    print_config: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let cfg = Arc::new(config::load());

    if cli.print_config {
        let json = serde_json::to_string_pretty(&*cfg)
            .map_err(|e| anyhow::anyhow!("failed to serialize config: {e}"))?;
        println!("{json}");
        return Ok(());
    }

    let validation_result = config::validate(&cfg);

    if cli.validate_config {
        match validation_result {
            Ok(()) => {
                println!("Configuration validation passed");
                println!();
                println!("Configuration summary:");
                println!("  Port: {}", cfg.port);
                println!("  Room capacity: {}", cfg.server.room_capacity);
                println!("  Sim tick rate: {} Hz", cfg.server.sim_tick_hz);
                println!("  Kill target: {}", cfg.server.default_kill_target);
                println!("  Time limit: {}s", cfg.server.default_time_limit_secs);
                println!(
                    "  Egress schema validation: {}",
                    cfg.schema.validate_egress
                );
                return Ok(());
            }
            Err(e) => {
                eprintln!("Configuration validation failed:\n{e}");
                std::process::exit(1);
            }
        }
    }

    validation_result?;

    logging::init_with_config(&cfg.logging);

    let schema_validator = Arc::new(
        SchemaValidator::load_from_dir(Path::new(&cfg.schema.schema_dir)).unwrap_or_else(|err| {
            tracing::warn!(
                error = %err,
                dir = %cfg.schema.schema_dir,
                "failed to load schemas; ingress messages will fail validation"
            );
            SchemaValidator::with_no_schemas()
        }),
    );
    tracing::info!(schema_count = schema_validator.schema_count(), "schemas loaded");

    let (server, events) = ShooterServer::new(cfg.clone(), schema_validator);
    let scheduler = Scheduler::start(server.clone(), events);

    let addr = SocketAddr::from(([0, 0, 0, 0], cfg.port));
    let router = websocket::create_router(&cfg.cors_origins).with_state(server.clone());

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "shooter server listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("shutting down");
    scheduler.stop();
    scheduler.join().await;

    Ok(())
}

/// Resolves once on Ctrl+C (or, on Unix, SIGTERM) so the scheduler's two
/// loops and every connection task get a chance to drain before exit.
async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        let mut signal = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler");
        signal.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
