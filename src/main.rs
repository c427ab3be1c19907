//! higit-core - Git repository sessions and SSH identity over HTTP
//!
//! # Usage
//! ```bash
//! higit-core --base-path ~/.local/share/higit           # Start server
//! HIGIT_PORT=4000 higit-core                            # Port from the environment
//! higit-core --base-path /tmp/higit --accept-invalid-certs
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use clap::Parser;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use higit_core::config::{AppConfig, EngineOptions, HostCertPolicy, IdentitySettings};
use higit_core::git::engine;
use higit_core::{Core, routes};

/// Git repository sessions and SSH identity for the HiGit client
#[derive(Parser)]
#[command(name = "higit-core")]
#[command(about = "Git repository sessions and SSH identity over HTTP", long_about = None)]
struct Cli {
    /// Application files directory (SSH keys, repositories, cert.pem)
    #[arg(long, env = "HIGIT_BASE_PATH", value_name = "DIR")]
    base_path: Option<PathBuf>,

    /// Port to run the server on
    #[arg(short, long, env = "HIGIT_PORT", default_value = "3001")]
    port: u16,

    /// Accept any TLS certificate or SSH host key. Development only.
    #[arg(long, env = "HIGIT_ACCEPT_INVALID_CERTS")]
    accept_invalid_certs: bool,

    /// Server response timeout for remote operations, in milliseconds
    #[arg(long, env = "HIGIT_SERVER_TIMEOUT_MS", default_value = "30000")]
    server_timeout_ms: i32,

    /// RSA modulus size for generated SSH keys
    #[arg(long, env = "HIGIT_KEY_BITS", default_value = "4096")]
    key_bits: usize,

    /// Passphrase protecting generated private keys
    #[arg(long, env = "HIGIT_KEY_PASSPHRASE", hide_env_values = true, default_value = "")]
    key_passphrase: String,
}

impl Cli {
    fn into_config(self) -> AppConfig {
        AppConfig {
            base_path: self.base_path,
            cert_policy: if self.accept_invalid_certs {
                HostCertPolicy::AcceptInvalid
            } else {
                HostCertPolicy::Strict
            },
            engine: EngineOptions {
                server_timeout_ms: self.server_timeout_ms,
                ..EngineOptions::default()
            },
            identity: IdentitySettings {
                key_bits: self.key_bits,
                passphrase: self.key_passphrase,
                ..IdentitySettings::default()
            },
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let port = cli.port;

    // Initialize tracing (quieter for production)
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = cli.into_config();
    if config.cert_policy == HostCertPolicy::AcceptInvalid {
        warn!("Certificate validation is disabled");
    }
    engine::configure(&config.engine, config.base_path.as_deref())?;

    let base_path = config.base_path.clone();
    let core = Arc::new(Core::new(config));

    // Initialize up front when the files directory is already known
    if let Some(base) = base_path {
        let core = Arc::clone(&core);
        let envelope = tokio::task::spawn_blocking(move || {
            core.init_system(&base.to_string_lossy())
        })
        .await?;
        if !envelope.success {
            error!("Startup initialization failed: {}", envelope.message);
        }
    }

    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .merge(routes::create_router(Arc::clone(&core)))
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let addr = format!("127.0.0.1:{}", port);
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            eprintln!("✗ Failed to bind to port {}: {}", port, e);
            eprintln!("  Try a different port with --port <PORT>");
            std::process::exit(1);
        }
    };

    info!("Listening on http://{}", addr);
    println!();
    println!("  higit-core listening on http://{}", addr);
    println!("  Press Ctrl+C to stop");
    println!();

    // Set up graceful shutdown
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
        println!("\n  Shutting down...");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    core.shutdown();
    Ok(())
}
