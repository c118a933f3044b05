//! WebPad GW entry point

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use webpad_gw::config::{AppConfig, PadBackend};
use webpad_gw::feedback::FeedbackBridge;
use webpad_gw::guard::PadGuard;
use webpad_gw::pad::{ConsolePad, VirtualPad};
use webpad_gw::registry::ConnectionRegistry;
use webpad_gw::server::{self, ServerState};

/// WebPad Gateway - drive a virtual Xbox 360 pad from web clients
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: String,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Override the listen port from the config
    #[arg(long)]
    port: Option<u16>,

    /// Override the bind host from the config
    #[arg(long)]
    bind: Option<String>,

    /// Directory with the web frontend to serve
    #[arg(long)]
    web_dir: Option<PathBuf>,

    /// Force the console backend (no virtual device)
    #[arg(long)]
    console: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let args = Args::parse();
    init_logging(&args.log_level)?;

    info!("Starting WebPad GW...");
    info!("Configuration file: {}", args.config);

    let mut config = AppConfig::load_or_default(&args.config).await?;
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(bind) = args.bind {
        config.server.host = bind;
    }
    if let Some(web_dir) = args.web_dir {
        config.server.web_dir = Some(web_dir);
    }
    if args.console {
        config.pad.backend = PadBackend::Console;
    }
    config.validate()?;

    let pad = build_pad(config.pad.backend)?;
    let guard = Arc::new(PadGuard::new(pad));
    info!("Virtual pad backend: {}", guard.backend_name());

    // Start from a known-neutral state. A failure here is the same
    // DeviceUnavailable every session would see; keep serving so clients get
    // proper error replies instead of a dead port.
    if let Err(e) = guard.reset() {
        warn!("Initial controller reset failed: {}", e);
    }

    let registry = Arc::new(ConnectionRegistry::new());
    let bridge = FeedbackBridge::new(registry.clone());
    bridge.subscribe(&guard);

    let state = Arc::new(ServerState {
        guard,
        registry,
        settings: (&config.pad).into(),
    });

    let addr = config.bind_addr()?;
    info!("✅ Gateway ready, clients can connect to ws://{}/ws", addr);

    server::start_server(state, addr, config.server.web_dir.as_deref()).await?;

    info!("WebPad GW shutdown complete");
    Ok(())
}

fn build_pad(backend: PadBackend) -> Result<Box<dyn VirtualPad>> {
    match backend {
        PadBackend::Console => Ok(Box::new(ConsolePad::new())),

        #[cfg(windows)]
        PadBackend::Vigem => Ok(Box::new(webpad_gw::pad::VigemPad::connect()?)),

        #[cfg(windows)]
        PadBackend::Auto => match webpad_gw::pad::VigemPad::connect() {
            Ok(pad) => Ok(Box::new(pad)),
            Err(e) => {
                warn!(
                    "ViGEmBus unavailable ({}), falling back to console backend",
                    e
                );
                Ok(Box::new(ConsolePad::new()))
            }
        },

        #[cfg(not(windows))]
        PadBackend::Vigem => {
            anyhow::bail!("The vigem backend requires Windows with ViGEmBus installed")
        }

        #[cfg(not(windows))]
        PadBackend::Auto => Ok(Box::new(ConsolePad::new())),
    }
}

fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_thread_names(false),
        )
        .init();

    Ok(())
}
