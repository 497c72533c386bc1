//! Buy the Dips - Main Entry Point

use anyhow::Result;
use buy_the_dips::server::{self, AppState, EnvSessionSource};
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn, Level};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::EnvFilter;

/// Buy the Dips CLI
#[derive(Parser)]
#[command(name = "buy-the-dips")]
#[command(version, about = "Single-endpoint dip buyer for one Bybit instrument")]
struct Cli {
    /// Address to bind
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value = "8080")]
    port: u16,

    /// Emit logs as JSON lines
    #[arg(long, env = "JSON_LOGS")]
    json_logs: bool,

    /// Directory for rolling log files
    #[arg(long, env = "LOG_DIR", default_value = "logs")]
    log_dir: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let _guard = init_logging(&cli)?;

    let addr: SocketAddr = format!("{}:{}", cli.host, cli.port).parse()?;

    info!(version = env!("CARGO_PKG_VERSION"), "Buy the Dips starting");
    if is_test_mode() {
        warn!("IS_TEST=true: orders are logged, not submitted");
    }

    let state = AppState::new(Arc::new(EnvSessionSource));
    server::serve(addr, state).await?;

    info!("Stopped");
    Ok(())
}

fn is_test_mode() -> bool {
    std::env::var("IS_TEST")
        .map(|v| v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

/// Stdout plus an hourly rolling file. The returned guard flushes the file writer on drop.
fn init_logging(cli: &Cli) -> Result<WorkerGuard> {
    std::fs::create_dir_all(&cli.log_dir)?;

    let file_appender = tracing_appender::rolling::hourly(&cli.log_dir, "buy-the-dips.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let crate_level = if is_test_mode() { "debug" } else { "info" };
    let filter = EnvFilter::from_default_env()
        .add_directive(format!("buy_the_dips={}", crate_level).parse()?)
        .add_directive(Level::INFO.into());

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stdout.and(file_writer))
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(FmtSpan::CLOSE);

    if cli.json_logs {
        builder.json().init();
    } else {
        builder.with_ansi(false).init();
    }

    Ok(guard)
}
