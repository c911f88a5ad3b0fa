use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};
use mcpifier::http::{router, serve_http};
use mcpifier::stdio::serve_stdio;
use mcpifier::{App, config};
use mcpifier_openapi_tools::{DEFAULT_MAPPINGS_FILE, convert_to_file};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use tokio::io::BufReader;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mcpifier")]
#[command(about = "Expose REST APIs as MCP tools over stdio or HTTP")]
#[command(version)]
struct Cli {
    /// Log output format (logs always go to stderr)
    #[arg(long, value_enum, default_value = "text", global = true, env = "MCPIFIER_LOG_FORMAT")]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the MCP server
    Serve(ServeArgs),

    /// Generate a mappings file from an OpenAPI document
    Convert {
        /// Path or http(s) URL of the OpenAPI document (JSON or YAML)
        spec: String,

        /// Where to write the mappings
        #[arg(long, short, default_value = DEFAULT_MAPPINGS_FILE)]
        output: PathBuf,
    },
}

#[derive(clap::Args)]
struct ServeArgs {
    /// Transport to serve on
    #[arg(long, short, value_enum)]
    mode: Mode,

    /// Config file (YAML or JSON)
    #[arg(long, env = "MCPIFIER_CONFIG")]
    config: Option<PathBuf>,

    /// Mappings files merged into the config (defaults to ./mappings.json when present)
    #[arg(long = "mappings")]
    mappings: Vec<PathBuf>,

    /// Listen address for the HTTP transport
    #[arg(long, env = "MCPIFIER_BIND", default_value = "127.0.0.1:8080")]
    bind: SocketAddr,

    /// Path that accepts JSON-RPC POSTs
    #[arg(long, default_value = "/")]
    route: String,
}

#[derive(Clone, Copy, ValueEnum)]
enum Mode {
    Stdio,
    Http,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    match cli.command {
        Commands::Serve(args) => serve(args).await,
        Commands::Convert { spec, output } => {
            let client = reqwest::Client::new();
            let count = convert_to_file(&spec, &output, &client)
                .await
                .with_context(|| format!("convert {spec}"))?;
            info!("Wrote {count} tool mapping(s) to {}", output.display());
            Ok(())
        }
    }
}

async fn serve(args: ServeArgs) -> anyhow::Result<()> {
    let mappings = if args.mappings.is_empty() && Path::new(DEFAULT_MAPPINGS_FILE).is_file() {
        vec![PathBuf::from(DEFAULT_MAPPINGS_FILE)]
    } else {
        args.mappings
    };
    let config = config::load(args.config.as_deref(), &mappings)?;
    let app = App::from_config(&config).context("invalid configuration")?;

    let shutdown = CancellationToken::new();
    tokio::spawn(shutdown_on_signal(shutdown.clone()));

    match args.mode {
        Mode::Stdio => {
            serve_stdio(
                &*app.dispatcher,
                BufReader::new(tokio::io::stdin()),
                tokio::io::stdout(),
                shutdown,
            )
            .await?;
        }
        Mode::Http => {
            let router = router(app.dispatcher, app.http, &args.route, shutdown.clone())?;
            let listener = TcpListener::bind(args.bind)
                .await
                .with_context(|| format!("bind {}", args.bind))?;
            serve_http(listener, router, shutdown).await?;
        }
    }
    Ok(())
}

async fn shutdown_on_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("failed to listen for ctrl-c: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => {
                warn!("failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    info!("Shutdown signal received");
    shutdown.cancel();
}
