use clap::Parser;
use metrics_exporter_statsd::StatsdBuilder;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "portal", about = "Dashboard backend for the dev portal")]
struct Cli {
    /// Address to bind the API listener to.
    #[arg(long, default_value = "127.0.0.1")]
    host: String,
    /// Port to bind the API listener to.
    #[arg(long, default_value_t = 8000)]
    port: u16,
}

fn main() {
    // Dotenv files are applied before anything reads the environment and
    // while the process is still single-threaded. Existing variables win.
    portal::dotenv::load(".env.local");
    portal::dotenv::load(".env");

    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    init_metrics();

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("build tokio runtime");

    if let Err(err) = rt.block_on(portal::run_async(&cli.host, cli.port)) {
        tracing::error!(error = %err, "portal exited with an error");
        std::process::exit(1);
    }
}

/// Installs the StatsD recorder when STATSD_HOST is set. Without it, metrics
/// are discarded.
fn init_metrics() {
    let Ok(host) = std::env::var("STATSD_HOST") else {
        return;
    };
    let port = std::env::var("STATSD_PORT")
        .ok()
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(8125);

    match StatsdBuilder::from(host.as_str(), port).build(Some("portal")) {
        Ok(recorder) => {
            if let Err(err) = metrics::set_global_recorder(recorder) {
                tracing::warn!(error = %err, "failed to install the metrics recorder");
            }
        }
        Err(err) => tracing::warn!(error = %err, "failed to build the StatsD recorder"),
    }
}
