mod cli;

use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "dispatchd=info,tower_http=info";

#[tokio::main]
async fn main() {
    init_tracing();
    let config = match cli::run() {
        cli::RunOutcome::Serve(config) => config,
        cli::RunOutcome::Exit(code) => std::process::exit(code),
    };

    if let Err(err) = dispatchd::serve(config).await {
        tracing::error!(error = %err, "dispatcher stopped");
        std::process::exit(1);
    }
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let json = std::env::var("DISPATCHD_LOG_FORMAT").is_ok_and(|format| format == "json");
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}
