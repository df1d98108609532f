use anyhow::Result;
use switchboard_app::config::{Config, DEFAULT_CONFIG_PATH};
use switchboard_app::repl::Repl;
use switchboard_app::App;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config = Config::load(&config_path)?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_filter))?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    tracing::info!("Using configuration from {}", config_path);

    let app = App::build(&config)?;
    let mut repl = Repl::new(app)?;
    repl.run().await
}
