mod api_doc;
mod error;
mod handlers;
mod services;
mod setup;
mod state;
mod telemetry;

use annotia_core::Config;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    telemetry::init_telemetry()?;

    let config = Config::from_env()?;

    let (_state, router) = setup::initialize_app(config.clone()).await?;

    setup::server::start_server(&config, router).await?;

    Ok(())
}
