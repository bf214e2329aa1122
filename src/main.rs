use clap::Parser;
use glassify::config::{AppConfig, setup_logging};
use glassify::store::ImageStore;
use tracing::error;

#[tokio::main(flavor = "multi_thread")]
async fn main() {
    let cli = glassify::cli::CliOptions::parse();

    if setup_logging(cli.debug).is_err() {
        return;
    }

    let config = AppConfig::from_cli(&cli);
    let store = ImageStore::new(&config.data_dir);

    // Upload directories must exist before the first request lands.
    if let Err(err) = store.ensure_dirs().await {
        error!("Failed to create upload directories: {:?}", err);
        return;
    }

    if let Err(err) =
        glassify::web::setup_server(&cli.listen_address, cli.port, config, store).await
    {
        error!("Application error: {}", err);
    }
}
