use log::{error, info};
use printtap::configuration::Configuration;
use printtap::controller::Daemon;
use printtap::protocol::ProtocolRegistry;

#[tokio::main]
async fn main() {
    let registry = ProtocolRegistry::builtin();
    let config = Configuration::from_args(&registry);

    env_logger::Builder::from_default_env()
        .filter_level(config.log_level())
        .format_target(false)
        .init();

    info!("printtap v{}", env!("CARGO_PKG_VERSION"));

    let daemon = Daemon::from_configuration(&config, &registry).unwrap_or_else(|e| {
        error!("Unable to configure the daemon: {}, exiting...", e);
        std::process::exit(1);
    });

    if let Err(e) = daemon.run().await {
        error!("Daemon failed: {}, exiting...", e);
        std::process::exit(1);
    }
}
