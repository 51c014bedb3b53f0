use clap::Parser;
use validator_watcher::config::Config;

#[tokio::main]
async fn main() {
    let config = Config::parse();

    if let Err(e) = config.validate() {
        eprintln!("invalid configuration: {}", e);
        std::process::exit(1);
    }

    if let Err(e) = validator_watcher::run(config).await {
        eprintln!("validator watcher exited with an unrecoverable error: {}", e);
        std::process::exit(1);
    }
}
