// OAuth Flow Server
//
// Standalone service driving OAuth authorization flows for cloud services
// Provides REST API endpoints a remote UI uses to run the consent pages

use oauth_flow::{start_server, FlowConfig, Provider};
use std::env;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    println!("OAuth Flow Server");
    println!();

    let args: Vec<String> = env::args().collect();
    let host = args.get(1).map(|s| s.as_str()).unwrap_or("127.0.0.1");
    let port = args
        .get(2)
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(54546);

    let config = FlowConfig::from_env();

    let configured = config.configured_providers();
    for provider in Provider::ALL {
        if configured.contains(&provider) {
            println!("[OK] {} client configured", provider);
        } else {
            println!("[WARN] {} client id/secret not set", provider);
        }
    }

    println!();
    println!("[INFO] Starting OAuth Flow server on {}:{}", host, port);
    println!();

    start_server(host, port, config).await?;

    Ok(())
}
