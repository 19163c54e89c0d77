//! Basic usage example for the creditdb client
//!
//! Run with: CREDITDB_HOST=http://localhost:5622 cargo run --example basic_usage

use std::time::Duration;

use creditdb::{Client, ClientConfig, Context};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("setting default subscriber failed");

    // Waits for the server to pass its health check
    let config = ClientConfig::from_env()?;
    let client = Client::connect_with(config).await?.with_page(1);
    let ctx = Context::with_timeout(Duration::from_secs(10));

    info!("Ping: {}", client.ping(&ctx).await?);

    info!("Storing 'example:hello' on page {}...", client.current_page());
    client.set_line(&ctx, "example:hello", "Hello, creditdb!").await?;

    let line = client.get_line(&ctx, "example:hello").await?;
    info!("Retrieved: {} = {}", line.key, line.value);

    client.set_line(&ctx, "example:balance", "250").await?;
    for line in client.get_all_lines(&ctx).await? {
        info!("  - {} = {}", line.key, line.value);
    }

    client.delete_line(&ctx, "example:hello").await?;
    info!("Still exists: {}", client.exists(&ctx, "example:hello").await?);

    client.flush(&ctx).await?;
    info!("Page {} flushed", client.current_page());

    client.close();
    info!("Example completed successfully!");
    Ok(())
}
