//! Print the user the stored credentials belong to.
//!
//! Run with: cargo run --example whoami -- [hostname]

use hub_rs::{ClientConfig, HubClient, Provisioner, TerminalPrompter, YamlConfigStore};

#[tokio::main]
async fn main() -> hub_rs::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let hostname = std::env::args().nth(1).unwrap_or_else(|| "github.com".to_string());

    let mut provisioner = Provisioner::new(YamlConfigStore::from_env()?, TerminalPrompter::new())
        .with_client_config(ClientConfig::from_env()?);
    let client = HubClient::connect(&hostname, &mut provisioner).await?;

    let user = client.users().current().await?;
    println!("{} on {}", user.login, client.host().host);

    Ok(())
}
