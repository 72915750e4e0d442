//! List open pull requests of a repository.
//!
//! Credentials come from `GITHUB_TOKEN`, the hub config file, or an
//! interactive prompt.
//!
//! Run with: cargo run --example list_pulls -- rust-lang/rust [limit]

use std::collections::BTreeMap;
use std::time::Duration;

use hub_rs::{
    ClientConfig, HubClient, Project, Provisioner, PullRequest, TerminalPrompter, YamlConfigStore,
};

#[tokio::main]
async fn main() -> hub_rs::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let mut args = std::env::args().skip(1);
    let repo = args.next().unwrap_or_else(|| "rust-lang/rust".to_string());
    let limit: usize = args.next().and_then(|n| n.parse().ok()).unwrap_or(20);

    let (owner, name) = repo
        .split_once('/')
        .ok_or_else(|| hub_rs::Error::InvalidInput(format!("expected OWNER/NAME, got {:?}", repo)))?;
    let project = Project::new(owner, name);

    let config = ClientConfig::from_env()?.with_cache_ttl(Duration::from_secs(60));
    let mut provisioner =
        Provisioner::new(YamlConfigStore::from_env()?, TerminalPrompter::new()).with_client_config(config);
    let client = HubClient::connect(&project.host, &mut provisioner).await?;

    let mut filter = BTreeMap::new();
    filter.insert("state".to_string(), "open".to_string());

    // Skip drafts
    let ready = |pr: &PullRequest| !pr.draft;
    let pulls = client.pulls().fetch(&project, &filter, limit, Some(&ready)).await?;

    println!("{} open pull request(s) in {}:", pulls.len(), project);
    for pr in &pulls {
        let author = pr.user.as_ref().map_or("ghost", |u| u.login.as_str());
        println!("  #{:<6} {} ({})", pr.number, pr.title, author);
    }

    Ok(())
}
