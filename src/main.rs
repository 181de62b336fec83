use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::runtime::Handle;
use ventus_auth::{Session, SessionStorage};
use ventus_core::Config;
use ventus_services::IssueClient;
use ventus_ui::IssueListModel;

#[tokio::main]
async fn main() -> Result<()> {
    ventus_core::init()?;

    let (config, _) = Config::load_validated()?;
    tracing::info!("Ventus started against {}", config.api.base_url);

    let session = load_session(&config);
    let client = IssueClient::from_config(&config, session).context("Failed to build API client")?;

    let mut list = IssueListModel::new(Arc::new(client), Handle::current(), &config.issues);
    if let Some(term) = std::env::args().nth(1) {
        list.search_now(&term);
    } else {
        list.refresh();
    }
    list.process_next().await;

    if let Some(err) = list.error_message() {
        println!("Could not load issues: {}", err);
    } else {
        println!(
            "Page {}/{} ({} issues)",
            list.page(),
            list.total_pages(),
            list.total_count()
        );
        for issue in list.items() {
            println!(
                "#{:<5} [{}] [{}] {}",
                issue.id, issue.status.name, issue.priority.name, issue.title
            );
        }
    }

    list.shutdown();
    Ok(())
}

/// A stored sign-in wins over the configured key.
fn load_session(config: &Config) -> Session {
    let session = Session::with_storage(SessionStorage::new(config.session_path()));
    if session.is_authenticated() {
        return session;
    }
    match &config.api.api_key {
        Some(key) if !key.trim().is_empty() => Session::from_api_key(key.clone()),
        _ => {
            tracing::warn!("No API key configured; requests will be rejected until a user signs in");
            session
        }
    }
}
