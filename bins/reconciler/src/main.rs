//! Moneyvate reconciler.
//!
//! Loads goal documents from a JSON file into an in-memory store, runs one
//! sync session over them (decode, missed-day backfill) and prints the
//! resulting ledger projection as JSON.
//!
//! Usage: cargo run --bin reconciler -- <goals.json> [user-id]
//!
//! The file holds an array of `{ "id": ..., "data": { ...goal document... } }`.
//! Without a user id, the owner of the first document is used.

use std::sync::Arc;

use anyhow::{Context, bail};
use moneyvate_core::clock::SystemClock;
use moneyvate_shared::AppConfig;
use moneyvate_shared::config::LoggingConfig;
use moneyvate_shared::types::UserId;
use moneyvate_sync::{
    CoordinatorSettings, InMemoryDocumentStore, SyncCoordinator, UnavailableGateway,
};
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Deserialize)]
struct SeedDocument {
    id: String,
    data: Value,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("failed to load configuration")?;
    init_tracing(&config.logging);

    let mut args = std::env::args().skip(1);
    let Some(path) = args.next() else {
        bail!("usage: reconciler <goals.json> [user-id]");
    };

    let raw = std::fs::read_to_string(&path).with_context(|| format!("failed to read {path}"))?;
    let seeds: Vec<SeedDocument> =
        serde_json::from_str(&raw).with_context(|| format!("{path} is not an array of goal documents"))?;

    let owner = args.next().or_else(|| {
        seeds
            .first()
            .and_then(|seed| seed.data.get("userId"))
            .and_then(Value::as_str)
            .map(str::to_string)
    });
    let Some(owner) = owner else {
        bail!("no user id given and none found in {path}");
    };
    let user_id = UserId::from_raw(owner)?;

    let store = InMemoryDocumentStore::new();
    for seed in seeds {
        store.put_document(seed.id, seed.data);
    }

    let tz = config.sync.timezone()?;
    let sync = SyncCoordinator::new(
        user_id.clone(),
        Arc::new(store.clone()),
        Arc::new(UnavailableGateway),
        Arc::new(SystemClock::new(tz)),
        CoordinatorSettings::from_config(&config),
    );
    info!(user_id = %user_id, timezone = %tz, "replaying goal documents");

    let report = sync.handle_snapshot(store.snapshot_for(&user_id)).await;
    for (goal_id, error) in &report.skipped {
        warn!(goal_id = %goal_id, code = error.error_code(), "goal skipped");
    }

    let projection = sync.subscribe_projection().borrow().clone();
    println!("{}", serde_json::to_string_pretty(&projection)?);

    Ok(())
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| logging.filter.as_str().into());
    let registry = tracing_subscriber::registry().with(filter);

    if logging.json {
        registry.with(fmt::layer().json().with_writer(std::io::stderr)).init();
    } else {
        registry.with(fmt::layer().with_writer(std::io::stderr)).init();
    }
}
