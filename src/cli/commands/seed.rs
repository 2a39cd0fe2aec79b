use anyhow::{anyhow, Context};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::PathBuf;
use tracing::{info, warn};
use uuid::Uuid;

use crate::api::AppState;
use crate::config::AppConfig;
use crate::database::{DatabaseManager, RepositoryError};
use crate::filter::Filter;
use crate::models::{Client, ClientRef, Contact, Entity, Service};
use crate::types::ID_FIELD;

/// Seed file layout. Services and contacts name the clients they belong to
/// in `clients`; names resolve to identifiers at load time.
#[derive(Debug, Default, Deserialize)]
pub struct Fixture {
    #[serde(default)]
    pub clients: Vec<Client>,
    #[serde(default)]
    pub services: Vec<SeedEntry<Service>>,
    #[serde(default)]
    pub contacts: Vec<SeedEntry<Contact>>,
}

#[derive(Debug, Deserialize)]
#[serde(bound = "E: DeserializeOwned")]
pub struct SeedEntry<E> {
    #[serde(flatten)]
    pub entity: E,
    #[serde(default)]
    pub clients: Vec<String>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedSummary {
    pub created: usize,
    pub skipped: usize,
}

pub async fn handle(config: AppConfig, file: PathBuf) -> anyhow::Result<()> {
    let raw = tokio::fs::read_to_string(&file)
        .await
        .with_context(|| format!("failed to read {}", file.display()))?;
    let fixture: Fixture =
        serde_json::from_str(&raw).with_context(|| format!("failed to parse {}", file.display()))?;

    let store = DatabaseManager::open(&config.database)
        .await
        .context("failed to open document store")?;
    let state = AppState::init(store).await.context("failed to prepare document store")?;

    let summary = seed(&state, fixture).await?;
    info!(created = summary.created, skipped = summary.skipped, "Seed complete");
    Ok(())
}

/// Load a fixture through the repositories. Entries whose name already
/// exists are skipped.
pub async fn seed(state: &AppState, fixture: Fixture) -> anyhow::Result<SeedSummary> {
    let mut summary = SeedSummary::default();

    for client in fixture.clients {
        record(&mut summary, state.repository::<Client>().create(client).await)?;
    }

    for SeedEntry { mut entity, clients } in fixture.services {
        entity.attached_to_client.extend(resolve_clients(state, &clients).await?);
        record(&mut summary, state.repository::<Service>().create(entity).await)?;
    }

    for SeedEntry { mut entity, clients } in fixture.contacts {
        entity.attached_to_client.extend(resolve_clients(state, &clients).await?);
        record(&mut summary, state.repository::<Contact>().create(entity).await)?;
    }

    Ok(summary)
}

fn record(summary: &mut SeedSummary, result: Result<Uuid, RepositoryError>) -> anyhow::Result<()> {
    match result {
        Ok(_) => summary.created += 1,
        Err(RepositoryError::DuplicateName { kind, name }) => {
            warn!(kind, name = %name, "Already exists, skipping");
            summary.skipped += 1;
        }
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

async fn resolve_clients(state: &AppState, names: &[String]) -> anyhow::Result<Vec<ClientRef>> {
    let mut refs = Vec::with_capacity(names.len());
    for name in names {
        let client = state
            .store
            .find_one(Client::COLLECTION, &Filter::eq("client_name", name.as_str()))
            .await?
            .ok_or_else(|| anyhow!("fixture references unknown client '{}'", name))?;
        let client_id = client
            .get(ID_FIELD)
            .and_then(|id| id.as_str())
            .and_then(|id| Uuid::parse_str(id).ok())
            .ok_or_else(|| anyhow!("client '{}' has no valid id", name))?;
        refs.push(ClientRef { client_id });
    }
    Ok(refs)
}
