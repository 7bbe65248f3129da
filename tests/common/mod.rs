// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use anyhow::Result;
use dfeconomy::config::EconomyConfig;
use dfeconomy::domain::{Cents, PlayerId};
use dfeconomy::storage::AccountStore;
use dfeconomy::{LedgerService, OpContext};
use tempfile::TempDir;
use uuid::Uuid;

/// Configuration pointing at a database inside `temp_dir`
pub fn test_config(temp_dir: &TempDir) -> EconomyConfig {
    EconomyConfig {
        database_path: temp_dir.path().join("test.db"),
        enable_set_command: true,
        ..EconomyConfig::default()
    }
}

/// Helper to create a test service with a temporary database
pub async fn test_service() -> Result<(LedgerService, TempDir)> {
    let temp_dir = TempDir::new()?;
    let service = LedgerService::init(&test_config(&temp_dir)).await?;
    Ok((service, temp_dir))
}

/// Helper to create a bare store with a temporary database
pub async fn test_store() -> Result<(AccountStore, TempDir)> {
    let temp_dir = TempDir::new()?;
    let store = AccountStore::init(&test_config(&temp_dir).database_path, 8).await?;
    Ok((store, temp_dir))
}

pub fn ctx() -> OpContext {
    OpContext::background()
}

/// Create a named account holding `balance` and return its identity
pub async fn seed_store(store: &AccountStore, name: &str, balance: Cents) -> Result<PlayerId> {
    let id = Uuid::new_v4();
    store.set_balance(&ctx(), id, Some(name), balance).await?;
    Ok(id)
}

/// Same as `seed_store`, through the service
pub async fn seed(service: &LedgerService, name: &str, balance: Cents) -> Result<PlayerId> {
    let id = Uuid::new_v4();
    service.set_balance(&ctx(), id, Some(name), balance).await?;
    Ok(id)
}
