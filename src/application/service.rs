use tracing::info;

use crate::config::EconomyConfig;
use crate::context::OpContext;
use crate::domain::{Account, Cents, PlayerId};
use crate::storage::{AccountStore, Party, StoreError};

use super::LedgerError;

/// Application service over the account store.
/// This is the only interface the command layer talks to.
pub struct LedgerService {
    store: AccountStore,
    default_balance: Cents,
}

/// One row of the leaderboard
#[derive(Debug, Clone)]
pub struct RankingEntry {
    /// 1-based position across all pages
    pub rank: i64,
    pub account: Account,
}

impl LedgerService {
    /// Create a new ledger service over an existing store.
    pub fn new(store: AccountStore, default_balance: Cents) -> Self {
        Self {
            store,
            default_balance,
        }
    }

    /// Open (and migrate) the database named in the configuration.
    pub async fn init(config: &EconomyConfig) -> anyhow::Result<Self> {
        let store = AccountStore::init(&config.database_path, config.max_connections).await?;
        Ok(Self::new(store, config.default_balance))
    }

    pub fn default_balance(&self) -> Cents {
        self.default_balance
    }

    /// Close the underlying connection pool.
    pub async fn close(&self) {
        self.store.close().await;
    }

    // ========================
    // Accounts
    // ========================

    /// Create an account with the default balance the first time a player
    /// is seen. Returns `false`, and changes nothing, if it already exists.
    pub async fn register_if_absent(
        &self,
        ctx: &OpContext,
        id: PlayerId,
        name: &str,
    ) -> Result<bool, LedgerError> {
        let created = self
            .store
            .create_if_absent(ctx, id, name, self.default_balance)
            .await
            .map_err(|e| LedgerError::from_store("register", name, e))?;

        if created {
            info!(player = %id, name, balance = self.default_balance, "registered new player");
        }
        Ok(created)
    }

    /// Get a player's balance.
    pub async fn get_balance(&self, ctx: &OpContext, id: PlayerId) -> Result<Cents, LedgerError> {
        self.store
            .get_balance(ctx, id)
            .await
            .map_err(|e| LedgerError::from_store("get_balance", &id.to_string(), e))
    }

    /// Get a player's full account record.
    pub async fn get_account(&self, ctx: &OpContext, id: PlayerId) -> Result<Account, LedgerError> {
        self.store
            .get_account(ctx, id)
            .await
            .map_err(|e| LedgerError::from_store("get_account", &id.to_string(), e))?
            .ok_or_else(|| LedgerError::UnknownPlayer(id.to_string()))
    }

    /// Replace a player's balance, creating the account if needed.
    pub async fn set_balance(
        &self,
        ctx: &OpContext,
        id: PlayerId,
        name: Option<&str>,
        amount: Cents,
    ) -> Result<(), LedgerError> {
        if amount < 0 {
            return Err(LedgerError::Validation(
                "amount must be non-negative".to_string(),
            ));
        }

        self.store
            .set_balance(ctx, id, name, amount)
            .await
            .map_err(|e| LedgerError::from_store("set_balance", &id.to_string(), e))
    }

    /// Resolve a display name to a player identity.
    pub async fn lookup_identity_by_name(
        &self,
        ctx: &OpContext,
        name: &str,
    ) -> Result<PlayerId, LedgerError> {
        self.store
            .lookup_identity_by_name(ctx, name)
            .await
            .map_err(|e| LedgerError::from_store("lookup_identity_by_name", name, e))
    }

    // ========================
    // Transfers
    // ========================

    /// Move money between two registered players.
    pub async fn transfer(
        &self,
        ctx: &OpContext,
        from: PlayerId,
        to: PlayerId,
        amount: Cents,
    ) -> Result<(), LedgerError> {
        if from == to {
            return Err(LedgerError::Validation("cannot target self".to_string()));
        }
        if amount <= 0 {
            return Err(LedgerError::Validation("amount must be positive".to_string()));
        }

        self.store
            .transfer(ctx, from, to, amount)
            .await
            .map_err(|e| {
                let unknown = match &e {
                    StoreError::NotFound(Party::Receiver) => to,
                    _ => from,
                };
                LedgerError::from_store("transfer", &unknown.to_string(), e)
            })
    }

    // ========================
    // Ranking
    // ========================

    /// One page of the leaderboard.
    ///
    /// A page past the end of the data is `PageNotFound`, not an empty list,
    /// so the command layer can tell the player the page does not exist.
    pub async fn get_ranking(
        &self,
        ctx: &OpContext,
        page: i64,
        page_size: i64,
    ) -> Result<Vec<RankingEntry>, LedgerError> {
        if page_size <= 0 {
            return Err(LedgerError::Validation(
                "page size must be at least 1".to_string(),
            ));
        }
        if page <= 0 {
            return Err(LedgerError::Validation("page must be at least 1".to_string()));
        }

        let accounts = self
            .store
            .top(ctx, page, page_size)
            .await
            .map_err(|e| LedgerError::from_store("get_ranking", "", e))?;

        if accounts.is_empty() {
            return Err(LedgerError::PageNotFound(page));
        }

        let first_rank = (page - 1) * page_size + 1;
        Ok(accounts
            .into_iter()
            .zip(first_rank..)
            .map(|(account, rank)| RankingEntry { rank, account })
            .collect())
    }
}
