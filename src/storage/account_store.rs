use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, Sqlite, SqlitePool, Transaction};
use tracing::debug;
use uuid::Uuid;

use crate::context::OpContext;
use crate::domain::{Account, Cents, PlayerId};

use super::{MIGRATION_001_ACCOUNTS, Party, StoreError, StoreResult};

/// How long a connection waits for SQLite's write lock before giving up.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Durable account storage on SQLite.
///
/// Every mutation runs inside a transaction whose statements are raced
/// against the caller's [`OpContext`]; the commit is awaited outside that
/// race, so a cancelled or timed-out call never leaves a partial write and a
/// started commit is always allowed to finish.
pub struct AccountStore {
    pool: SqlitePool,
}

impl AccountStore {
    /// Create a new store with the given SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to a SQLite database file, creating it if it doesn't exist.
    /// The database runs in WAL mode so readers never block the writer.
    pub async fn connect(path: &Path, max_connections: u32) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(BUSY_TIMEOUT);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect_with(options)
            .await
            .context("Failed to connect to database")?;
        Ok(Self::new(pool))
    }

    /// Run database migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(MIGRATION_001_ACCOUNTS)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 001")?;
        Ok(())
    }

    /// Initialize a database (connect + migrate).
    pub async fn init(path: &Path, max_connections: u32) -> Result<Self> {
        let store = Self::connect(path, max_connections).await?;
        store.migrate().await?;
        Ok(store)
    }

    /// Close every pooled connection.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    // ========================
    // Reads
    // ========================

    /// Current balance of a player. Unknown players are `NotFound`, never zero.
    pub async fn get_balance(&self, ctx: &OpContext, id: PlayerId) -> StoreResult<Cents> {
        ctx.guard(async {
            let balance: Option<Cents> =
                sqlx::query_scalar("SELECT balance FROM accounts WHERE identity = ?")
                    .bind(id.to_string())
                    .fetch_optional(&self.pool)
                    .await
                    .context("Failed to fetch balance")?;
            balance.ok_or_else(|| StoreError::not_found(Party::Player))
        })
        .await
    }

    /// Full account record, if one exists.
    pub async fn get_account(&self, ctx: &OpContext, id: PlayerId) -> StoreResult<Option<Account>> {
        ctx.guard(async {
            let row = sqlx::query(
                r#"
                SELECT identity, display_name, balance, updated_at
                FROM accounts
                WHERE identity = ?
                "#,
            )
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch account")?;

            let account = row.as_ref().map(Self::row_to_account).transpose()?;
            Ok::<_, StoreError>(account)
        })
        .await
    }

    /// Resolve a display name to an identity.
    ///
    /// Names are not unique. When several accounts carry the same name, the
    /// one written most recently wins; identical timestamps fall back to the
    /// lowest identity so the answer never flips between calls.
    pub async fn lookup_identity_by_name(
        &self,
        ctx: &OpContext,
        name: &str,
    ) -> StoreResult<PlayerId> {
        validate_name(name)?;

        ctx.guard(async {
            let identity: Option<String> = sqlx::query_scalar(
                r#"
                SELECT identity
                FROM accounts
                WHERE display_name = ?
                ORDER BY updated_at DESC, identity ASC
                LIMIT 1
                "#,
            )
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to look up player by name")?;

            let identity = identity.ok_or_else(|| StoreError::not_found(Party::Player))?;
            let id = Uuid::parse_str(&identity).context("Invalid player ID")?;
            Ok::<_, StoreError>(id)
        })
        .await
    }

    /// One page of the leaderboard: balance descending, identity ascending.
    /// `page` is 1-based.
    pub async fn top(&self, ctx: &OpContext, page: i64, page_size: i64) -> StoreResult<Vec<Account>> {
        if page <= 0 {
            return Err(StoreError::validation("page", "must be greater than 0"));
        }
        if page_size <= 0 {
            return Err(StoreError::validation("size", "must be greater than 0"));
        }
        // No table holds enough rows to reach an offset past i64::MAX
        let Some(offset) = (page - 1).checked_mul(page_size) else {
            return Ok(Vec::new());
        };

        ctx.guard(async {
            let rows = sqlx::query(
                r#"
                SELECT identity, display_name, balance, updated_at
                FROM accounts
                ORDER BY balance DESC, identity ASC
                LIMIT ? OFFSET ?
                "#,
            )
            .bind(page_size)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .context("Failed to fetch ranking")?;

            let accounts = rows
                .iter()
                .map(Self::row_to_account)
                .collect::<Result<Vec<_>>>()?;
            Ok::<_, StoreError>(accounts)
        })
        .await
    }

    // ========================
    // Writes
    // ========================

    /// Insert or overwrite a player's balance. This replaces the balance, it
    /// does not add to it. `name: None` keeps whatever name is on record.
    pub async fn set_balance(
        &self,
        ctx: &OpContext,
        id: PlayerId,
        name: Option<&str>,
        amount: Cents,
    ) -> StoreResult<()> {
        validate_id("uuid", id)?;
        if let Some(name) = name {
            validate_name(name)?;
        }
        if amount < 0 {
            return Err(StoreError::validation("balance", "must be non-negative"));
        }

        let tx = ctx
            .guard(async {
                let mut tx = self.begin().await?;
                sqlx::query(
                    r#"
                    INSERT INTO accounts (identity, display_name, balance, updated_at)
                    VALUES (?, ?, ?, ?)
                    ON CONFLICT (identity) DO UPDATE
                        SET balance = excluded.balance,
                            display_name = COALESCE(excluded.display_name, accounts.display_name),
                            updated_at = excluded.updated_at
                    "#,
                )
                .bind(id.to_string())
                .bind(name)
                .bind(amount)
                .bind(timestamp())
                .execute(&mut *tx)
                .await
                .context("Failed to set balance")?;
                Ok::<_, StoreError>(tx)
            })
            .await?;

        tx.commit().await.context("Failed to commit balance update")?;
        debug!(player = %id, balance = amount, "balance set");
        Ok(())
    }

    /// Create an account unless one already exists for `id`.
    /// Returns `true` when a row was inserted. A single `INSERT … DO NOTHING`
    /// makes concurrent calls for the same identity create at most one account.
    pub async fn create_if_absent(
        &self,
        ctx: &OpContext,
        id: PlayerId,
        name: &str,
        amount: Cents,
    ) -> StoreResult<bool> {
        validate_id("uuid", id)?;
        validate_name(name)?;
        if amount < 0 {
            return Err(StoreError::validation("balance", "must be non-negative"));
        }

        let (tx, created) = ctx
            .guard(async {
                let mut tx = self.begin().await?;
                let result = sqlx::query(
                    r#"
                    INSERT INTO accounts (identity, display_name, balance, updated_at)
                    VALUES (?, ?, ?, ?)
                    ON CONFLICT (identity) DO NOTHING
                    "#,
                )
                .bind(id.to_string())
                .bind(name)
                .bind(amount)
                .bind(timestamp())
                .execute(&mut *tx)
                .await
                .context("Failed to create account")?;
                Ok::<_, StoreError>((tx, result.rows_affected() == 1))
            })
            .await?;

        tx.commit().await.context("Failed to commit account creation")?;
        if created {
            debug!(player = %id, balance = amount, "account created");
        }
        Ok(created)
    }

    /// Move `amount` from one account to another as a single unit of work.
    ///
    /// Checks run in this order: sender exists, sender can cover the amount,
    /// receiver exists. Any failure rolls back both sides.
    pub async fn transfer(
        &self,
        ctx: &OpContext,
        from: PlayerId,
        to: PlayerId,
        amount: Cents,
    ) -> StoreResult<()> {
        validate_id("from_uuid", from)?;
        validate_id("to_uuid", to)?;
        if amount <= 0 {
            return Err(StoreError::validation("amount", "must be positive"));
        }
        if from == to {
            return Err(StoreError::Validation("cannot target self".to_string()));
        }

        let tx = ctx.guard(self.stage_transfer(from, to, amount)).await?;
        tx.commit().await.context("Failed to commit transfer")?;

        debug!(from = %from, to = %to, amount, "transfer committed");
        Ok(())
    }

    /// Apply both sides of a transfer inside an open transaction.
    ///
    /// The debit is the first statement and carries the sufficiency check in
    /// its WHERE clause, so it takes SQLite's write lock before any balance is
    /// read. Two transfers draining the same sender serialize on that lock and
    /// the second one sees the first one's debit.
    async fn stage_transfer(
        &self,
        from: PlayerId,
        to: PlayerId,
        amount: Cents,
    ) -> StoreResult<Transaction<'static, Sqlite>> {
        let mut tx = self.begin().await?;
        let now = timestamp();
        let from_id = from.to_string();
        let to_id = to.to_string();

        let debit = sqlx::query(
            r#"
            UPDATE accounts
            SET balance = balance - ?, updated_at = ?
            WHERE identity = ? AND balance >= ?
            "#,
        )
        .bind(amount)
        .bind(&now)
        .bind(&from_id)
        .bind(amount)
        .execute(&mut *tx)
        .await
        .context("Failed to debit sender")?;

        if debit.rows_affected() == 0 {
            let available: Option<Cents> =
                sqlx::query_scalar("SELECT balance FROM accounts WHERE identity = ?")
                    .bind(&from_id)
                    .fetch_optional(&mut *tx)
                    .await
                    .context("Failed to fetch sender balance")?;

            return Err(match available {
                None => StoreError::not_found(Party::Sender),
                Some(available) => StoreError::InsufficientFunds {
                    required: amount,
                    available,
                },
            });
        }

        let credit = sqlx::query(
            r#"
            UPDATE accounts
            SET balance = balance + ?, updated_at = ?
            WHERE identity = ? AND balance <= ?
            "#,
        )
        .bind(amount)
        .bind(&now)
        .bind(&to_id)
        .bind(Cents::MAX - amount)
        .execute(&mut *tx)
        .await
        .context("Failed to credit receiver")?;

        if credit.rows_affected() == 0 {
            let exists: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM accounts WHERE identity = ?")
                .bind(&to_id)
                .fetch_one(&mut *tx)
                .await
                .context("Failed to fetch receiver")?;

            return Err(if exists > 0 {
                StoreError::validation("amount", "would overflow the receiver balance")
            } else {
                StoreError::not_found(Party::Receiver)
            });
        }

        Ok(tx)
    }

    async fn begin(&self) -> StoreResult<Transaction<'static, Sqlite>> {
        Ok(self
            .pool
            .begin()
            .await
            .context("Failed to begin transaction")?)
    }

    fn row_to_account(row: &SqliteRow) -> Result<Account> {
        let id_str: String = row.get("identity");
        let updated_at_str: String = row.get("updated_at");

        Ok(Account {
            id: Uuid::parse_str(&id_str).context("Invalid player ID")?,
            name: row.get("display_name"),
            balance: row.get("balance"),
            updated_at: DateTime::parse_from_rfc3339(&updated_at_str)
                .context("Invalid updated_at timestamp")?
                .with_timezone(&Utc),
        })
    }
}

/// Fixed-width RFC 3339 so that `ORDER BY updated_at` sorts chronologically.
fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn validate_id(field: &str, id: PlayerId) -> StoreResult<()> {
    if id.is_nil() {
        return Err(StoreError::validation(field, "cannot be nil"));
    }
    Ok(())
}

fn validate_name(name: &str) -> StoreResult<()> {
    if name.trim().is_empty() {
        return Err(StoreError::validation("name", "cannot be empty"));
    }
    Ok(())
}
