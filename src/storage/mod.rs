mod account_store;
mod error;

pub use account_store::*;
pub use error::*;

/// SQL migration for the accounts table
pub const MIGRATION_001_ACCOUNTS: &str = include_str!("migrations/001_accounts.sql");
