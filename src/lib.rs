pub mod application;
pub mod cli;
pub mod commands;
pub mod config;
pub mod context;
pub mod domain;
pub mod storage;

pub use application::{LedgerError, LedgerService};
pub use context::OpContext;
pub use domain::*;
pub use storage::AccountStore;
