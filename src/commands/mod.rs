//! `/economy` player commands.
//!
//! Handlers are plain objects built once at startup by [`economy_commands`],
//! each holding its own reference to the [`LedgerService`], and handed to a
//! [`Dispatcher`]. Execution goes through a [`CommandPool`] so that the
//! server can bound and cancel outstanding work.

mod balance;
mod pay;
mod pool;
mod set;
mod top;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::application::{LedgerError, LedgerService};
use crate::config::EconomyConfig;
use crate::context::OpContext;
use crate::domain::{PlayerId, format_cents};

pub use balance::BalanceCommand;
pub use pay::PayCommand;
pub use pool::CommandPool;
pub use set::SetCommand;
pub use top::{TOP_PAGE_SIZE, TopCommand};

/// The player who issued a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
}

impl Player {
    pub fn new(id: PlayerId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// One line of chat output sent back to the player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Success(String),
    Info(String),
    Error(String),
}

impl Reply {
    pub fn is_error(&self) -> bool {
        matches!(self, Reply::Error(_))
    }

    pub fn text(&self) -> &str {
        match self {
            Reply::Success(text) | Reply::Info(text) | Reply::Error(text) => text,
        }
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Success(text) => write!(f, "[Success] {}", text),
            Reply::Info(text) => write!(f, "{}", text),
            Reply::Error(text) => write!(f, "[Error] {}", text),
        }
    }
}

#[async_trait]
pub trait CommandHandler: Send + Sync {
    /// Sub-command word, e.g. `pay`
    fn name(&self) -> &'static str;

    /// Argument synopsis shown in help and usage errors
    fn usage(&self) -> &'static str;

    async fn run(&self, ctx: &OpContext, player: &Player, args: &[&str]) -> Vec<Reply>;
}

/// Build the `/economy` handler set. `set` is only included when the
/// configuration enables it.
pub fn economy_commands(
    service: Arc<LedgerService>,
    config: &EconomyConfig,
) -> Vec<Box<dyn CommandHandler>> {
    let mut handlers: Vec<Box<dyn CommandHandler>> = vec![
        Box::new(BalanceCommand::new(Arc::clone(&service))),
        Box::new(PayCommand::new(Arc::clone(&service))),
        Box::new(TopCommand::new(Arc::clone(&service))),
    ];
    if config.enable_set_command {
        handlers.push(Box::new(SetCommand::new(service)));
    }
    handlers
}

/// Routes a command line to the handler named by its first word.
pub struct Dispatcher {
    handlers: Vec<Box<dyn CommandHandler>>,
}

impl Dispatcher {
    pub fn new(handlers: Vec<Box<dyn CommandHandler>>) -> Self {
        Self { handlers }
    }

    pub fn command_names(&self) -> Vec<&'static str> {
        self.handlers.iter().map(|h| h.name()).collect()
    }

    pub fn help(&self) -> Vec<Reply> {
        let mut lines = vec![Reply::Info("Economy commands:".to_string())];
        lines.extend(
            self.handlers
                .iter()
                .map(|h| Reply::Info(format!("  /economy {}", h.usage()))),
        );
        lines
    }

    /// Run one command line such as `/economy pay Steve 10` or `pay Steve 10`.
    pub async fn dispatch(&self, ctx: &OpContext, player: &Player, line: &str) -> Vec<Reply> {
        let line = line.trim();
        let line = line.strip_prefix('/').unwrap_or(line);
        let mut words: Vec<&str> = line.split_whitespace().collect();
        if words.first().is_some_and(|w| w.eq_ignore_ascii_case("economy")) {
            words.remove(0);
        }

        let Some((name, args)) = words.split_first() else {
            return self.help();
        };

        match self
            .handlers
            .iter()
            .find(|h| h.name().eq_ignore_ascii_case(name))
        {
            Some(handler) => {
                debug!(player = %player.name, command = handler.name(), ?args, "dispatching command");
                handler.run(ctx, player, args).await
            }
            None => {
                let mut replies = vec![Reply::Error(format!("Unknown command: {}", name))];
                replies.extend(self.help());
                replies
            }
        }
    }
}

/// Resolve a username to an identity. The invoking player's own name skips
/// the lookup.
pub(crate) async fn resolve_target(
    service: &LedgerService,
    ctx: &OpContext,
    player: &Player,
    username: &str,
) -> Result<PlayerId, LedgerError> {
    if username == player.name {
        return Ok(player.id);
    }
    service.lookup_identity_by_name(ctx, username).await
}

/// Player-facing text for a failed ledger call. `target` is the name the
/// player typed; `action` completes "Failed to …".
pub(crate) fn error_reply(err: &LedgerError, player: &Player, target: &str, action: &str) -> Reply {
    let text = match err {
        LedgerError::Validation(message) => capitalize(message),
        LedgerError::UnknownPlayer(_) => format!("Player not found: {}", target),
        LedgerError::InsufficientFunds { available, .. } => {
            format!("Insufficient funds (balance {})", format_cents(*available))
        }
        LedgerError::PageNotFound(_) => "Page not found".to_string(),
        LedgerError::TimedOut => "Request timeout".to_string(),
        LedgerError::Cancelled => "Request cancelled".to_string(),
        LedgerError::Internal => {
            warn!(player = %player.name, target, action, "command failed with internal error");
            format!("Failed to {} by internal error", action)
        }
    };
    Reply::Error(text)
}

fn capitalize(message: &str) -> String {
    let mut chars = message.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub(crate) fn usage_error(handler: &dyn CommandHandler) -> Vec<Reply> {
    vec![Reply::Error(format!("Usage: /economy {}", handler.usage()))]
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_reply_display() {
        assert_eq!(Reply::Success("ok".into()).to_string(), "[Success] ok");
        assert_eq!(Reply::Error("no".into()).to_string(), "[Error] no");
        assert_eq!(Reply::Info("hi".into()).to_string(), "hi");
    }

    #[test]
    fn test_error_reply_messages() {
        let player = Player::new(Uuid::new_v4(), "Alex");

        let reply = error_reply(&LedgerError::UnknownPlayer("x".into()), &player, "Steve", "pay");
        assert_eq!(reply, Reply::Error("Player not found: Steve".into()));

        let reply = error_reply(
            &LedgerError::InsufficientFunds {
                required: 500,
                available: 250,
            },
            &player,
            "Steve",
            "pay",
        );
        assert_eq!(reply, Reply::Error("Insufficient funds (balance 2.50)".into()));

        let reply = error_reply(
            &LedgerError::Validation("amount must be positive".into()),
            &player,
            "Steve",
            "pay",
        );
        assert_eq!(reply, Reply::Error("Amount must be positive".into()));

        let reply = error_reply(&LedgerError::Internal, &player, "Steve", "pay");
        assert_eq!(reply, Reply::Error("Failed to pay by internal error".into()));
    }
}
