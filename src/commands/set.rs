use std::sync::Arc;

use async_trait::async_trait;

use crate::application::LedgerService;
use crate::context::OpContext;
use crate::domain::{format_cents, parse_cents};

use super::{CommandHandler, Player, Reply, error_reply, resolve_target, usage_error};

/// `/economy set <username> <amount>`, an operator tool that replaces a
/// player's balance outright.
pub struct SetCommand {
    service: Arc<LedgerService>,
}

impl SetCommand {
    pub fn new(service: Arc<LedgerService>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl CommandHandler for SetCommand {
    fn name(&self) -> &'static str {
        "set"
    }

    fn usage(&self) -> &'static str {
        "set <username> <amount>"
    }

    async fn run(&self, ctx: &OpContext, player: &Player, args: &[&str]) -> Vec<Reply> {
        let &[username, amount] = args else {
            return usage_error(self);
        };

        let amount = match parse_cents(amount) {
            Ok(amount) => amount,
            Err(e) => return vec![Reply::Error(format!("Invalid amount: {}", e))],
        };
        if amount < 0 {
            return vec![Reply::Error("Amount must be at least 0".to_string())];
        }

        let id = match resolve_target(&self.service, ctx, player, username).await {
            Ok(id) => id,
            Err(e) => return vec![error_reply(&e, player, username, "set balance")],
        };

        match self
            .service
            .set_balance(ctx, id, Some(username), amount)
            .await
        {
            Ok(()) => vec![Reply::Success(format!(
                "Set balance of {} to {}",
                username,
                format_cents(amount)
            ))],
            Err(e) => vec![error_reply(&e, player, username, "set balance")],
        }
    }
}
