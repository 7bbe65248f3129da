use std::sync::Arc;

use async_trait::async_trait;

use crate::application::LedgerService;
use crate::context::OpContext;
use crate::domain::{format_cents, parse_cents};

use super::{CommandHandler, Player, Reply, error_reply, resolve_target, usage_error};

/// `/economy pay <username> <amount>`
pub struct PayCommand {
    service: Arc<LedgerService>,
}

impl PayCommand {
    pub fn new(service: Arc<LedgerService>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl CommandHandler for PayCommand {
    fn name(&self) -> &'static str {
        "pay"
    }

    fn usage(&self) -> &'static str {
        "pay <username> <amount>"
    }

    async fn run(&self, ctx: &OpContext, player: &Player, args: &[&str]) -> Vec<Reply> {
        let &[username, amount] = args else {
            return usage_error(self);
        };

        let amount = match parse_cents(amount) {
            Ok(amount) => amount,
            Err(e) => return vec![Reply::Error(format!("Invalid amount: {}", e))],
        };
        if amount <= 0 {
            return vec![Reply::Error("Amount must be positive".to_string())];
        }

        let target = match resolve_target(&self.service, ctx, player, username).await {
            Ok(id) => id,
            Err(e) => return vec![error_reply(&e, player, username, "pay")],
        };
        if target == player.id {
            return vec![Reply::Error("Cannot pay yourself".to_string())];
        }

        match self.service.transfer(ctx, player.id, target, amount).await {
            Ok(()) => vec![Reply::Success(format!(
                "You paid {} to {}",
                format_cents(amount),
                username
            ))],
            Err(e) => vec![error_reply(&e, player, username, "pay")],
        }
    }
}
