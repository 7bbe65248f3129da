use std::sync::Arc;

use async_trait::async_trait;

use crate::application::LedgerService;
use crate::context::OpContext;
use crate::domain::format_cents;

use super::{CommandHandler, Player, Reply, error_reply, resolve_target, usage_error};

/// `/economy balance [username]`
pub struct BalanceCommand {
    service: Arc<LedgerService>,
}

impl BalanceCommand {
    pub fn new(service: Arc<LedgerService>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl CommandHandler for BalanceCommand {
    fn name(&self) -> &'static str {
        "balance"
    }

    fn usage(&self) -> &'static str {
        "balance [username]"
    }

    async fn run(&self, ctx: &OpContext, player: &Player, args: &[&str]) -> Vec<Reply> {
        let target = match args {
            [] => player.name.as_str(),
            &[username] => username,
            _ => return usage_error(self),
        };

        let id = match resolve_target(&self.service, ctx, player, target).await {
            Ok(id) => id,
            Err(e) => return vec![error_reply(&e, player, target, "get balance")],
        };

        match self.service.get_balance(ctx, id).await {
            Ok(balance) => vec![Reply::Success(format!(
                "{}: {}",
                target,
                format_cents(balance)
            ))],
            Err(e) => vec![error_reply(&e, player, target, "get balance")],
        }
    }
}
