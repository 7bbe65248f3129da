use std::sync::Arc;

use async_trait::async_trait;

use crate::application::LedgerService;
use crate::context::OpContext;
use crate::domain::format_cents;

use super::{CommandHandler, Player, Reply, error_reply, usage_error};

/// Leaderboard entries per page
pub const TOP_PAGE_SIZE: i64 = 10;

/// `/economy top [page]`
pub struct TopCommand {
    service: Arc<LedgerService>,
}

impl TopCommand {
    pub fn new(service: Arc<LedgerService>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl CommandHandler for TopCommand {
    fn name(&self) -> &'static str {
        "top"
    }

    fn usage(&self) -> &'static str {
        "top [page]"
    }

    async fn run(&self, ctx: &OpContext, player: &Player, args: &[&str]) -> Vec<Reply> {
        let page = match args {
            [] => 1,
            [page] => match page.parse::<i64>() {
                Ok(page) => page,
                Err(_) => return vec![Reply::Error("Page must be a number".to_string())],
            },
            _ => return usage_error(self),
        };

        let entries = match self.service.get_ranking(ctx, page, TOP_PAGE_SIZE).await {
            Ok(entries) => entries,
            Err(e) => return vec![error_reply(&e, player, "", "get top balances")],
        };

        let mut replies = Vec::with_capacity(entries.len() + 1);
        replies.push(Reply::Info(format!("[Top Balances - Page {}]", page)));
        replies.extend(entries.iter().map(|entry| {
            Reply::Info(format!(
                "#{} {}: {}",
                entry.rank,
                entry.account.display_name(),
                format_cents(entry.account.balance)
            ))
        }));
        replies
    }
}
