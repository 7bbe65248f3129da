use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::Cents;

/// Stable player identity. Survives display-name changes.
pub type PlayerId = Uuid;

/// Shown in rankings for accounts whose display name was never recorded.
pub const UNKNOWN_NAME: &str = "<unknown>";

/// A player's account: the only record the ledger persists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub id: PlayerId,
    /// Last-known display name, if one was ever recorded
    pub name: Option<String>,
    /// Balance in cents, never negative
    pub balance: Cents,
    /// Last write to this account
    pub updated_at: DateTime<Utc>,
}

impl Account {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(UNKNOWN_NAME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name_falls_back_when_unset() {
        let account = Account {
            id: Uuid::new_v4(),
            name: None,
            balance: 0,
            updated_at: Utc::now(),
        };
        assert_eq!(account.display_name(), UNKNOWN_NAME);

        let named = Account {
            name: Some("Steve".into()),
            ..account
        };
        assert_eq!(named.display_name(), "Steve");
    }
}
