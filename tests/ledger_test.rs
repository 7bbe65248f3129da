mod common;

use anyhow::Result;
use common::{ctx, seed, test_config, test_service};
use dfeconomy::{LedgerError, LedgerService};
use uuid::Uuid;

#[tokio::test]
async fn test_register_grants_default_balance_once() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let id = Uuid::new_v4();

    assert!(service.register_if_absent(&ctx(), id, "Alex").await?);
    assert_eq!(service.get_balance(&ctx(), id).await?, 10_000);

    service.set_balance(&ctx(), id, None, 1).await?;
    assert!(!service.register_if_absent(&ctx(), id, "Alex").await?);
    assert_eq!(service.get_balance(&ctx(), id).await?, 1);

    Ok(())
}

#[tokio::test]
async fn test_get_account_returns_record() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let id = seed(&service, "Alex", 2_500).await?;

    let account = service.get_account(&ctx(), id).await?;
    assert_eq!(account.id, id);
    assert_eq!(account.display_name(), "Alex");
    assert_eq!(account.balance, 2_500);

    let err = service.get_account(&ctx(), Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, LedgerError::UnknownPlayer(_)));
    Ok(())
}

#[tokio::test]
async fn test_unknown_player_errors() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let ghost = Uuid::new_v4();

    let err = service.get_balance(&ctx(), ghost).await.unwrap_err();
    assert!(matches!(err, LedgerError::UnknownPlayer(ref id) if *id == ghost.to_string()));

    let err = service
        .lookup_identity_by_name(&ctx(), "Nobody")
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::UnknownPlayer(ref name) if name == "Nobody"));
    Ok(())
}

#[tokio::test]
async fn test_transfer_reports_which_player_is_unknown() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let alex = seed(&service, "Alex", 1_000).await?;
    let ghost = Uuid::new_v4();

    let err = service.transfer(&ctx(), alex, ghost, 10).await.unwrap_err();
    assert!(matches!(err, LedgerError::UnknownPlayer(ref id) if *id == ghost.to_string()));

    let err = service.transfer(&ctx(), ghost, alex, 10).await.unwrap_err();
    assert!(matches!(err, LedgerError::UnknownPlayer(ref id) if *id == ghost.to_string()));

    assert_eq!(service.get_balance(&ctx(), alex).await?, 1_000);
    Ok(())
}

#[tokio::test]
async fn test_transfer_validation() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let alex = seed(&service, "Alex", 1_000).await?;
    let sam = seed(&service, "Sam", 0).await?;

    let err = service.transfer(&ctx(), alex, alex, 10).await.unwrap_err();
    assert!(matches!(err, LedgerError::Validation(ref m) if m == "cannot target self"));

    let err = service.transfer(&ctx(), alex, sam, 0).await.unwrap_err();
    assert!(matches!(err, LedgerError::Validation(_)));

    let err = service.transfer(&ctx(), sam, alex, 1).await.unwrap_err();
    assert!(matches!(
        err,
        LedgerError::InsufficientFunds {
            required: 1,
            available: 0
        }
    ));
    Ok(())
}

#[tokio::test]
async fn test_set_balance_rejects_negative_amount() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let id = Uuid::new_v4();

    let err = service
        .set_balance(&ctx(), id, Some("Alex"), -100)
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::Validation(_)));

    let err = service.get_balance(&ctx(), id).await.unwrap_err();
    assert!(matches!(err, LedgerError::UnknownPlayer(_)));
    Ok(())
}

#[tokio::test]
async fn test_ranking_assigns_global_ranks() -> Result<()> {
    let (service, _temp) = test_service().await?;
    for (name, balance) in [("A", 100), ("B", 300), ("C", 200)] {
        seed(&service, name, balance).await?;
    }

    let first = service.get_ranking(&ctx(), 1, 2).await?;
    let summary: Vec<_> = first
        .iter()
        .map(|e| (e.rank, e.account.display_name().to_string(), e.account.balance))
        .collect();
    assert_eq!(
        summary,
        vec![(1, "B".to_string(), 300), (2, "C".to_string(), 200)]
    );

    let second = service.get_ranking(&ctx(), 2, 2).await?;
    assert_eq!(second.len(), 1);
    assert_eq!(second[0].rank, 3);
    assert_eq!(second[0].account.display_name(), "A");
    Ok(())
}

#[tokio::test]
async fn test_ranking_past_the_end_is_page_not_found() -> Result<()> {
    let (service, _temp) = test_service().await?;

    // No accounts at all
    let err = service.get_ranking(&ctx(), 1, 10).await.unwrap_err();
    assert!(matches!(err, LedgerError::PageNotFound(1)));

    seed(&service, "A", 1).await?;
    let err = service.get_ranking(&ctx(), 2, 10).await.unwrap_err();
    assert!(matches!(err, LedgerError::PageNotFound(2)));

    let err = service.get_ranking(&ctx(), i64::MAX, 10).await.unwrap_err();
    assert!(matches!(err, LedgerError::PageNotFound(i64::MAX)));
    Ok(())
}

#[tokio::test]
async fn test_ranking_rejects_non_positive_bounds() -> Result<()> {
    let (service, _temp) = test_service().await?;
    seed(&service, "A", 1).await?;

    let err = service.get_ranking(&ctx(), 0, 10).await.unwrap_err();
    assert!(matches!(err, LedgerError::Validation(ref m) if m == "page must be at least 1"));

    let err = service.get_ranking(&ctx(), 1, 0).await.unwrap_err();
    assert!(matches!(err, LedgerError::Validation(_)));
    Ok(())
}

#[tokio::test]
async fn test_transfers_conserve_total_supply() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let a = seed(&service, "A", 5_000).await?;
    let b = seed(&service, "B", 3_000).await?;
    let c = seed(&service, "C", 2_000).await?;

    service.transfer(&ctx(), a, b, 1_500).await?;
    service.transfer(&ctx(), b, c, 4_000).await?;
    service.transfer(&ctx(), c, a, 999).await?;
    // Fails without side effects
    let _ = service.transfer(&ctx(), b, a, 1_000_000).await;

    let total: i64 = service
        .get_ranking(&ctx(), 1, 100)
        .await?
        .iter()
        .map(|e| e.account.balance)
        .sum();
    assert_eq!(total, 10_000);
    Ok(())
}

#[tokio::test]
async fn test_init_accepts_any_file_path() -> Result<()> {
    let temp = tempfile::TempDir::new()?;
    let dir = temp.path().join("srv?v2");
    std::fs::create_dir(&dir)?;
    let config = dfeconomy::config::EconomyConfig {
        database_path: dir.join("economy.db"),
        ..test_config(&temp)
    };

    let service = LedgerService::init(&config).await?;
    let id = Uuid::new_v4();
    assert!(service.register_if_absent(&ctx(), id, "Alex").await?);
    assert_eq!(service.get_balance(&ctx(), id).await?, 10_000);
    Ok(())
}
