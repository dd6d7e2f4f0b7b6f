use super::prize_service::{PrizeService, PrizeServiceTrait};
use database::{
    commission::repository::CommissionRepositoryTrait,
    commission_rule::model::CommissionRule,
    prize::{model::PrizeName, repository::PrizeRepositoryTrait},
    user::{model::User, repository::UserRepositoryTrait},
    MemoryStore,
};
use std::sync::Arc;
use utils::AppError;

fn engine(store: &Arc<MemoryStore>) -> PrizeService {
    PrizeService::new(store.clone(), store.clone(), store.clone())
}

/// A <- B <- C <- D
async fn chain_store() -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::with_default_rules());
    store.create_user("AAAAAAAA", "A", None).await.unwrap();
    store.create_user("BBBBBBBB", "B", Some("AAAAAAAA")).await.unwrap();
    store.create_user("CCCCCCCC", "C", Some("BBBBBBBB")).await.unwrap();
    store.create_user("DDDDDDDD", "D", Some("CCCCCCCC")).await.unwrap();
    store
}

fn summary(commissions: &[database::commission::model::Commission]) -> Vec<(&str, i32, i64)> {
    commissions
        .iter()
        .map(|c| (c.user_id.as_str(), c.level, c.amount))
        .collect()
}

#[tokio::test]
async fn test_three_level_payout() {
    let store = chain_store().await;

    let registration = engine(&store).register_prize("DDDDDDDD", "組合A").await.unwrap();

    assert_eq!(registration.prize.winner_id, "DDDDDDDD");
    assert_eq!(registration.prize.prize_name, PrizeName::ComboA);
    assert_eq!(
        summary(&registration.commissions),
        vec![("CCCCCCCC", 1, 150), ("BBBBBBBB", 2, 100), ("AAAAAAAA", 3, 50)]
    );
    for commission in &registration.commissions {
        assert_eq!(commission.prize_id, registration.prize.id);
        assert_eq!(commission.winner_id, "DDDDDDDD");
    }
}

#[tokio::test]
async fn test_short_chain_stops_early() {
    let store = chain_store().await;
    let engine = engine(&store);

    let registration = engine.register_prize("BBBBBBBB", "組合A").await.unwrap();
    assert_eq!(summary(&registration.commissions), vec![("AAAAAAAA", 1, 150)]);

    let registration = engine.register_prize("CCCCCCCC", "組合B").await.unwrap();
    assert_eq!(
        summary(&registration.commissions),
        vec![("BBBBBBBB", 1, 150), ("AAAAAAAA", 2, 100)]
    );
}

#[tokio::test]
async fn test_no_referrer_still_records_prize() {
    let store = chain_store().await;

    let registration = engine(&store).register_prize("AAAAAAAA", "組合B").await.unwrap();

    assert!(registration.commissions.is_empty());
    assert_eq!(store.list_prizes().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_chain_longer_than_three_pays_three() {
    let store = chain_store().await;
    store.create_user("EEEEEEEE", "E", Some("DDDDDDDD")).await.unwrap();

    let registration = engine(&store).register_prize("EEEEEEEE", "組合A").await.unwrap();

    assert_eq!(
        summary(&registration.commissions),
        vec![("DDDDDDDD", 1, 150), ("CCCCCCCC", 2, 100), ("BBBBBBBB", 3, 50)]
    );
}

#[tokio::test]
async fn test_unknown_winner_creates_nothing() {
    let store = chain_store().await;

    let result = engine(&store).register_prize("ZZZZZZZZ", "組合A").await;

    assert!(matches!(result, Err(AppError::NotFound(_))));
    assert!(store.list_prizes().await.unwrap().is_empty());
    assert!(store.list_recent_commissions(100).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_invalid_prize_name_creates_nothing() {
    let store = chain_store().await;
    let engine = engine(&store);

    assert!(matches!(
        engine.register_prize("DDDDDDDD", "組合C").await,
        Err(AppError::BadRequest(_))
    ));
    assert!(matches!(engine.register_prize("DDDDDDDD", "").await, Err(AppError::BadRequest(_))));
    assert!(matches!(engine.register_prize("  ", "組合A").await, Err(AppError::BadRequest(_))));

    assert!(store.list_prizes().await.unwrap().is_empty());
    assert!(store.list_recent_commissions(100).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_failed_commission_write_rolls_back_prize() {
    let store = chain_store().await;
    store.fail_commission_write_at(2);

    let result = engine(&store).register_prize("DDDDDDDD", "組合A").await;

    assert!(result.is_err());
    assert!(store.list_prizes().await.unwrap().is_empty());
    assert!(store.list_recent_commissions(100).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_depth_follows_rule_schedule() {
    let store = chain_store().await;
    store
        .replace_rules(vec![
            CommissionRule { level: 1, amount: 80 },
            CommissionRule { level: 2, amount: 20 },
        ])
        .unwrap();

    let registration = engine(&store).register_prize("DDDDDDDD", "組合A").await.unwrap();

    assert_eq!(
        summary(&registration.commissions),
        vec![("CCCCCCCC", 1, 80), ("BBBBBBBB", 2, 20)]
    );
}

#[tokio::test]
async fn test_amounts_are_snapshotted() {
    let store = chain_store().await;
    let engine = engine(&store);

    engine.register_prize("BBBBBBBB", "組合A").await.unwrap();
    store
        .replace_rules(vec![CommissionRule { level: 1, amount: 999 }])
        .unwrap();
    engine.register_prize("BBBBBBBB", "組合B").await.unwrap();

    let earned = store.list_commissions_for_user("AAAAAAAA").await.unwrap();
    let amounts: Vec<i64> = earned.iter().map(|c| c.amount).collect();
    assert_eq!(amounts, vec![999, 150]);
}

#[tokio::test]
async fn test_dangling_referrer_stops_walk() {
    let store = chain_store().await;
    store
        .insert_raw_user(User {
            id: "ORPHAN01".to_string(),
            name: "orphan".to_string(),
            referrer_id: Some("GONE0000".to_string()),
            created_at: 0,
        })
        .unwrap();

    let registration = engine(&store).register_prize("ORPHAN01", "組合A").await.unwrap();

    assert!(registration.commissions.is_empty());
}

#[tokio::test]
async fn test_cycle_is_bounded_by_max_level() {
    let store = Arc::new(MemoryStore::with_default_rules());
    store
        .insert_raw_user(User {
            id: "LOOPA000".to_string(),
            name: "loop-a".to_string(),
            referrer_id: Some("LOOPB000".to_string()),
            created_at: 0,
        })
        .unwrap();
    store
        .insert_raw_user(User {
            id: "LOOPB000".to_string(),
            name: "loop-b".to_string(),
            referrer_id: Some("LOOPA000".to_string()),
            created_at: 0,
        })
        .unwrap();

    let registration = engine(&store).register_prize("LOOPA000", "組合A").await.unwrap();

    assert_eq!(
        summary(&registration.commissions),
        vec![("LOOPB000", 1, 150), ("LOOPA000", 2, 100), ("LOOPB000", 3, 50)]
    );
}

#[tokio::test]
async fn test_list_prizes_resolves_winner_names() {
    let store = chain_store().await;
    let engine = engine(&store);
    engine.register_prize("CCCCCCCC", "組合A").await.unwrap();
    engine.register_prize("DDDDDDDD", "組合B").await.unwrap();

    let prizes = engine.list_prizes().await.unwrap();

    assert_eq!(prizes.len(), 2);
    assert_eq!(prizes[0].winner_name.as_deref(), Some("D"));
    assert_eq!(prizes[1].winner_name.as_deref(), Some("C"));
}
