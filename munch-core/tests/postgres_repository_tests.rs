// File: munch-core/tests/postgres_repository_tests.rs
//
// Needs a reachable Postgres (TEST_DATABASE_URL). Run with
// `cargo test -- --ignored --test-threads=1`.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use munch_common::models::{Coupon, RewardTier};
use munch_core::repositories::{
    AccountRepository, CouponDeleteOutcome, CouponRepository, PostgresAccountRepository,
    PostgresCouponRepository, PostgresRewardTierRepository, RewardTierRepository,
};
use munch_core::test_utils::fast_config;
use munch_core::test_utils::helpers::*;
use munch_core::{Error, Repositories, RewardServices};

fn tier(discount_percentage: i32, points_required: i64) -> RewardTier {
    RewardTier {
        tier_id: Uuid::new_v4(),
        discount_percentage,
        points_required,
        description: format!("{discount_percentage}% off"),
        created_at: Utc::now(),
    }
}

#[tokio::test]
#[ignore]
async fn test_account_repository() -> Result<(), Error> {
    let db = setup_test_database().await?;
    let repo = PostgresAccountRepository::new(db.pool().clone());
    let user = Uuid::new_v4();

    assert!(repo.get_account(user).await?.is_none());

    let credit = repo.apply_credit(user, 120, "credit:one").await?;
    assert_eq!(credit.balance_after, 120);

    // Replay returns the original entry.
    let replay = repo.apply_credit(user, 120, "credit:one").await?;
    assert_eq!(replay.entry_id, credit.entry_id);
    assert_eq!(repo.get_account(user).await?.map(|a| a.points), Some(120));

    let debit = repo.apply_debit(user, 20, "debit:one").await?;
    assert_eq!(debit.balance_after, 100);
    assert_eq!(debit.amount, -20);

    let err = repo.apply_debit(user, 500, "debit:two").await.unwrap_err();
    assert!(matches!(err, Error::InsufficientPoints { required: 500, available: 100 }));
    assert!(repo.find_entry(user, "debit:two").await?.is_none());

    let entries = repo.list_entries(user, 10).await?;
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].reference, "debit:one");

    Ok(())
}

#[tokio::test]
#[ignore]
async fn test_debit_for_missing_account_is_insufficient() -> Result<(), Error> {
    let db = setup_test_database().await?;
    let repo = PostgresAccountRepository::new(db.pool().clone());

    let err = repo.apply_debit(Uuid::new_v4(), 1, "debit:x").await.unwrap_err();
    assert!(matches!(err, Error::InsufficientPoints { available: 0, .. }));
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore]
async fn test_racing_debits_with_one_reference_apply_once() -> Result<(), Error> {
    let db = setup_test_database().await?;
    let repo = Arc::new(PostgresAccountRepository::new(db.pool().clone()));
    let user = Uuid::new_v4();
    repo.apply_credit(user, 100, "credit:seed").await?;

    // The balance covers exactly one debit, so losers reach the guarded
    // UPDATE and find nothing to spend.
    let tasks: Vec<_> = (0..6)
        .map(|_| {
            let repo = repo.clone();
            tokio::spawn(async move { repo.apply_debit(user, 100, "redeem:shared").await })
        })
        .collect();

    let mut entry_ids = Vec::new();
    for result in futures_util::future::join_all(tasks).await {
        entry_ids.push(result.expect("task panicked")?.entry_id);
    }
    entry_ids.dedup();
    assert_eq!(entry_ids.len(), 1);
    assert_eq!(repo.get_account(user).await?.map(|a| a.points), Some(0));
    assert_eq!(repo.list_entries(user, 10).await?.len(), 2);
    Ok(())
}

#[tokio::test]
#[ignore]
async fn test_reward_tier_repository() -> Result<(), Error> {
    let db = setup_test_database().await?;
    let repo = PostgresRewardTierRepository::new(db.pool().clone());

    let cheap = tier(5, 50);
    let pricey = tier(30, 500);
    repo.create_tier(&pricey).await?;
    repo.create_tier(&cheap).await?;
    // Same id twice is a no-op.
    repo.create_tier(&cheap).await?;

    let listed = repo.list_tiers().await?;
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].tier_id, cheap.tier_id);

    assert!(repo.delete_tier(cheap.tier_id).await?);
    assert!(!repo.delete_tier(cheap.tier_id).await?);
    assert!(repo.get_tier(cheap.tier_id).await?.is_none());
    Ok(())
}

#[tokio::test]
#[ignore]
async fn test_coupon_repository() -> Result<(), Error> {
    let db = setup_test_database().await?;
    let repo = PostgresCouponRepository::new(db.pool().clone());
    let (owner, stranger) = (Uuid::new_v4(), Uuid::new_v4());

    let source = tier(10, 100);
    let coupon = Coupon::issue(Uuid::new_v4(), owner, &source);
    repo.insert_coupon(&coupon).await?;
    repo.insert_coupon(&coupon).await?;
    assert_eq!(repo.list_coupons_for_user(owner).await?.len(), 1);

    let found = repo.find_by_code(owner, &coupon.code()).await?;
    assert_eq!(found.len(), 1);
    assert!(repo.find_by_code(stranger, &coupon.code()).await?.is_empty());

    assert_eq!(
        repo.delete_unused(coupon.coupon_id, stranger).await?,
        CouponDeleteOutcome::NotOwner
    );

    let order = Uuid::new_v4();
    let used = repo.mark_used(coupon.coupon_id, order).await?.expect("first use wins");
    assert!(used.used_at.is_some());
    assert!(used.used_by(order));
    assert!(repo.mark_used(coupon.coupon_id, order).await?.is_none());
    let stored = repo.get_coupon(coupon.coupon_id).await?.expect("coupon kept");
    assert_eq!(stored.used_by_order, Some(order));

    assert_eq!(
        repo.delete_unused(coupon.coupon_id, owner).await?,
        CouponDeleteOutcome::AlreadyUsed
    );

    let spare = Coupon::issue(Uuid::new_v4(), owner, &source);
    repo.insert_coupon(&spare).await?;
    assert_eq!(repo.delete_unused(spare.coupon_id, owner).await?, CouponDeleteOutcome::Deleted);
    assert_eq!(repo.delete_unused(spare.coupon_id, owner).await?, CouponDeleteOutcome::Missing);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore]
async fn test_concurrent_redemptions_against_postgres() -> Result<(), Error> {
    let db = setup_test_database().await?;
    let svc = RewardServices::new(Repositories::postgres(&db), &fast_config());
    let user = Uuid::new_v4();
    svc.ledger.credit(user, 300).await?;
    let tier_id = svc.catalog.create(10, 100, "10% off").await?.tier_id;

    let svc = Arc::new(svc);
    let tasks: Vec<_> = (0..6)
        .map(|_| {
            let svc = svc.clone();
            tokio::spawn(async move { svc.coupons.redeem(user, tier_id).await })
        })
        .collect();

    let mut issued = 0;
    for result in futures_util::future::join_all(tasks).await {
        match result.expect("task panicked") {
            Ok(_) => issued += 1,
            Err(Error::InsufficientPoints { .. }) => {}
            Err(e) => return Err(e),
        }
    }

    assert_eq!(issued, 3);
    assert_eq!(svc.ledger.balance(user).await?, 0);
    assert_eq!(svc.coupons.list(user).await?.len(), 3);
    Ok(())
}
