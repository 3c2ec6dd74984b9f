// File: munch-core/tests/checkout_tests.rs

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use mockall::mock;
use uuid::Uuid;

use munch_common::models::{Account, Cart, LedgerEntry};
use munch_core::config::CheckoutConfig;
use munch_core::repositories::{
    AccountRepository, CartStore, MemoryAccountRepository, MemoryCartStore, MemoryCouponRepository,
    MemoryRewardTierRepository,
};
use munch_core::services::ledger_service::order_reference;
use munch_core::services::CheckoutService;
use munch_core::test_utils::fast_config;
use munch_core::{Error, Repositories, RewardServices};

mock! {
    pub Carts {}

    #[async_trait]
    impl CartStore for Carts {
        async fn load(&self, session_id: &str) -> Result<Cart, Error>;
        async fn save(&self, session_id: &str, cart: &Cart) -> Result<(), Error>;
        async fn clear(&self, session_id: &str) -> Result<(), Error>;
    }
}

fn combo_cart(unit_price_cents: i64, quantity: u32) -> Cart {
    let mut cart = Cart::new();
    cart.add("combo-1", "Burger combo", unit_price_cents, quantity)
        .expect("valid cart line");
    cart
}

fn checkout_with(svc: &RewardServices, carts: MockCarts) -> CheckoutService {
    CheckoutService::new(
        svc.ledger.clone(),
        svc.coupons.clone(),
        Arc::new(carts),
        CheckoutConfig::default(),
    )
}

/// Refuses credits while `down` is set; everything else passes through.
struct FlakyCredits {
    inner: MemoryAccountRepository,
    down: AtomicBool,
}

#[async_trait]
impl AccountRepository for FlakyCredits {
    async fn get_account(&self, user_id: Uuid) -> Result<Option<Account>, Error> {
        self.inner.get_account(user_id).await
    }

    async fn apply_credit(&self, user_id: Uuid, amount: i64, reference: &str) -> Result<LedgerEntry, Error> {
        if self.down.load(Ordering::SeqCst) {
            return Err(Error::Transient("ledger write timed out".into()));
        }
        self.inner.apply_credit(user_id, amount, reference).await
    }

    async fn apply_debit(&self, user_id: Uuid, amount: i64, reference: &str) -> Result<LedgerEntry, Error> {
        self.inner.apply_debit(user_id, amount, reference).await
    }

    async fn find_entry(&self, user_id: Uuid, reference: &str) -> Result<Option<LedgerEntry>, Error> {
        self.inner.find_entry(user_id, reference).await
    }

    async fn list_entries(&self, user_id: Uuid, limit: i64) -> Result<Vec<LedgerEntry>, Error> {
        self.inner.list_entries(user_id, limit).await
    }
}

#[tokio::test]
async fn test_checkout_awards_floor_of_total() -> Result<(), Error> {
    let svc = RewardServices::in_memory(&fast_config());
    let user = Uuid::new_v4();

    let mut carts = MockCarts::new();
    carts
        .expect_load()
        .withf(|session_id| session_id == "s1")
        .times(1)
        .returning(|_| Ok(combo_cart(1250, 2)));
    carts.expect_clear().times(1).returning(|_| Ok(()));
    let checkout = checkout_with(&svc, carts);

    let order_id = Uuid::new_v4();
    let receipt = checkout.complete(user, "s1", order_id, None).await?;

    assert_eq!(receipt.quote.subtotal_cents, 2500);
    assert_eq!(receipt.quote.taxes_cents, 200);
    assert_eq!(receipt.quote.discount_cents, 0);
    assert_eq!(receipt.quote.total_cents, 2700);
    assert_eq!(receipt.points_earned, 27);
    assert_eq!(receipt.balance, 27);

    let entry = svc
        .ledger
        .find_entry(user, &order_reference(order_id))
        .await?
        .expect("order credit recorded");
    assert_eq!(entry.amount, 27);
    Ok(())
}

#[tokio::test]
async fn test_checkout_with_coupon_consumes_it() -> Result<(), Error> {
    let svc = RewardServices::in_memory(&fast_config());
    let user = Uuid::new_v4();
    svc.ledger.credit(user, 100).await?;
    let tier = svc.catalog.create(10, 100, "10% off").await?;
    let coupon = svc.coupons.redeem(user, tier.tier_id).await?;

    let mut carts = MockCarts::new();
    carts.expect_load().returning(|_| Ok(combo_cart(10_000, 1)));
    carts.expect_clear().times(1).returning(|_| Ok(()));
    let checkout = checkout_with(&svc, carts);

    let receipt = checkout
        .complete(user, "s1", Uuid::new_v4(), Some(coupon.coupon_id))
        .await?;
    assert_eq!(receipt.quote.taxes_cents, 800);
    assert_eq!(receipt.quote.discount_cents, 1080);
    assert_eq!(receipt.quote.total_cents, 9720);
    assert_eq!(receipt.points_earned, 97);
    assert_eq!(receipt.balance, 97);
    assert_eq!(receipt.quote.coupon.map(|c| c.coupon_id), Some(coupon.coupon_id));

    // Second order with the same coupon is refused before any points move.
    let err = checkout
        .complete(user, "s1", Uuid::new_v4(), Some(coupon.coupon_id))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::AlreadyUsed(_)));
    assert_eq!(svc.ledger.balance(user).await?, 97);
    Ok(())
}

#[tokio::test]
async fn test_repeated_completion_credits_once() -> Result<(), Error> {
    let svc = RewardServices::in_memory(&fast_config());
    let user = Uuid::new_v4();

    let mut carts = MockCarts::new();
    carts.expect_load().times(2).returning(|_| Ok(combo_cart(5_000, 1)));
    carts.expect_clear().times(2).returning(|_| Ok(()));
    let checkout = checkout_with(&svc, carts);

    let order_id = Uuid::new_v4();
    let first = checkout.complete(user, "s1", order_id, None).await?;
    let second = checkout.complete(user, "s1", order_id, None).await?;

    assert_eq!(first.balance, 54);
    assert_eq!(second.balance, 54);
    assert_eq!(svc.ledger.balance(user).await?, 54);
    assert_eq!(svc.ledger.history(user, 10).await?.len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_cart_clear_failure_does_not_fail_checkout() -> Result<(), Error> {
    let svc = RewardServices::in_memory(&fast_config());
    let user = Uuid::new_v4();

    let mut carts = MockCarts::new();
    carts.expect_load().returning(|_| Ok(combo_cart(300, 1)));
    carts
        .expect_clear()
        .returning(|_| Err(Error::Transient("session store down".into())));
    let checkout = checkout_with(&svc, carts);

    let receipt = checkout.complete(user, "s1", Uuid::new_v4(), None).await?;
    assert_eq!(receipt.quote.total_cents, 324);
    assert_eq!(receipt.points_earned, 3);
    Ok(())
}

#[tokio::test]
async fn test_cart_load_failure_awards_nothing() -> Result<(), Error> {
    let svc = RewardServices::in_memory(&fast_config());
    let user = Uuid::new_v4();

    let mut carts = MockCarts::new();
    carts
        .expect_load()
        .returning(|_| Err(Error::Parse("corrupt cart document".into())));
    carts.expect_clear().never();
    let checkout = checkout_with(&svc, carts);

    assert!(checkout.complete(user, "s1", Uuid::new_v4(), None).await.is_err());
    assert_eq!(svc.ledger.balance(user).await?, 0);
    Ok(())
}

#[tokio::test]
async fn test_empty_cart_is_rejected() -> Result<(), Error> {
    let svc = RewardServices::in_memory(&fast_config());
    let user = Uuid::new_v4();

    let err = svc
        .checkout
        .complete(user, "nobody-shopped", Uuid::new_v4(), None)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));
    Ok(())
}

#[tokio::test]
async fn test_quote_with_foreign_coupon_is_refused() -> Result<(), Error> {
    let svc = RewardServices::in_memory(&fast_config());
    let (owner, other) = (Uuid::new_v4(), Uuid::new_v4());
    svc.ledger.credit(owner, 100).await?;
    let tier = svc.catalog.create(10, 100, "10% off").await?;
    let coupon = svc.coupons.redeem(owner, tier.tier_id).await?;

    let cart = combo_cart(1_000, 1);
    let err = svc
        .checkout
        .quote(other, &cart, Some(coupon.coupon_id))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotOwner { .. }));

    // Quoting never consumes the coupon.
    let quote = svc.checkout.quote(owner, &cart, Some(coupon.coupon_id)).await?;
    assert_eq!(quote.discount_cents, 108);
    assert!(svc.coupons.apply(coupon.coupon_id, owner).await.is_ok());
    Ok(())
}

#[tokio::test]
async fn test_session_cart_is_cleared_after_checkout() -> Result<(), Error> {
    let svc = RewardServices::in_memory(&fast_config());
    let user = Uuid::new_v4();

    let carts = svc.checkout.carts();
    carts.save("s9", &combo_cart(999, 3)).await?;
    assert_eq!(carts.load("s9").await?.subtotal_cents(), 2997);

    let receipt = svc.checkout.complete(user, "s9", Uuid::new_v4(), None).await?;
    assert_eq!(receipt.quote.total_cents, 3237);
    assert_eq!(receipt.points_earned, 32);
    assert!(carts.load("s9").await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_game_points_are_awarded_once_per_session() -> Result<(), Error> {
    let svc = RewardServices::in_memory(&fast_config());
    let user = Uuid::new_v4();
    let session = Uuid::new_v4();

    let award = svc.games.complete_game(user, session, 7).await?;
    assert_eq!(award.points_earned, 35);
    assert_eq!(award.balance, 35);

    let replay = svc.games.complete_game(user, session, 7).await?;
    assert_eq!(replay.balance, 35);

    let nothing = svc.games.complete_game(user, Uuid::new_v4(), 0).await?;
    assert_eq!(nothing.points_earned, 0);
    assert_eq!(svc.ledger.balance(user).await?, 35);
    Ok(())
}

#[tokio::test]
async fn test_resent_checkout_finishes_after_award_failure() -> Result<(), Error> {
    let accounts = Arc::new(FlakyCredits {
        inner: MemoryAccountRepository::new(),
        down: AtomicBool::new(false),
    });
    let repos = Repositories {
        accounts: accounts.clone(),
        tiers: Arc::new(MemoryRewardTierRepository::new()),
        coupons: Arc::new(MemoryCouponRepository::new()),
        carts: Arc::new(MemoryCartStore::new()),
    };
    let svc = RewardServices::new(repos, &fast_config());
    let user = Uuid::new_v4();
    svc.ledger.credit(user, 100).await?;
    let tier = svc.catalog.create(10, 100, "10% off").await?;
    let coupon = svc.coupons.redeem(user, tier.tier_id).await?;
    svc.checkout.carts().save("s1", &combo_cart(10_000, 1)).await?;

    let order_id = Uuid::new_v4();
    accounts.down.store(true, Ordering::SeqCst);
    let err = svc
        .checkout
        .complete(user, "s1", order_id, Some(coupon.coupon_id))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::LedgerUnavailable(_)));

    // The coupon went to this order even though no points were awarded.
    let stored = svc.coupons.list(user).await?;
    assert!(stored[0].used_by(order_id));
    assert_eq!(svc.ledger.balance(user).await?, 0);

    accounts.down.store(false, Ordering::SeqCst);
    let receipt = svc
        .checkout
        .complete(user, "s1", order_id, Some(coupon.coupon_id))
        .await?;
    assert_eq!(receipt.quote.discount_cents, 1080);
    assert_eq!(receipt.points_earned, 97);
    assert_eq!(receipt.balance, 97);

    // A different order still cannot reuse it.
    svc.checkout.carts().save("s2", &combo_cart(10_000, 1)).await?;
    assert!(matches!(
        svc.checkout.complete(user, "s2", Uuid::new_v4(), Some(coupon.coupon_id)).await,
        Err(Error::AlreadyUsed(_))
    ));
    assert_eq!(svc.ledger.balance(user).await?, 97);
    Ok(())
}
