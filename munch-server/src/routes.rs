//! munch-server/src/routes.rs
//!
//! HTTP surface over `RewardServices`. Every route except `/health` acts on
//! behalf of the user named by the `x-user-id` header.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use munch_common::models::{AppliedCoupon, Cart, CartItem, Coupon, LedgerEntry, NewRewardTier, RewardTier};
use munch_core::services::{CheckoutQuote, CheckoutReceipt, GameAward};
use munch_core::RewardServices;

use crate::error::ApiError;
use crate::identity::AuthenticatedUser;

type ApiResult<T> = Result<T, ApiError>;

const DEFAULT_HISTORY_LIMIT: i64 = 50;
const MAX_HISTORY_LIMIT: i64 = 500;

pub fn router(services: RewardServices) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/points", get(get_points))
        .route("/points/history", get(get_history))
        .route("/rewards", get(list_rewards))
        .route("/admin/rewards", post(create_reward))
        .route("/admin/rewards/{tier_id}", delete(delete_reward))
        .route("/rewards/{tier_id}/redeem", post(redeem_reward))
        .route("/coupons", get(list_coupons))
        .route("/coupons/apply", post(apply_coupon))
        .route("/coupons/{coupon_id}", delete(delete_coupon))
        .route("/cart/{session_id}", get(get_cart).delete(clear_cart))
        .route("/cart/{session_id}/items", post(add_cart_item))
        .route(
            "/cart/{session_id}/items/{product_id}",
            put(update_cart_item).delete(remove_cart_item),
        )
        .route("/checkout/quote", post(checkout_quote))
        .route("/checkout", post(checkout))
        .route("/games/complete", post(complete_game))
        .with_state(services)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
}

async fn health() -> StatusCode {
    StatusCode::OK
}

// ----------------------------------------------------------------------------
// Points
// ----------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
pub struct PointsResponse {
    pub user_id: Uuid,
    pub points: i64,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<i64>,
}

async fn get_points(
    State(svc): State<RewardServices>,
    AuthenticatedUser(user_id): AuthenticatedUser,
) -> ApiResult<Json<PointsResponse>> {
    let points = svc.ledger.balance(user_id).await?;
    Ok(Json(PointsResponse { user_id, points }))
}

async fn get_history(
    State(svc): State<RewardServices>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    query: Result<Query<HistoryQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<LedgerEntry>>> {
    let Query(query) = query?;
    let limit = query
        .limit
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
        .clamp(0, MAX_HISTORY_LIMIT);
    Ok(Json(svc.ledger.history(user_id, limit).await?))
}

// ----------------------------------------------------------------------------
// Reward tiers
// ----------------------------------------------------------------------------

async fn list_rewards(State(svc): State<RewardServices>) -> ApiResult<Json<Vec<RewardTier>>> {
    Ok(Json(svc.catalog.list().await?))
}

async fn create_reward(
    State(svc): State<RewardServices>,
    AuthenticatedUser(_admin): AuthenticatedUser,
    payload: Result<Json<NewRewardTier>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<RewardTier>)> {
    let Json(input) = payload?;
    let tier = svc
        .catalog
        .create(input.discount_percentage, input.points_required, &input.description)
        .await?;
    Ok((StatusCode::CREATED, Json(tier)))
}

async fn delete_reward(
    State(svc): State<RewardServices>,
    AuthenticatedUser(_admin): AuthenticatedUser,
    tier_id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<StatusCode> {
    let Path(tier_id) = tier_id?;
    svc.catalog.delete(tier_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ----------------------------------------------------------------------------
// Coupons
// ----------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
pub struct CouponView {
    pub coupon_id: Uuid,
    pub code: String,
    pub tier_id: Option<Uuid>,
    pub discount_percentage: i32,
    pub issued_at: DateTime<Utc>,
    pub used_at: Option<DateTime<Utc>>,
    pub active: bool,
}

impl From<Coupon> for CouponView {
    fn from(c: Coupon) -> Self {
        Self {
            code: c.code(),
            active: c.is_active(),
            coupon_id: c.coupon_id,
            tier_id: c.tier_id,
            discount_percentage: c.discount_percentage,
            issued_at: c.issued_at,
            used_at: c.used_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RedeemResponse {
    pub coupon: CouponView,
    pub points: i64,
}

/// Either the full id or the displayed code.
#[derive(Debug, Deserialize)]
pub struct ApplyCouponRequest {
    pub coupon_id: Option<Uuid>,
    pub code: Option<String>,
}

async fn redeem_reward(
    State(svc): State<RewardServices>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    tier_id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<(StatusCode, Json<RedeemResponse>)> {
    let Path(tier_id) = tier_id?;
    let redemption = svc.coupons.redeem_with_balance(user_id, tier_id).await?;
    Ok((
        StatusCode::CREATED,
        Json(RedeemResponse {
            coupon: redemption.coupon.into(),
            points: redemption.balance,
        }),
    ))
}

async fn list_coupons(
    State(svc): State<RewardServices>,
    AuthenticatedUser(user_id): AuthenticatedUser,
) -> ApiResult<Json<Vec<CouponView>>> {
    let coupons = svc.coupons.list(user_id).await?;
    Ok(Json(coupons.into_iter().map(CouponView::from).collect()))
}

async fn apply_coupon(
    State(svc): State<RewardServices>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    payload: Result<Json<ApplyCouponRequest>, JsonRejection>,
) -> ApiResult<Json<AppliedCoupon>> {
    let Json(req) = payload?;
    let applied = match (req.coupon_id, req.code.as_deref()) {
        (Some(coupon_id), _) => svc.coupons.apply(coupon_id, user_id).await?,
        (None, Some(code)) => svc.coupons.apply_code(user_id, code).await?,
        (None, None) => {
            return Err(ApiError::MalformedPayload("coupon_id or code is required".into()));
        }
    };
    Ok(Json(applied))
}

async fn delete_coupon(
    State(svc): State<RewardServices>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    coupon_id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<StatusCode> {
    let Path(coupon_id) = coupon_id?;
    svc.coupons.delete(coupon_id, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ----------------------------------------------------------------------------
// Cart
// ----------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
pub struct CartView {
    pub items: Vec<CartItem>,
    pub subtotal_cents: i64,
}

impl From<Cart> for CartView {
    fn from(cart: Cart) -> Self {
        Self { subtotal_cents: cart.subtotal_cents(), items: cart.items }
    }
}

#[derive(Debug, Deserialize)]
pub struct AddItemRequest {
    pub product_id: String,
    pub name: String,
    pub unit_price_cents: i64,
    #[serde(default = "one")]
    pub quantity: u32,
}

fn one() -> u32 {
    1
}

#[derive(Debug, Deserialize)]
pub struct UpdateQuantityRequest {
    pub quantity: u32,
}

async fn get_cart(
    State(svc): State<RewardServices>,
    AuthenticatedUser(_user): AuthenticatedUser,
    session_id: Result<Path<String>, PathRejection>,
) -> ApiResult<Json<CartView>> {
    let Path(session_id) = session_id?;
    let cart = svc.checkout.carts().load(&session_id).await?;
    Ok(Json(cart.into()))
}

async fn clear_cart(
    State(svc): State<RewardServices>,
    AuthenticatedUser(_user): AuthenticatedUser,
    session_id: Result<Path<String>, PathRejection>,
) -> ApiResult<StatusCode> {
    let Path(session_id) = session_id?;
    svc.checkout.carts().clear(&session_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn add_cart_item(
    State(svc): State<RewardServices>,
    AuthenticatedUser(_user): AuthenticatedUser,
    session_id: Result<Path<String>, PathRejection>,
    payload: Result<Json<AddItemRequest>, JsonRejection>,
) -> ApiResult<Json<CartView>> {
    let Path(session_id) = session_id?;
    let Json(item) = payload?;

    let carts = svc.checkout.carts();
    let mut cart = carts.load(&session_id).await?;
    cart.add(&item.product_id, &item.name, item.unit_price_cents, item.quantity)?;
    carts.save(&session_id, &cart).await?;
    Ok(Json(cart.into()))
}

async fn update_cart_item(
    State(svc): State<RewardServices>,
    AuthenticatedUser(_user): AuthenticatedUser,
    path: Result<Path<(String, String)>, PathRejection>,
    payload: Result<Json<UpdateQuantityRequest>, JsonRejection>,
) -> ApiResult<Json<CartView>> {
    let Path((session_id, product_id)) = path?;
    let Json(req) = payload?;

    let carts = svc.checkout.carts();
    let mut cart = carts.load(&session_id).await?;
    cart.update_quantity(&product_id, req.quantity)?;
    carts.save(&session_id, &cart).await?;
    Ok(Json(cart.into()))
}

async fn remove_cart_item(
    State(svc): State<RewardServices>,
    AuthenticatedUser(_user): AuthenticatedUser,
    path: Result<Path<(String, String)>, PathRejection>,
) -> ApiResult<Json<CartView>> {
    let Path((session_id, product_id)) = path?;

    let carts = svc.checkout.carts();
    let mut cart = carts.load(&session_id).await?;
    if cart.remove(&product_id) {
        carts.save(&session_id, &cart).await?;
    }
    Ok(Json(cart.into()))
}

// ----------------------------------------------------------------------------
// Checkout & games
// ----------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct QuoteRequest {
    pub session_id: String,
    pub coupon_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    pub session_id: String,
    /// Supplied by clients that may resend the request; generated otherwise.
    pub order_id: Option<Uuid>,
    pub coupon_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct GameCompleteRequest {
    pub game_session_id: Uuid,
    pub score: u32,
}

async fn checkout_quote(
    State(svc): State<RewardServices>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    payload: Result<Json<QuoteRequest>, JsonRejection>,
) -> ApiResult<Json<CheckoutQuote>> {
    let Json(req) = payload?;
    let cart = svc.checkout.carts().load(&req.session_id).await?;
    Ok(Json(svc.checkout.quote(user_id, &cart, req.coupon_id).await?))
}

async fn checkout(
    State(svc): State<RewardServices>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    payload: Result<Json<CheckoutRequest>, JsonRejection>,
) -> ApiResult<Json<CheckoutReceipt>> {
    let Json(req) = payload?;
    let order_id = req.order_id.unwrap_or_else(Uuid::new_v4);
    let receipt = svc
        .checkout
        .complete(user_id, &req.session_id, order_id, req.coupon_id)
        .await?;
    Ok(Json(receipt))
}

async fn complete_game(
    State(svc): State<RewardServices>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    payload: Result<Json<GameCompleteRequest>, JsonRejection>,
) -> ApiResult<Json<GameAward>> {
    let Json(req) = payload?;
    let award = svc
        .games
        .complete_game(user_id, req.game_session_id, req.score)
        .await?;
    Ok(Json(award))
}
