use cucumber::{then, when};
use loyalty_engine::{
    db_types::{OrderNumber, OrderStatusType},
    LedgerManagement,
    OrderManagement,
};
use lp_common::Points;

use crate::cucumber::LoyaltyWorld;

fn points(s: &str) -> Points {
    s.parse().expect("Not a valid amount of points")
}

#[when(expr = "user {int} uploads order {word}")]
async fn upload_order(world: &mut LoyaltyWorld, user_id: i64, number: String) {
    match world.system().orders.upload_order(user_id, &number).await {
        Ok(_) => world.last_error = None,
        Err(e) => world.last_error = Some(e.to_string()),
    }
}

#[when(expr = "the accrual service settles order {word} as {word} with {word} points")]
async fn settle_order(world: &mut LoyaltyWorld, number: String, status: String, accrual: String) {
    let status: OrderStatusType = status.parse().expect("Not a valid order status");
    let db = &world.system().db;
    let order = db
        .fetch_order_by_number(&OrderNumber::from(number))
        .await
        .expect("Error fetching order")
        .expect("Order does not exist");
    db.settle_order(order.id, status, points(&accrual)).await.expect("Error settling order");
}

#[when(expr = "the accrual service reports order {word} as PROCESSING")]
async fn order_processing(world: &mut LoyaltyWorld, number: String) {
    let db = &world.system().db;
    let order = db
        .fetch_order_by_number(&OrderNumber::from(number))
        .await
        .expect("Error fetching order")
        .expect("Order does not exist");
    db.update_order_status(order.id, OrderStatusType::Processing).await.expect("Error updating order");
}

#[when(expr = "user {int} withdraws {word} points against order {word}")]
async fn withdraw(world: &mut LoyaltyWorld, user_id: i64, amount: String, number: String) {
    match world.system().ledger.withdraw(user_id, &number, points(&amount)).await {
        Ok(_) => world.last_error = None,
        Err(e) => world.last_error = Some(e.to_string()),
    }
}

#[then(expr = "user {int} has a balance of {word} points")]
async fn check_balance(world: &mut LoyaltyWorld, user_id: i64, expected: String) {
    let balance = world.system().ledger.balance(user_id).await.expect("Error fetching balance");
    assert_eq!(balance.current, points(&expected));
}

#[then(expr = "user {int} has withdrawn {word} points in total")]
async fn check_withdrawn(world: &mut LoyaltyWorld, user_id: i64, expected: String) {
    let balance = world.system().ledger.balance(user_id).await.expect("Error fetching balance");
    assert_eq!(balance.total_withdrawn, points(&expected));
}

#[then(expr = "user {int} has {int} withdrawal(s)")]
async fn check_withdrawal_count(world: &mut LoyaltyWorld, user_id: i64, count: usize) {
    let withdrawals = world.system().ledger.withdrawals(user_id).await.expect("Error fetching withdrawals");
    assert_eq!(withdrawals.map(|w| w.len()).unwrap_or(0), count);
}

#[then(expr = "user {int} has no withdrawals yet")]
async fn check_no_withdrawals(world: &mut LoyaltyWorld, user_id: i64) {
    let withdrawals = world.system().ledger.withdrawals(user_id).await.expect("Error fetching withdrawals");
    assert!(withdrawals.is_none());
}

#[then(expr = "order {word} has status {word}")]
async fn check_status(world: &mut LoyaltyWorld, number: String, status: String) {
    let expected: OrderStatusType = status.parse().expect("Not a valid order status");
    let order = world
        .system()
        .orders
        .order_by_number(&OrderNumber::from(number))
        .await
        .expect("Error fetching order")
        .expect("Order does not exist");
    assert_eq!(order.status, expected);
}

#[then(expr = "order {word} belongs to user {int}")]
async fn check_owner(world: &mut LoyaltyWorld, number: String, user_id: i64) {
    let order = world
        .system()
        .orders
        .order_by_number(&OrderNumber::from(number))
        .await
        .expect("Error fetching order")
        .expect("Order does not exist");
    assert_eq!(order.user_id, user_id);
}

#[then(expr = "user {int} has {int} order(s)")]
async fn check_order_count(world: &mut LoyaltyWorld, user_id: i64, count: usize) {
    let orders = world.system().orders.orders_for_user(user_id).await.expect("Error fetching orders");
    assert_eq!(orders.len(), count);
}

#[then(expr = "the last request failed with {string}")]
async fn check_error(world: &mut LoyaltyWorld, message: String) {
    let err = world.last_error.as_ref().expect("The last request succeeded");
    assert!(err.contains(&message), "Expected an error containing '{message}', got '{err}'");
}

#[then("the last request succeeded")]
async fn check_success(world: &mut LoyaltyWorld) {
    assert!(world.last_error.is_none(), "Unexpected error: {:?}", world.last_error);
}
