use chrono::Utc;
use log::{debug, trace};
use lp_common::Points;
use sqlx::SqliteConnection;

use crate::{
    db_types::{NewOrder, Order, OrderNumber, OrderStatusType},
    traits::{InsertOrderResult, OrderStoreError},
};

/// Inserts the order unless its number is already taken, and reports who owns the number.
///
/// The unique index on `number` makes the decision, so this is safe against concurrent uploads of the same number
/// without wrapping it in a transaction.
pub async fn idempotent_insert(
    order: NewOrder,
    conn: &mut SqliteConnection,
) -> Result<InsertOrderResult, OrderStoreError> {
    let caller = order.user_id;
    if let Some(order) = insert_order(&order, conn).await? {
        debug!("🗃️ Order [{}] inserted with id {}", order.number, order.id);
        return Ok(InsertOrderResult::Inserted(order));
    }
    let existing = fetch_order_by_number(&order.number, conn).await?.ok_or_else(|| {
        OrderStoreError::DatabaseError(format!("Order {} conflicted on insert but could not be found", order.number))
    })?;
    if existing.user_id == caller {
        trace!("🗃️ Order {} was already uploaded by user {caller}", existing.number);
        Ok(InsertOrderResult::AlreadyOwnedByCaller(existing))
    } else {
        debug!("🗃️ User {caller} tried to upload order {}, which belongs to another user", existing.number);
        Ok(InsertOrderResult::OwnedByOtherUser)
    }
}

/// Inserts a new order with status `NEW`. Returns `None` if the order number already exists.
async fn insert_order(order: &NewOrder, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as(
        r#"
            INSERT INTO orders (number, user_id, status, accrual, uploaded_at, updated_at)
            VALUES ($1, $2, 'NEW', 0, $3, $3)
            ON CONFLICT (number) DO NOTHING
            RETURNING *;
        "#,
    )
    .bind(order.number.as_str())
    .bind(order.user_id)
    .bind(order.uploaded_at)
    .fetch_optional(conn)
    .await?;
    Ok(order)
}

pub async fn fetch_order_by_number(
    number: &OrderNumber,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order =
        sqlx::query_as("SELECT * FROM orders WHERE number = $1").bind(number.as_str()).fetch_optional(conn).await?;
    Ok(order)
}

pub async fn fetch_order_by_id(id: i64, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(order)
}

pub async fn fetch_orders_for_user(user_id: i64, conn: &mut SqliteConnection) -> Result<Vec<Order>, sqlx::Error> {
    let orders = sqlx::query_as("SELECT * FROM orders WHERE user_id = $1 ORDER BY uploaded_at DESC, id DESC")
        .bind(user_id)
        .fetch_all(conn)
        .await?;
    Ok(orders)
}

/// Fetches the orders that still await a verdict from the accrual service, oldest upload first.
pub async fn fetch_unsettled_orders(conn: &mut SqliteConnection) -> Result<Vec<Order>, sqlx::Error> {
    let orders = sqlx::query_as(
        "SELECT * FROM orders WHERE status IN ('NEW', 'PROCESSING') ORDER BY uploaded_at ASC, id ASC",
    )
    .fetch_all(conn)
    .await?;
    Ok(orders)
}

/// Writes `status` and `accrual` to the order, but only if the order is not settled yet.
///
/// Returns `None` if the guard matched no row, i.e. the order is already `PROCESSED` or `INVALID`, or it does not
/// exist. Callers that care about the difference should look the order up afterwards.
pub async fn update_unsettled_order(
    id: i64,
    status: OrderStatusType,
    accrual: Points,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as(
        r#"
            UPDATE orders SET status = $1, accrual = $2, updated_at = $3
            WHERE id = $4 AND status IN ('NEW', 'PROCESSING')
            RETURNING *;
        "#,
    )
    .bind(status)
    .bind(accrual)
    .bind(Utc::now())
    .bind(id)
    .fetch_optional(conn)
    .await?;
    Ok(order)
}

/// Moves an unsettled order to `status` without touching its accrual. Returns `None` if the order is already settled.
pub async fn update_unsettled_status(
    id: i64,
    status: OrderStatusType,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as(
        r#"
            UPDATE orders SET status = $1, updated_at = $2
            WHERE id = $3 AND status IN ('NEW', 'PROCESSING')
            RETURNING *;
        "#,
    )
    .bind(status)
    .bind(Utc::now())
    .bind(id)
    .fetch_optional(conn)
    .await?;
    Ok(order)
}
