use log::trace;
use lp_common::Points;
use sqlx::SqliteConnection;

use crate::db_types::Balance;

/// Fetches the balance for `user_id`. Users that were never credited get a zero balance; no row is created for them.
pub async fn fetch_balance(user_id: i64, conn: &mut SqliteConnection) -> Result<Balance, sqlx::Error> {
    let balance: Option<Balance> =
        sqlx::query_as("SELECT user_id, current, total_withdrawn FROM balances WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(conn)
            .await?;
    Ok(balance.unwrap_or_else(|| Balance::zero(user_id)))
}

/// Adds `amount` to the user's current balance, creating the row on the first credit.
///
/// A single upsert, so the read-modify-write happens inside SQLite and cannot lose a concurrent update.
pub async fn credit(user_id: i64, amount: Points, conn: &mut SqliteConnection) -> Result<Balance, sqlx::Error> {
    let balance: Balance = sqlx::query_as(
        r#"
            INSERT INTO balances (user_id, current) VALUES ($1, $2)
            ON CONFLICT (user_id) DO UPDATE SET
                current = current + excluded.current,
                updated_at = CURRENT_TIMESTAMP
            RETURNING user_id, current, total_withdrawn;
        "#,
    )
    .bind(user_id)
    .bind(amount)
    .fetch_one(conn)
    .await?;
    trace!("🗃️ Credited {amount} to user {user_id}. Balance is now {}", balance.current);
    Ok(balance)
}

/// Moves `amount` from the current balance to the withdrawn total, provided the current balance covers it.
///
/// The check and the decrement are one conditional `UPDATE`. Returns `None`, without writing anything, if the user has
/// no balance or the balance is too low.
pub async fn debit(user_id: i64, amount: Points, conn: &mut SqliteConnection) -> Result<Option<Balance>, sqlx::Error> {
    let balance = sqlx::query_as(
        r#"
            UPDATE balances SET
                current = current - $1,
                total_withdrawn = total_withdrawn + $1,
                updated_at = CURRENT_TIMESTAMP
            WHERE user_id = $2 AND current >= $1
            RETURNING user_id, current, total_withdrawn;
        "#,
    )
    .bind(amount)
    .bind(user_id)
    .fetch_optional(conn)
    .await?;
    Ok(balance)
}
