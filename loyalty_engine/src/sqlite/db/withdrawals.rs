use chrono::Utc;
use sqlx::SqliteConnection;

use crate::db_types::{NewWithdrawal, Withdrawal};

/// Appends a withdrawal record. This does not touch the balance; call [`super::balances::debit`] in the same
/// transaction.
pub async fn insert_withdrawal(
    withdrawal: NewWithdrawal,
    conn: &mut SqliteConnection,
) -> Result<Withdrawal, sqlx::Error> {
    let withdrawal = sqlx::query_as(
        r#"
            INSERT INTO withdrawals (order_number, user_id, amount, processed_at)
            VALUES ($1, $2, $3, $4)
            RETURNING *;
        "#,
    )
    .bind(withdrawal.order_number)
    .bind(withdrawal.user_id)
    .bind(withdrawal.amount)
    .bind(Utc::now())
    .fetch_one(conn)
    .await?;
    Ok(withdrawal)
}

pub async fn fetch_withdrawals(user_id: i64, conn: &mut SqliteConnection) -> Result<Vec<Withdrawal>, sqlx::Error> {
    let withdrawals =
        sqlx::query_as("SELECT * FROM withdrawals WHERE user_id = $1 ORDER BY processed_at DESC, id DESC")
            .bind(user_id)
            .fetch_all(conn)
            .await?;
    Ok(withdrawals)
}
