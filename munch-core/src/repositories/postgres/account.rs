// File: munch-core/src/repositories/postgres/account.rs

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;
use munch_common::error::Error;
use munch_common::models::{Account, LedgerEntry};
use munch_common::traits::repository_traits::AccountRepository;

const UNIQUE_VIOLATION: &str = "23505";

#[derive(Clone)]
pub struct PostgresAccountRepository {
    pool: Pool<Postgres>,
}

impl PostgresAccountRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    async fn current_points(&self, user_id: Uuid) -> Result<i64, Error> {
        let points: Option<i64> = sqlx::query_scalar("SELECT points FROM user_points WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(points.unwrap_or(0))
    }

    /// A concurrent attempt with the same reference won the insert race;
    /// hand back its entry instead of failing.
    async fn recover_replay(
        &self,
        user_id: Uuid,
        reference: &str,
        err: sqlx::Error,
    ) -> Result<LedgerEntry, Error> {
        let is_dup = err
            .as_database_error()
            .and_then(|db| db.code())
            .map(|code| code == UNIQUE_VIOLATION)
            .unwrap_or(false);
        if !is_dup {
            return Err(Error::Database(err));
        }
        self.find_entry(user_id, reference)
            .await?
            .ok_or(Error::Database(err))
    }
}

fn entry_from_row(r: &PgRow) -> Result<LedgerEntry, Error> {
    Ok(LedgerEntry {
        entry_id: r.try_get("entry_id")?,
        user_id: r.try_get("user_id")?,
        amount: r.try_get("amount")?,
        reference: r.try_get("reference")?,
        balance_after: r.try_get("balance_after")?,
        created_at: r.try_get("created_at")?,
    })
}

async fn insert_entry(
    tx: &mut sqlx::Transaction<'_, Postgres>,
    entry: &LedgerEntry,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO point_entries (entry_id, user_id, amount, reference, balance_after, created_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
        .bind(entry.entry_id)
        .bind(entry.user_id)
        .bind(entry.amount)
        .bind(&entry.reference)
        .bind(entry.balance_after)
        .bind(entry.created_at)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

#[async_trait]
impl AccountRepository for PostgresAccountRepository {
    async fn get_account(&self, user_id: Uuid) -> Result<Option<Account>, Error> {
        let row_opt = sqlx::query(
            r#"
            SELECT user_id, points, updated_at
            FROM user_points
            WHERE user_id = $1
            "#,
        )
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        if let Some(r) = row_opt {
            Ok(Some(Account {
                user_id: r.try_get("user_id")?,
                points: r.try_get("points")?,
                updated_at: r.try_get("updated_at")?,
            }))
        } else {
            Ok(None)
        }
    }

    async fn apply_credit(&self, user_id: Uuid, amount: i64, reference: &str) -> Result<LedgerEntry, Error> {
        if let Some(existing) = self.find_entry(user_id, reference).await? {
            return Ok(existing);
        }

        let mut tx = self.pool.begin().await?;

        // Single-statement increment; the row lock serializes writers per user.
        let balance: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO user_points (user_id, points, updated_at)
            VALUES ($1, $2, now())
            ON CONFLICT (user_id)
            DO UPDATE SET points = user_points.points + EXCLUDED.points,
                          updated_at = now()
            RETURNING points
            "#,
        )
            .bind(user_id)
            .bind(amount)
            .fetch_one(&mut *tx)
            .await?;

        let entry = LedgerEntry::new(user_id, amount, reference, balance);
        if let Err(e) = insert_entry(&mut tx, &entry).await {
            tx.rollback().await?;
            return self.recover_replay(user_id, reference, e).await;
        }
        tx.commit().await?;
        Ok(entry)
    }

    async fn apply_debit(&self, user_id: Uuid, amount: i64, reference: &str) -> Result<LedgerEntry, Error> {
        if let Some(existing) = self.find_entry(user_id, reference).await? {
            return Ok(existing);
        }

        let mut tx = self.pool.begin().await?;

        // Check and decrement in one guarded statement.
        let balance: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE user_points
            SET points = points - $2,
                updated_at = now()
            WHERE user_id = $1
              AND points >= $2
            RETURNING points
            "#,
        )
            .bind(user_id)
            .bind(amount)
            .fetch_optional(&mut *tx)
            .await?;

        let Some(balance) = balance else {
            tx.rollback().await?;
            // A concurrent call with this reference may have spent the points.
            if let Some(existing) = self.find_entry(user_id, reference).await? {
                return Ok(existing);
            }
            let available = self.current_points(user_id).await?;
            return Err(Error::InsufficientPoints { required: amount, available });
        };

        let entry = LedgerEntry::new(user_id, -amount, reference, balance);
        if let Err(e) = insert_entry(&mut tx, &entry).await {
            tx.rollback().await?;
            return self.recover_replay(user_id, reference, e).await;
        }
        tx.commit().await?;
        Ok(entry)
    }

    async fn find_entry(&self, user_id: Uuid, reference: &str) -> Result<Option<LedgerEntry>, Error> {
        let row_opt = sqlx::query(
            r#"
            SELECT entry_id, user_id, amount, reference, balance_after, created_at
            FROM point_entries
            WHERE user_id = $1 AND reference = $2
            "#,
        )
            .bind(user_id)
            .bind(reference)
            .fetch_optional(&self.pool)
            .await?;

        row_opt.as_ref().map(entry_from_row).transpose()
    }

    async fn list_entries(&self, user_id: Uuid, limit: i64) -> Result<Vec<LedgerEntry>, Error> {
        let rows = sqlx::query(
            r#"
            SELECT entry_id, user_id, amount, reference, balance_after, created_at
            FROM point_entries
            WHERE user_id = $1
            ORDER BY created_at DESC, entry_id DESC
            LIMIT $2
            "#,
        )
            .bind(user_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        let mut result = Vec::new();
        for row in rows {
            result.push(entry_from_row(&row)?);
        }
        Ok(result)
    }
}
