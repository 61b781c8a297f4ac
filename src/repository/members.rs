//! Members repository for database operations

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres};

use super::{stale_write, MemberStore};
use crate::{
    error::AppResult,
    models::{
        member::{Member, MemberInput},
        option::SelectOption,
    },
};

#[derive(Clone)]
pub struct MembersRepository {
    pool: Pool<Postgres>,
}

impl MembersRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MemberStore for MembersRepository {
    async fn list(&self) -> AppResult<Vec<Member>> {
        let members = sqlx::query_as::<_, Member>(
            "SELECT id, full_name, email, phone, joined_on, version FROM members ORDER BY full_name, id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(members)
    }

    async fn get(&self, id: i32) -> AppResult<Option<Member>> {
        let member = sqlx::query_as::<_, Member>(
            "SELECT id, full_name, email, phone, joined_on, version FROM members WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(member)
    }

    async fn insert(&self, data: &MemberInput, joined_on: DateTime<Utc>) -> AppResult<Member> {
        let member = sqlx::query_as::<_, Member>(
            r#"
            INSERT INTO members (full_name, email, phone, joined_on)
            VALUES ($1, $2, $3, $4)
            RETURNING id, full_name, email, phone, joined_on, version
            "#,
        )
        .bind(&data.full_name)
        .bind(&data.email)
        .bind(&data.phone)
        .bind(joined_on)
        .fetch_one(&self.pool)
        .await?;
        Ok(member)
    }

    async fn update(&self, id: i32, version: i32, data: &MemberInput) -> AppResult<Member> {
        sqlx::query_as::<_, Member>(
            r#"
            UPDATE members
            SET full_name = $1, email = $2, phone = $3, version = version + 1
            WHERE id = $4 AND version = $5
            RETURNING id, full_name, email, phone, joined_on, version
            "#,
        )
        .bind(&data.full_name)
        .bind(&data.email)
        .bind(&data.phone)
        .bind(id)
        .bind(version)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| stale_write("Member", id))
    }

    async fn delete(&self, id: i32) -> AppResult<bool> {
        let mut tx = self.pool.begin().await?;

        // Holding the row blocks new loans for this member until we commit
        let locked: Option<i32> = sqlx::query_scalar("SELECT id FROM members WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        if locked.is_none() {
            return Ok(false);
        }

        sqlx::query(
            r#"
            UPDATE books b
            SET available_copies = LEAST(b.total_copies, b.available_copies + o.open_loans),
                version = b.version + 1
            FROM (
                SELECT book_id, COUNT(*)::int AS open_loans
                FROM loans
                WHERE member_id = $1 AND returned_on IS NULL
                GROUP BY book_id
            ) o
            WHERE b.id = o.book_id
            "#,
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM members WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(true)
    }

    async fn count(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM members")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn options(&self) -> AppResult<Vec<SelectOption>> {
        let options = sqlx::query_as::<_, SelectOption>(
            "SELECT id, full_name AS label FROM members ORDER BY full_name, id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(options)
    }
}
