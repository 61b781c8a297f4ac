//! Authors repository for database operations

use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use super::{stale_write, AuthorStore};
use crate::{
    error::AppResult,
    models::author::{Author, AuthorInput},
};

#[derive(Clone)]
pub struct AuthorsRepository {
    pool: Pool<Postgres>,
}

impl AuthorsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuthorStore for AuthorsRepository {
    async fn list(&self) -> AppResult<Vec<Author>> {
        let authors = sqlx::query_as::<_, Author>(
            "SELECT id, first_name, last_name, version FROM authors ORDER BY last_name, first_name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(authors)
    }

    async fn get(&self, id: i32) -> AppResult<Option<Author>> {
        let author = sqlx::query_as::<_, Author>(
            "SELECT id, first_name, last_name, version FROM authors WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(author)
    }

    async fn insert(&self, data: &AuthorInput) -> AppResult<Author> {
        let author = sqlx::query_as::<_, Author>(
            r#"
            INSERT INTO authors (first_name, last_name)
            VALUES ($1, $2)
            RETURNING id, first_name, last_name, version
            "#,
        )
        .bind(&data.first_name)
        .bind(&data.last_name)
        .fetch_one(&self.pool)
        .await?;
        Ok(author)
    }

    async fn update(&self, id: i32, version: i32, data: &AuthorInput) -> AppResult<Author> {
        sqlx::query_as::<_, Author>(
            r#"
            UPDATE authors
            SET first_name = $1, last_name = $2, version = version + 1
            WHERE id = $3 AND version = $4
            RETURNING id, first_name, last_name, version
            "#,
        )
        .bind(&data.first_name)
        .bind(&data.last_name)
        .bind(id)
        .bind(version)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| stale_write("Author", id))
    }

    async fn delete(&self, id: i32) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM authors WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
