//! Loans repository for database operations

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{Pool, Postgres, Transaction};

use super::{stale_write, LoanStore};
use crate::{
    error::AppResult,
    models::{
        book::Book,
        loan::{Loan, LoanDetails, LoanUpdate, NewLoan},
    },
};

const LOAN_COLUMNS: &str = "id, book_id, member_id, borrowed_on, due_on, returned_on, version";

const DETAILS_SELECT: &str = r#"
    SELECT l.id, l.book_id, b.title AS book_title, l.member_id, m.full_name AS member_name,
           l.borrowed_on, l.due_on, l.returned_on, l.version
    FROM loans l
    JOIN books b ON b.id = l.book_id
    JOIN members m ON m.id = l.member_id
"#;

#[derive(Clone)]
pub struct LoansRepository {
    pool: Pool<Postgres>,
}

impl LoansRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Write the ledger's availability count, guarded by the version read
    async fn write_availability(tx: &mut Transaction<'_, Postgres>, book: &Book) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE books
            SET available_copies = $1, version = version + 1
            WHERE id = $2 AND version = $3
            "#,
        )
        .bind(book.available_copies)
        .bind(book.id)
        .bind(book.version)
        .execute(&mut **tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(stale_write("Book", book.id));
        }
        Ok(())
    }
}

#[async_trait]
impl LoanStore for LoansRepository {
    async fn list(&self) -> AppResult<Vec<LoanDetails>> {
        let loans = sqlx::query_as::<_, LoanDetails>(&format!(
            "{} ORDER BY l.borrowed_on DESC, l.id DESC",
            DETAILS_SELECT
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(loans)
    }

    async fn get(&self, id: i32) -> AppResult<Option<Loan>> {
        let loan = sqlx::query_as::<_, Loan>(&format!("SELECT {} FROM loans WHERE id = $1", LOAN_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(loan)
    }

    async fn get_details(&self, id: i32) -> AppResult<Option<LoanDetails>> {
        let loan = sqlx::query_as::<_, LoanDetails>(&format!("{} WHERE l.id = $1", DETAILS_SELECT))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(loan)
    }

    async fn commit_borrow(&self, loan: &NewLoan, book: &Book) -> AppResult<Loan> {
        let mut tx = self.pool.begin().await?;

        Self::write_availability(&mut tx, book).await?;

        let created = sqlx::query_as::<_, Loan>(&format!(
            r#"
            INSERT INTO loans (book_id, member_id, borrowed_on, due_on)
            VALUES ($1, $2, $3, $4)
            RETURNING {}
            "#,
            LOAN_COLUMNS
        ))
        .bind(loan.book_id)
        .bind(loan.member_id)
        .bind(loan.borrowed_on)
        .bind(loan.due_on)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(created)
    }

    async fn commit_return(&self, loan: &Loan, returned_on: DateTime<Utc>, book: &Book) -> AppResult<Loan> {
        let mut tx = self.pool.begin().await?;

        let returned = sqlx::query_as::<_, Loan>(&format!(
            r#"
            UPDATE loans
            SET returned_on = $1, version = version + 1
            WHERE id = $2 AND version = $3 AND returned_on IS NULL
            RETURNING {}
            "#,
            LOAN_COLUMNS
        ))
        .bind(returned_on)
        .bind(loan.id)
        .bind(loan.version)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| stale_write("Loan", loan.id))?;

        Self::write_availability(&mut tx, book).await?;

        tx.commit().await?;
        Ok(returned)
    }

    async fn update(&self, id: i32, data: &LoanUpdate) -> AppResult<Loan> {
        sqlx::query_as::<_, Loan>(&format!(
            r#"
            UPDATE loans
            SET member_id = $1, borrowed_on = $2, due_on = $3, version = version + 1
            WHERE id = $4 AND version = $5
            RETURNING {}
            "#,
            LOAN_COLUMNS
        ))
        .bind(data.member_id)
        .bind(data.borrowed_on)
        .bind(data.due_on)
        .bind(id)
        .bind(data.version)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| stale_write("Loan", id))
    }

    async fn delete(&self, loan: &Loan, book: Option<Book>) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query("DELETE FROM loans WHERE id = $1 AND version = $2")
            .bind(loan.id)
            .bind(loan.version)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(stale_write("Loan", loan.id));
        }

        if let Some(ref book) = book {
            Self::write_availability(&mut tx, book).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn list_overdue(&self, today: NaiveDate) -> AppResult<Vec<LoanDetails>> {
        let loans = sqlx::query_as::<_, LoanDetails>(&format!(
            "{} WHERE l.returned_on IS NULL AND l.due_on < $1 ORDER BY l.due_on, l.id",
            DETAILS_SELECT
        ))
        .bind(today)
        .fetch_all(&self.pool)
        .await?;
        Ok(loans)
    }

    async fn count_open(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM loans WHERE returned_on IS NULL")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
