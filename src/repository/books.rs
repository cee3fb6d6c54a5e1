//! Books repository for database operations

use async_trait::async_trait;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{
        book::{Book, BookAggregate},
        loan::Loan,
        reservation::Reservation,
    },
};

use super::BookRepository;

#[derive(Clone)]
pub struct BooksRepository {
    pool: Pool<Postgres>,
}

impl BooksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BookRepository for BooksRepository {
    async fn find(&self, id: Uuid) -> AppResult<Option<Book>> {
        let book = sqlx::query_as::<_, Book>("SELECT * FROM books WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(book)
    }

    async fn load_aggregate(&self, id: Uuid) -> AppResult<Option<BookAggregate>> {
        let Some(book) = self.find(id).await? else {
            return Ok(None);
        };

        let loans = sqlx::query_as::<_, Loan>(
            "SELECT * FROM loans WHERE book_id = $1 ORDER BY loan_date",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        let reservations = sqlx::query_as::<_, Reservation>(
            "SELECT * FROM reservations WHERE book_id = $1 ORDER BY reserved_at",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(BookAggregate {
            book,
            loans,
            reservations,
        }))
    }
}
