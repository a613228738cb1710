//! Books table access

use async_trait::async_trait;

use crate::{
    error::AppResult,
    models::{Book, BookData},
};

use super::{BookStore, PgStore};

const BOOK_COLUMNS: &str = "id, title, author, year, quantity";

#[async_trait]
impl BookStore for PgStore {
    async fn list_books(&self) -> AppResult<Vec<Book>> {
        let books = sqlx::query_as::<_, Book>(&format!(
            "SELECT {} FROM books ORDER BY id DESC",
            BOOK_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(books)
    }

    async fn get_book(&self, id: i32) -> AppResult<Option<Book>> {
        let book = sqlx::query_as::<_, Book>(&format!(
            "SELECT {} FROM books WHERE id = $1",
            BOOK_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(book)
    }

    async fn find_book_by_title_author(&self, title: &str, author: &str) -> AppResult<Option<Book>> {
        let book = sqlx::query_as::<_, Book>(&format!(
            "SELECT {} FROM books WHERE LOWER(title) = LOWER($1) AND LOWER(author) = LOWER($2) LIMIT 1",
            BOOK_COLUMNS
        ))
        .bind(title)
        .bind(author)
        .fetch_optional(&self.pool)
        .await?;

        Ok(book)
    }

    async fn insert_book(&self, book: &BookData) -> AppResult<Book> {
        let created = sqlx::query_as::<_, Book>(&format!(
            r#"
            INSERT INTO books (title, author, year, quantity)
            VALUES ($1, $2, $3, $4)
            RETURNING {}
            "#,
            BOOK_COLUMNS
        ))
        .bind(&book.title)
        .bind(&book.author)
        .bind(book.year)
        .bind(book.available_quantity)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    async fn update_book(&self, id: i32, book: &BookData) -> AppResult<Option<Book>> {
        let updated = sqlx::query_as::<_, Book>(&format!(
            r#"
            UPDATE books SET title = $2, author = $3, year = $4, quantity = $5
            WHERE id = $1
            RETURNING {}
            "#,
            BOOK_COLUMNS
        ))
        .bind(id)
        .bind(&book.title)
        .bind(&book.author)
        .bind(book.year)
        .bind(book.available_quantity)
        .fetch_optional(&self.pool)
        .await?;

        Ok(updated)
    }

    async fn delete_book(&self, id: i32) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
