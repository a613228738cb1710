//! Catalog management service

use std::sync::Arc;

use chrono::Datelike;
use validator::Validate;

use crate::{
    clock::Clock,
    error::{AppError, AppResult},
    models::{Book, BookData},
    repository::Repository,
};

use super::LedgerLock;

const EARLIEST_PUBLICATION_YEAR: i32 = 1000;

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
    clock: Arc<dyn Clock>,
    lock: LedgerLock,
}

impl CatalogService {
    pub fn new(repository: Repository, clock: Arc<dyn Clock>, lock: LedgerLock) -> Self {
        Self {
            repository,
            clock,
            lock,
        }
    }

    /// All books, newest first
    pub async fn list_books(&self) -> AppResult<Vec<Book>> {
        let _read = self.lock.read().await;
        self.repository.list_books().await
    }

    /// Books with at least one copy on the shelf
    pub async fn list_available(&self) -> AppResult<Vec<Book>> {
        let _read = self.lock.read().await;
        let books = self.repository.list_books().await?;
        Ok(books.into_iter().filter(Book::is_available).collect())
    }

    pub async fn get_book(&self, id: i32) -> AppResult<Book> {
        let _read = self.lock.read().await;
        self.repository
            .get_book(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    /// Add a title to the catalog
    pub async fn add_book(&self, book: BookData) -> AppResult<Book> {
        let book = self.validate(book)?;

        let _write = self.lock.write().await;
        if self
            .repository
            .find_book_by_title_author(&book.title, &book.author)
            .await?
            .is_some()
        {
            return Err(AppError::DuplicateBook {
                title: book.title,
                author: book.author,
            });
        }

        let created = self.repository.insert_book(&book).await?;
        tracing::info!(book_id = created.id, title = %created.title, "Book added");
        Ok(created)
    }

    /// Edit metadata and stock of an existing title
    pub async fn update_book(&self, id: i32, book: BookData) -> AppResult<Book> {
        let book = self.validate(book)?;

        let _write = self.lock.write().await;
        if let Some(existing) = self
            .repository
            .find_book_by_title_author(&book.title, &book.author)
            .await?
        {
            if existing.id != id {
                return Err(AppError::DuplicateBook {
                    title: book.title,
                    author: book.author,
                });
            }
        }

        let updated = self
            .repository
            .update_book(id, &book)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))?;
        tracing::info!(book_id = id, "Book updated");
        Ok(updated)
    }

    /// Delete a title. Only titles with no copies in circulation and none left
    /// in the catalog may be removed.
    pub async fn delete_book(&self, id: i32) -> AppResult<()> {
        let _write = self.lock.write().await;

        let book = self
            .repository
            .get_book(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))?;

        if self.repository.count_open_loans_for_book(id).await? > 0 {
            tracing::debug!(book_id = id, "Refusing to delete a book that is on loan");
            return Err(AppError::BookInUse(id));
        }
        if book.available_quantity > 0 {
            tracing::debug!(book_id = id, "Refusing to delete a book with copies");
            return Err(AppError::BookHasCopies(id));
        }

        self.repository.delete_book(id).await?;
        tracing::info!(book_id = id, "Book deleted");
        Ok(())
    }

    fn validate(&self, book: BookData) -> AppResult<BookData> {
        let book = book.normalized();
        book.validate()?;

        let latest_year = self.clock.today().year() + 1;
        if book.year < EARLIEST_PUBLICATION_YEAR || book.year > latest_year {
            return Err(AppError::Validation(
                "Please enter a valid publication year".to_string(),
            ));
        }
        Ok(book)
    }
}
