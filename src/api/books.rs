//! Catalog endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::{
    error::AppResult,
    models::{
        book::{Book, BookData, SearchQuery},
        report::BookResults,
    },
    AppState,
};

/// Book listing filter
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct BookListQuery {
    /// Only books with at least one copy on the shelf
    pub available: Option<bool>,
}

/// List books, newest first
#[utoipa::path(
    get,
    path = "/books",
    tag = "books",
    params(BookListQuery),
    responses(
        (status = 200, description = "List of books", body = Vec<Book>)
    )
)]
pub async fn list_books(
    State(state): State<AppState>,
    Query(query): Query<BookListQuery>,
) -> AppResult<Json<Vec<Book>>> {
    let books = if query.available.unwrap_or(false) {
        state.services.catalog.list_available().await?
    } else {
        state.services.catalog.list_books().await?
    };
    Ok(Json(books))
}

/// Search books by title, author, year or id
#[utoipa::path(
    get,
    path = "/books/search",
    tag = "books",
    params(SearchQuery),
    responses(
        (status = 200, description = "Matching books", body = BookResults)
    )
)]
pub async fn search_books(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> AppResult<Json<BookResults>> {
    let results = state
        .services
        .reports
        .search_books(query.q.as_deref().unwrap_or_default())
        .await?;
    Ok(Json(results))
}

/// Get book by ID
#[utoipa::path(
    get,
    path = "/books/{id}",
    tag = "books",
    params(
        ("id" = i32, Path, description = "Book ID")
    ),
    responses(
        (status = 200, description = "Book details", body = Book),
        (status = 404, description = "Book not found")
    )
)]
pub async fn get_book(State(state): State<AppState>, Path(id): Path<i32>) -> AppResult<Json<Book>> {
    let book = state.services.catalog.get_book(id).await?;
    Ok(Json(book))
}

/// Add a book to the catalog
#[utoipa::path(
    post,
    path = "/books",
    tag = "books",
    request_body = BookData,
    responses(
        (status = 201, description = "Book created", body = Book),
        (status = 400, description = "Invalid metadata"),
        (status = 409, description = "Same title and author already catalogued")
    )
)]
pub async fn create_book(
    State(state): State<AppState>,
    Json(book): Json<BookData>,
) -> AppResult<(StatusCode, Json<Book>)> {
    let created = state.services.catalog.add_book(book).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Update book metadata and stock
#[utoipa::path(
    put,
    path = "/books/{id}",
    tag = "books",
    params(
        ("id" = i32, Path, description = "Book ID")
    ),
    request_body = BookData,
    responses(
        (status = 200, description = "Book updated", body = Book),
        (status = 400, description = "Invalid metadata"),
        (status = 404, description = "Book not found")
    )
)]
pub async fn update_book(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(book): Json<BookData>,
) -> AppResult<Json<Book>> {
    let updated = state.services.catalog.update_book(id, book).await?;
    Ok(Json(updated))
}

/// Delete a book
#[utoipa::path(
    delete,
    path = "/books/{id}",
    tag = "books",
    params(
        ("id" = i32, Path, description = "Book ID")
    ),
    responses(
        (status = 204, description = "Book deleted"),
        (status = 404, description = "Book not found"),
        (status = 422, description = "Book is on loan or still has copies")
    )
)]
pub async fn delete_book(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    state.services.catalog.delete_book(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
