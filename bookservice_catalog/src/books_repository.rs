pub use in_memory_books_repository::InMemoryBookRepository;
pub use postgres_books_repository::{PostgresBooksRepository, PostgresBooksRepositoryConfig};

use crate::api::{Book, BookDetails, BookField, BookId, Review, ReviewDetails, ReviewId};

mod in_memory_books_repository;
mod postgres_books_repository;

#[derive(thiserror::Error, Debug)]
pub enum BookRepositoryError {
    #[error("Book {0} not found")]
    BookNotFound(BookId),

    #[error("Review {0} not found")]
    ReviewNotFound(ReviewId),

    #[error("Failed to deserialize book: {0}")]
    DeserializationError(#[from] serde_json::Error),

    #[error("DatabaseFailure failure {0}")]
    DatabaseFailure(#[from] tokio_postgres::Error),

    #[error("Other error {0}")]
    Other(String),
}

/// Store of book records with their embedded reviews.
///
/// Every method is a single atomic operation on one book record,
/// implementations must not let concurrent review mutations on the same book interleave.
#[async_trait::async_trait]
pub trait BookRepository: Send + Sync {
    /// Lists up to `limit` books starting at `offset`, in insertion order
    async fn list_books(&self, offset: u64, limit: u64) -> Result<Vec<Book>, BookRepositoryError>;
    /// Adds book without reviews to repository, returns an id assigned to the book
    async fn add_book(&self, details: BookDetails) -> Result<BookId, BookRepositoryError>;
    /// Retrieves the book together with its reviews
    async fn get_book(&self, book_id: &BookId) -> Result<Book, BookRepositoryError>;
    /// Retrieves a single field of the book
    async fn get_book_field(
        &self,
        book_id: &BookId,
        field: BookField,
    ) -> Result<String, BookRepositoryError>;
    /// Replaces all details of the book, reviews are kept.
    /// Returns true if book was updated and false if it was not found
    async fn update_book(
        &self,
        book_id: &BookId,
        details: BookDetails,
    ) -> Result<bool, BookRepositoryError>;
    /// Removes the book with all its reviews, returns false if there was nothing to remove
    async fn delete_book(&self, book_id: &BookId) -> Result<bool, BookRepositoryError>;
    /// Retrieves reviews of the book in the order they were added
    async fn list_reviews(&self, book_id: &BookId) -> Result<Vec<Review>, BookRepositoryError>;
    /// Appends review to the book, returns an id assigned to the review
    async fn add_review(
        &self,
        book_id: &BookId,
        details: ReviewDetails,
    ) -> Result<ReviewId, BookRepositoryError>;
    /// Retrieves review by its id, regardless of the book it belongs to
    async fn get_review(&self, review_id: &ReviewId) -> Result<Review, BookRepositoryError>;
    /// Replaces details of the review with given id, regardless of the book it belongs to.
    /// Returns true if review was updated and false if it was not found
    async fn update_review(
        &self,
        review_id: &ReviewId,
        details: ReviewDetails,
    ) -> Result<bool, BookRepositoryError>;
    /// Removes the review from the book, returns false if there was nothing to remove
    async fn remove_review(
        &self,
        book_id: &BookId,
        review_id: &ReviewId,
    ) -> Result<bool, BookRepositoryError>;
}
