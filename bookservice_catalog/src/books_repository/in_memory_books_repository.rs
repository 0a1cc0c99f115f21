use crate::api::{Book, BookDetails, BookField, BookId, Review, ReviewDetails, ReviewId};
use crate::books_repository::{BookRepository, BookRepositoryError};

/// Keeps books in insertion order, every operation runs under a single lock guard
#[derive(Default)]
pub struct InMemoryBookRepository {
    books: parking_lot::RwLock<Vec<Book>>,
}

#[async_trait::async_trait]
impl BookRepository for InMemoryBookRepository {
    async fn list_books(&self, offset: u64, limit: u64) -> Result<Vec<Book>, BookRepositoryError> {
        let offset = usize::try_from(offset).unwrap_or(usize::MAX);
        let limit = usize::try_from(limit).unwrap_or(usize::MAX);
        Ok(self
            .books
            .read()
            .iter()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn add_book(&self, details: BookDetails) -> Result<BookId, BookRepositoryError> {
        let id = BookId::generate();
        self.books.write().push(Book::new(id.clone(), details));
        Ok(id)
    }

    async fn get_book(&self, book_id: &BookId) -> Result<Book, BookRepositoryError> {
        self.books
            .read()
            .iter()
            .find(|book| &book.id == book_id)
            .cloned()
            .ok_or_else(|| BookRepositoryError::BookNotFound(book_id.clone()))
    }

    async fn get_book_field(
        &self,
        book_id: &BookId,
        field: BookField,
    ) -> Result<String, BookRepositoryError> {
        self.books
            .read()
            .iter()
            .find(|book| &book.id == book_id)
            .map(|book| field.value_of(book).to_string())
            .ok_or_else(|| BookRepositoryError::BookNotFound(book_id.clone()))
    }

    async fn update_book(
        &self,
        book_id: &BookId,
        details: BookDetails,
    ) -> Result<bool, BookRepositoryError> {
        let mut locked_books = self.books.write();
        if let Some(book) = locked_books.iter_mut().find(|book| &book.id == book_id) {
            let reader_reviews = std::mem::take(&mut book.reader_reviews);
            *book = Book {
                reader_reviews,
                ..Book::new(book_id.clone(), details)
            };
            Ok(true)
        } else {
            Ok(false)
        }
    }

    async fn delete_book(&self, book_id: &BookId) -> Result<bool, BookRepositoryError> {
        let mut locked_books = self.books.write();
        let books_before = locked_books.len();
        locked_books.retain(|book| &book.id != book_id);
        Ok(locked_books.len() != books_before)
    }

    async fn list_reviews(&self, book_id: &BookId) -> Result<Vec<Review>, BookRepositoryError> {
        self.books
            .read()
            .iter()
            .find(|book| &book.id == book_id)
            .map(|book| book.reader_reviews.clone())
            .ok_or_else(|| BookRepositoryError::BookNotFound(book_id.clone()))
    }

    async fn add_review(
        &self,
        book_id: &BookId,
        details: ReviewDetails,
    ) -> Result<ReviewId, BookRepositoryError> {
        let mut locked_books = self.books.write();
        let book = locked_books
            .iter_mut()
            .find(|book| &book.id == book_id)
            .ok_or_else(|| BookRepositoryError::BookNotFound(book_id.clone()))?;

        let review_id = ReviewId::generate();
        book.reader_reviews
            .push(Review::new(review_id.clone(), details));
        Ok(review_id)
    }

    async fn get_review(&self, review_id: &ReviewId) -> Result<Review, BookRepositoryError> {
        self.books
            .read()
            .iter()
            .flat_map(|book| book.reader_reviews.iter())
            .find(|review| &review.id == review_id)
            .cloned()
            .ok_or_else(|| BookRepositoryError::ReviewNotFound(review_id.clone()))
    }

    async fn update_review(
        &self,
        review_id: &ReviewId,
        details: ReviewDetails,
    ) -> Result<bool, BookRepositoryError> {
        let mut locked_books = self.books.write();
        let review = locked_books
            .iter_mut()
            .flat_map(|book| book.reader_reviews.iter_mut())
            .find(|review| &review.id == review_id);

        if let Some(review) = review {
            *review = Review::new(review_id.clone(), details);
            Ok(true)
        } else {
            Ok(false)
        }
    }

    async fn remove_review(
        &self,
        book_id: &BookId,
        review_id: &ReviewId,
    ) -> Result<bool, BookRepositoryError> {
        let mut locked_books = self.books.write();
        let Some(book) = locked_books.iter_mut().find(|book| &book.id == book_id) else {
            return Ok(false);
        };

        let reviews_before = book.reader_reviews.len();
        book.reader_reviews.retain(|review| &review.id != review_id);
        Ok(book.reader_reviews.len() != reviews_before)
    }
}
