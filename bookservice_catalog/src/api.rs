use std::fmt;

use paperclip::actix::Apiv2Schema;
use serde::{Deserialize, Serialize};

pub use crate::record_id::{RecordId, RecordIdParseError};

pub type BookId = RecordId;
pub type ReviewId = RecordId;

pub const API_PREFIX: &str = "/api/v1.0";
pub const DEFAULT_PAGE_NUMBER: u64 = 1;
pub const DEFAULT_PAGE_SIZE: u64 = 15;

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq, Apiv2Schema)]
/// Fields of the book that are provided by the client, all of them are required on create and edit
pub struct BookDetails {
    pub author: String,
    pub title: String,
    pub country: String,
    pub language: String,
    pub cover_image: String,
    pub pages: String,
    pub year: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq, Apiv2Schema)]
/// Book record together with the reviews embedded in it
pub struct Book {
    #[serde(rename = "_id")]
    pub id: BookId,
    pub author: String,
    pub title: String,
    pub country: String,
    pub language: String,
    pub cover_image: String,
    pub pages: String,
    pub year: String,
    pub reader_reviews: Vec<Review>,
}

impl Book {
    /// New book has no reviews
    pub fn new(id: BookId, details: BookDetails) -> Self {
        Self {
            id,
            author: details.author,
            title: details.title,
            country: details.country,
            language: details.language,
            cover_image: details.cover_image,
            pages: details.pages,
            year: details.year,
            reader_reviews: vec![],
        }
    }

    pub fn details(&self) -> BookDetails {
        BookDetails {
            author: self.author.clone(),
            title: self.title.clone(),
            country: self.country.clone(),
            language: self.language.clone(),
            cover_image: self.cover_image.clone(),
            pages: self.pages.clone(),
            year: self.year.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq, Apiv2Schema)]
/// Fields of the review that are provided by the client
pub struct ReviewDetails {
    pub name: String,
    pub comments: String,
    pub book_rating: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq, Apiv2Schema)]
pub struct Review {
    #[serde(rename = "_id")]
    pub id: ReviewId,
    pub name: String,
    pub comments: String,
    pub book_rating: String,
}

impl Review {
    pub fn new(id: ReviewId, details: ReviewDetails) -> Self {
        Self {
            id,
            name: details.name,
            comments: details.comments,
            book_rating: details.book_rating,
        }
    }

    pub fn details(&self) -> ReviewDetails {
        ReviewDetails {
            name: self.name.clone(),
            comments: self.comments.clone(),
            book_rating: self.book_rating.clone(),
        }
    }
}

/// Fields that can be fetched on their own through `/books/{book_id}/<field>`
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum BookField {
    Title,
    Author,
    Year,
}

impl BookField {
    pub fn key(&self) -> &'static str {
        match self {
            BookField::Title => "title",
            BookField::Author => "author",
            BookField::Year => "year",
        }
    }

    pub fn value_of<'a>(&self, book: &'a Book) -> &'a str {
        match self {
            BookField::Title => &book.title,
            BookField::Author => &book.author,
            BookField::Year => &book.year,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Apiv2Schema)]
/// Page selection for listing books, `pn` is 1-based
pub struct Pagination {
    pub pn: Option<u64>,
    pub ps: Option<u64>,
}

impl Pagination {
    /// Returns (offset, limit) of the requested page
    pub fn window(&self) -> (u64, u64) {
        let page_number = self.pn.unwrap_or(DEFAULT_PAGE_NUMBER).max(1);
        let page_size = self.ps.unwrap_or(DEFAULT_PAGE_SIZE);
        (page_size.saturating_mul(page_number - 1), page_size)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq, Apiv2Schema)]
/// Absolute url of the created or modified resource
pub struct UrlResponse {
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq, Apiv2Schema)]
pub struct ErrorResponse {
    pub error: String,
}

/// Builds absolute urls of resources exposed by the service
#[derive(Debug, Clone)]
pub struct ResourceUrls {
    public_url: String,
}

impl ResourceUrls {
    pub fn new(public_url: &str) -> Self {
        Self {
            public_url: public_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn book(&self, book_id: impl fmt::Display) -> String {
        format!("{}{}/books/{}", self.public_url, API_PREFIX, book_id)
    }

    /// Book segment is taken as given, reviews are addressed by their own id
    pub fn review(&self, book_id: impl fmt::Display, review_id: &ReviewId) -> String {
        format!("{}/reader_reviews/{}", self.book(book_id), review_id)
    }
}

#[cfg(test)]
mod api_tests {
    use crate::api::{Pagination, RecordId, ResourceUrls};

    #[test]
    fn pagination_defaults_to_first_page_of_fifteen() {
        assert_eq!(Pagination::default().window(), (0, 15));
    }

    #[test]
    fn pagination_offset_is_page_size_times_previous_pages() {
        let pagination = Pagination {
            pn: Some(3),
            ps: Some(4),
        };
        assert_eq!(pagination.window(), (8, 4));

        let zero_page = Pagination {
            pn: Some(0),
            ps: Some(4),
        };
        assert_eq!(zero_page.window(), (0, 4));

        let empty_pages = Pagination {
            pn: Some(7),
            ps: Some(0),
        };
        assert_eq!(empty_pages.window(), (0, 0));
    }

    #[test]
    fn resource_urls_are_absolute() {
        let urls = ResourceUrls::new("http://localhost:5000/");
        let book_id: RecordId = "64b7f1c2e4b0a1b2c3d4e5f6".parse().unwrap();
        let review_id: RecordId = "64b7f1c2e4b0a1b2c3d4e5f7".parse().unwrap();

        assert_eq!(
            urls.book(&book_id),
            "http://localhost:5000/api/v1.0/books/64b7f1c2e4b0a1b2c3d4e5f6"
        );
        assert_eq!(
            urls.review(&book_id, &review_id),
            "http://localhost:5000/api/v1.0/books/64b7f1c2e4b0a1b2c3d4e5f6/reader_reviews/64b7f1c2e4b0a1b2c3d4e5f7"
        );
    }
}
