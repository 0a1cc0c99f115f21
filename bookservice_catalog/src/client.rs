use anyhow::{bail, Context};
use reqwest::StatusCode;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_tracing::TracingMiddleware;
use serde::de::DeserializeOwned;

use crate::api::{
    Book, BookDetails, BookField, BookId, ErrorResponse, RecordId, Review, ReviewDetails,
    ReviewId, UrlResponse, API_PREFIX,
};

pub struct BookServiceCatalogClient {
    url: String,
    client: ClientWithMiddleware,
}

/// Takes the id from the end of the resource url returned by the service
fn id_from_url(url: &str) -> anyhow::Result<RecordId> {
    url.rsplit('/')
        .next()
        .context("Empty resource url")?
        .parse()
        .with_context(|| format!("Failed to parse id from {}", url))
}

async fn error_of(response: reqwest::Response) -> String {
    let status = response.status();
    response
        .json::<ErrorResponse>()
        .await
        .map(|body| body.error)
        .unwrap_or_else(|_| status.to_string())
}

/// Parses body of a lookup, None if the service answered 404
async fn optional_json<T: DeserializeOwned>(
    response: reqwest::Response,
    operation: &str,
) -> anyhow::Result<Option<T>> {
    if response.status() == StatusCode::NOT_FOUND {
        Ok(None)
    } else if response.status().is_success() {
        Ok(Some(response.json().await?))
    } else {
        let error = error_of(response).await;
        bail!("Failed to {} {}", operation, error)
    }
}

/// Checks status of a mutation, false if the service answered 404
async fn found(response: reqwest::Response, operation: &str) -> anyhow::Result<bool> {
    if response.status() == StatusCode::NOT_FOUND {
        Ok(false)
    } else if response.status().is_success() {
        Ok(true)
    } else {
        let error = error_of(response).await;
        bail!("Failed to {} {}", operation, error)
    }
}

impl BookServiceCatalogClient {
    pub fn new(url: &str) -> anyhow::Result<Self> {
        let reqwest_client = reqwest::Client::builder()
            .build()
            .context("Failed to build reqwest client")?;
        let client = ClientBuilder::new(reqwest_client)
            // Insert the tracing middleware
            .with(TracingMiddleware::default())
            .build();

        Ok(Self {
            url: url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn books_url(&self) -> String {
        format!("{}{}/books", self.url, API_PREFIX)
    }

    fn book_url(&self, book_id: &BookId) -> String {
        format!("{}/{}", self.books_url(), book_id)
    }

    fn review_url(&self, book_id: &BookId, review_id: &ReviewId) -> String {
        format!("{}/reader_reviews/{}", self.book_url(book_id), review_id)
    }

    /// Calls GET /api/v1.0/books?pn=&ps= endpoint
    pub async fn list_books(&self, page_number: u64, page_size: u64) -> anyhow::Result<Vec<Book>> {
        let response = self
            .client
            .get(self.books_url())
            .query(&[("pn", page_number), ("ps", page_size)])
            .send()
            .await?;
        if response.status().is_success() {
            Ok(response.json().await?)
        } else {
            let error = error_of(response).await;
            bail!("Failed to list books {}", error)
        }
    }

    /// Calls POST /api/v1.0/books endpoint
    /// Returns book_id taken from the url of added book
    pub async fn add_book(&self, book_details: &BookDetails) -> anyhow::Result<BookId> {
        let response = self
            .client
            .post(self.books_url())
            .form(book_details)
            .send()
            .await?;

        if response.status() != StatusCode::CREATED {
            let error = error_of(response).await;
            bail!("Failed to add book {}", error)
        }

        let created: UrlResponse = response.json().await?;
        id_from_url(&created.url)
    }

    /// Calls GET /api/v1.0/books/{book_id} endpoint
    /// Returns None if book was not in the repository
    pub async fn get_book(&self, book_id: &BookId) -> anyhow::Result<Option<Book>> {
        let response = self.client.get(self.book_url(book_id)).send().await?;
        optional_json(response, "get book").await
    }

    /// Calls GET /api/v1.0/books/{book_id}/{title|author|year} endpoint
    pub async fn get_book_field(
        &self,
        book_id: &BookId,
        field: BookField,
    ) -> anyhow::Result<Option<String>> {
        let response = self
            .client
            .get(format!("{}/{}", self.book_url(book_id), field.key()))
            .send()
            .await?;
        let projection: Option<serde_json::Value> =
            optional_json(response, "get book field").await?;

        projection
            .map(|projection| {
                projection
                    .get(field.key())
                    .and_then(|value| value.as_str())
                    .map(str::to_string)
                    .with_context(|| format!("No {} in response", field.key()))
            })
            .transpose()
    }

    /// Calls PUT /api/v1.0/books/{book_id} endpoint
    /// Returns false if book was not in the repository
    pub async fn update_book(
        &self,
        book_id: &BookId,
        book_details: &BookDetails,
    ) -> anyhow::Result<bool> {
        let response = self
            .client
            .put(self.book_url(book_id))
            .form(book_details)
            .send()
            .await?;
        found(response, "update book").await
    }

    /// Calls DELETE /api/v1.0/books/{book_id} endpoint
    /// Returns false if book was already deleted
    pub async fn delete_book(&self, book_id: &BookId) -> anyhow::Result<bool> {
        let response = self.client.delete(self.book_url(book_id)).send().await?;
        found(response, "delete book").await
    }

    /// Calls GET /api/v1.0/books/{book_id}/reader_reviews endpoint
    pub async fn list_reviews(&self, book_id: &BookId) -> anyhow::Result<Option<Vec<Review>>> {
        let response = self
            .client
            .get(format!("{}/reader_reviews", self.book_url(book_id)))
            .send()
            .await?;
        optional_json(response, "list reviews").await
    }

    /// Calls POST /api/v1.0/books/{book_id}/reader_reviews endpoint
    /// Returns review_id taken from the url of added review, None if the book does not exist
    pub async fn add_review(
        &self,
        book_id: &BookId,
        review_details: &ReviewDetails,
    ) -> anyhow::Result<Option<ReviewId>> {
        let response = self
            .client
            .post(format!("{}/reader_reviews", self.book_url(book_id)))
            .form(review_details)
            .send()
            .await?;
        let created: Option<UrlResponse> = optional_json(response, "add review").await?;
        created.map(|created| id_from_url(&created.url)).transpose()
    }

    /// Calls GET /api/v1.0/books/{book_id}/reader_reviews/{review_id} endpoint
    pub async fn get_review(
        &self,
        book_id: &BookId,
        review_id: &ReviewId,
    ) -> anyhow::Result<Option<Review>> {
        let response = self
            .client
            .get(self.review_url(book_id, review_id))
            .send()
            .await?;
        optional_json(response, "get review").await
    }

    /// Calls PUT /api/v1.0/books/{book_id}/reader_reviews/{review_id} endpoint
    /// Returns false if review was not found
    pub async fn update_review(
        &self,
        book_id: &BookId,
        review_id: &ReviewId,
        review_details: &ReviewDetails,
    ) -> anyhow::Result<bool> {
        let response = self
            .client
            .put(self.review_url(book_id, review_id))
            .form(review_details)
            .send()
            .await?;
        found(response, "update review").await
    }

    /// Calls DELETE /api/v1.0/books/{book_id}/reader_reviews/{review_id} endpoint
    pub async fn delete_review(&self, book_id: &BookId, review_id: &ReviewId) -> anyhow::Result<()> {
        let response = self
            .client
            .delete(self.review_url(book_id, review_id))
            .send()
            .await?;
        if !response.status().is_success() {
            let error = error_of(response).await;
            bail!("Failed to delete review {}", error)
        }
        Ok(())
    }
}

#[cfg(test)]
mod client_tests {
    use crate::client::id_from_url;

    #[test]
    fn id_is_taken_from_the_end_of_url() {
        let id = id_from_url(
            "http://localhost:5000/api/v1.0/books/64b7f1c2e4b0a1b2c3d4e5f6/reader_reviews/64b7f1c2e4b0a1b2c3d4e5f7",
        )
        .unwrap();
        assert_eq!(id.as_str(), "64b7f1c2e4b0a1b2c3d4e5f7");

        assert!(id_from_url("http://localhost:5000/api/v1.0/books/").is_err());
    }
}
