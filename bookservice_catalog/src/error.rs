use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};

use crate::api::ErrorResponse;
use crate::books_repository::BookRepositoryError;

/// Errors returned to clients of the catalog api.
///
/// Every client facing variant is answered with 404 and `{"error": <message>}`,
/// including missing form data, which is what existing clients of the api expect.
#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("Book ID is invalid, please enter a valid ID")]
    BookNotFound,

    #[error("The book review ID is invalid, please enter a valid ID")]
    ReviewNotFound,

    #[error("Enter a valid book ID")]
    BookToEditNotFound,

    #[error("This book record has already been deleted")]
    BookAlreadyDeleted,

    #[error("Data is missing. Please try again")]
    MissingData,

    #[error("Internal error: {0}")]
    Internal(BookRepositoryError),
}

impl From<BookRepositoryError> for ApiError {
    fn from(err: BookRepositoryError) -> Self {
        match err {
            BookRepositoryError::BookNotFound(_) => ApiError::BookNotFound,
            BookRepositoryError::ReviewNotFound(_) => ApiError::ReviewNotFound,
            other => ApiError::Internal(other),
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::NOT_FOUND,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let error = match self {
            ApiError::Internal(err) => {
                tracing::error!("Request failed {}", err);
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };
        HttpResponse::build(self.status_code()).json(ErrorResponse { error })
    }
}

#[cfg(test)]
mod api_error_tests {
    use actix_web::body::to_bytes;
    use actix_web::http::StatusCode;
    use actix_web::ResponseError;

    use crate::api::{BookId, ErrorResponse};
    use crate::books_repository::BookRepositoryError;
    use crate::error::ApiError;

    async fn response_of(err: ApiError) -> (StatusCode, ErrorResponse) {
        let response = err.error_response();
        let status = response.status();
        let body = to_bytes(response.into_body()).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn not_found_errors_render_their_message() {
        let (status, body) = response_of(ApiError::BookAlreadyDeleted).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body.error, "This book record has already been deleted");

        let (status, body) = response_of(ApiError::MissingData).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body.error, "Data is missing. Please try again");
    }

    #[tokio::test]
    async fn repository_errors_are_mapped() {
        let not_found: ApiError = BookRepositoryError::BookNotFound(BookId::generate()).into();
        assert!(matches!(not_found, ApiError::BookNotFound));

        let other: ApiError = BookRepositoryError::Other("db is down".to_string()).into();
        let (status, body) = response_of(other).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.error, "Internal server error");
    }
}
