use std::sync::Arc;

use actix_web::web::Data;
use actix_web::Error;
use actix_web::HttpResponse;
use paperclip::actix::{
    api_v2_operation,
    web::{self},
    Apiv2Schema,
};
use serde::Deserialize;
use serde_json::json;

use crate::api::{
    BookDetails, BookField, BookId, Pagination, ResourceUrls, ReviewDetails, ReviewId,
    UrlResponse,
};
use crate::books_repository::BookRepository;
use crate::error::ApiError;
use crate::form_data::FormData;

type Repository = Data<Arc<dyn BookRepository>>;

#[derive(Debug, Deserialize, Apiv2Schema)]
pub struct BookPath {
    book_id: String,
}

#[derive(Debug, Deserialize, Apiv2Schema)]
pub struct ReviewPath {
    book_id: String,
    review_id: String,
}

/// Malformed ids can not match any record, so they are answered as `not_found`
fn parse_id(raw: &str, not_found: ApiError) -> Result<BookId, ApiError> {
    raw.parse().map_err(|_| not_found)
}

#[api_v2_operation]
pub async fn health() -> Result<HttpResponse, Error> {
    Ok(HttpResponse::Ok().finish())
}

#[api_v2_operation]
pub async fn get_all_books(
    books_repository: Repository,
    pagination: web::Query<Pagination>,
) -> Result<HttpResponse, Error> {
    let (offset, limit) = pagination.window();
    let books = books_repository
        .list_books(offset, limit)
        .await
        .map_err(ApiError::from)?;
    Ok(HttpResponse::Ok().json(books))
}

#[api_v2_operation]
pub async fn get_book(
    books_repository: Repository,
    path: web::Path<BookPath>,
) -> Result<HttpResponse, Error> {
    let book_id = parse_id(&path.book_id, ApiError::BookNotFound)?;
    let book = books_repository
        .get_book(&book_id)
        .await
        .map_err(ApiError::from)?;
    Ok(HttpResponse::Ok().json(book))
}

async fn get_book_field(
    books_repository: &dyn BookRepository,
    path: &BookPath,
    field: BookField,
) -> Result<HttpResponse, ApiError> {
    let book_id = parse_id(&path.book_id, ApiError::BookNotFound)?;
    let value = books_repository.get_book_field(&book_id, field).await?;
    Ok(HttpResponse::Ok().json(json!({ field.key(): value })))
}

#[api_v2_operation]
pub async fn get_book_title(
    books_repository: Repository,
    path: web::Path<BookPath>,
) -> Result<HttpResponse, Error> {
    Ok(get_book_field(books_repository.get_ref().as_ref(), &path, BookField::Title).await?)
}

#[api_v2_operation]
pub async fn get_book_author(
    books_repository: Repository,
    path: web::Path<BookPath>,
) -> Result<HttpResponse, Error> {
    Ok(get_book_field(books_repository.get_ref().as_ref(), &path, BookField::Author).await?)
}

#[api_v2_operation]
pub async fn get_book_year(
    books_repository: Repository,
    path: web::Path<BookPath>,
) -> Result<HttpResponse, Error> {
    Ok(get_book_field(books_repository.get_ref().as_ref(), &path, BookField::Year).await?)
}

#[api_v2_operation]
pub async fn add_book(
    books_repository: Repository,
    urls: Data<ResourceUrls>,
    details: FormData<BookDetails>,
) -> Result<HttpResponse, Error> {
    let book_id = books_repository
        .add_book(details.into_inner())
        .await
        .map_err(ApiError::from)?;
    tracing::info!("Added book {}", book_id);
    Ok(HttpResponse::Created().json(UrlResponse {
        url: urls.book(&book_id),
    }))
}

#[api_v2_operation]
pub async fn update_book(
    books_repository: Repository,
    urls: Data<ResourceUrls>,
    path: web::Path<BookPath>,
    details: FormData<BookDetails>,
) -> Result<HttpResponse, Error> {
    let book_id = parse_id(&path.book_id, ApiError::BookToEditNotFound)?;
    let updated = books_repository
        .update_book(&book_id, details.into_inner())
        .await
        .map_err(ApiError::from)?;
    if !updated {
        return Err(ApiError::BookToEditNotFound.into());
    }
    Ok(HttpResponse::Ok().json(UrlResponse {
        url: urls.book(&book_id),
    }))
}

#[api_v2_operation]
pub async fn delete_book(
    books_repository: Repository,
    path: web::Path<BookPath>,
) -> Result<HttpResponse, Error> {
    let book_id = parse_id(&path.book_id, ApiError::BookAlreadyDeleted)?;
    let deleted = books_repository
        .delete_book(&book_id)
        .await
        .map_err(ApiError::from)?;
    if !deleted {
        return Err(ApiError::BookAlreadyDeleted.into());
    }
    tracing::info!("Deleted book {}", book_id);
    Ok(HttpResponse::NoContent().finish())
}

#[api_v2_operation]
pub async fn get_all_reviews(
    books_repository: Repository,
    path: web::Path<BookPath>,
) -> Result<HttpResponse, Error> {
    let book_id = parse_id(&path.book_id, ApiError::BookNotFound)?;
    let reviews = books_repository
        .list_reviews(&book_id)
        .await
        .map_err(ApiError::from)?;
    Ok(HttpResponse::Ok().json(reviews))
}

#[api_v2_operation]
pub async fn add_review(
    books_repository: Repository,
    urls: Data<ResourceUrls>,
    path: web::Path<BookPath>,
    details: FormData<ReviewDetails>,
) -> Result<HttpResponse, Error> {
    let book_id = parse_id(&path.book_id, ApiError::BookNotFound)?;
    let review_id = books_repository
        .add_review(&book_id, details.into_inner())
        .await
        .map_err(ApiError::from)?;
    Ok(HttpResponse::Created().json(UrlResponse {
        url: urls.review(&book_id, &review_id),
    }))
}

/// Review is looked up by its own id, book id from the path is ignored
#[api_v2_operation]
pub async fn get_review(
    books_repository: Repository,
    path: web::Path<ReviewPath>,
) -> Result<HttpResponse, Error> {
    let review_id: ReviewId = parse_id(&path.review_id, ApiError::ReviewNotFound)?;
    let review = books_repository
        .get_review(&review_id)
        .await
        .map_err(ApiError::from)?;
    Ok(HttpResponse::Ok().json(review))
}

/// Review is looked up by its own id, book id from the path is only copied into the returned url
#[api_v2_operation]
pub async fn update_review(
    books_repository: Repository,
    urls: Data<ResourceUrls>,
    path: web::Path<ReviewPath>,
    details: FormData<ReviewDetails>,
) -> Result<HttpResponse, Error> {
    let review_id: ReviewId = parse_id(&path.review_id, ApiError::ReviewNotFound)?;
    let updated = books_repository
        .update_review(&review_id, details.into_inner())
        .await
        .map_err(ApiError::from)?;
    if !updated {
        return Err(ApiError::ReviewNotFound.into());
    }
    Ok(HttpResponse::Ok().json(UrlResponse {
        url: urls.review(&path.book_id, &review_id),
    }))
}

/// Answers 204 whether or not the review was there
#[api_v2_operation]
pub async fn delete_review(
    books_repository: Repository,
    path: web::Path<ReviewPath>,
) -> Result<HttpResponse, Error> {
    let (Ok(book_id), Ok(review_id)) = (
        path.book_id.parse::<BookId>(),
        path.review_id.parse::<ReviewId>(),
    ) else {
        return Ok(HttpResponse::NoContent().finish());
    };
    let removed = books_repository
        .remove_review(&book_id, &review_id)
        .await
        .map_err(ApiError::from)?;
    if !removed {
        tracing::debug!("Review {} of book {} was not there", review_id, book_id);
    }
    Ok(HttpResponse::NoContent().finish())
}
