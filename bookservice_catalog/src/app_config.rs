use actix_cors::Cors;
use actix_web::error::UrlencodedError;
use paperclip::actix::web;

use crate::api::API_PREFIX;
use crate::error::ApiError;
use crate::form_data::FORM_LIMIT;
use crate::handlers;

pub fn config_app(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/health").route(web::get().to(handlers::health)))
        .service(
            web::scope(API_PREFIX)
                .service(
                    web::resource("/books")
                        .route(web::get().to(handlers::get_all_books))
                        .route(web::post().to(handlers::add_book)),
                )
                .service(
                    web::scope("/books/{book_id}")
                        .service(
                            web::resource("")
                                .route(web::get().to(handlers::get_book))
                                .route(web::put().to(handlers::update_book))
                                .route(web::delete().to(handlers::delete_book)),
                        )
                        .service(
                            web::resource("/title").route(web::get().to(handlers::get_book_title)),
                        )
                        .service(
                            web::resource("/author")
                                .route(web::get().to(handlers::get_book_author)),
                        )
                        .service(
                            web::resource("/year").route(web::get().to(handlers::get_book_year)),
                        )
                        .service(
                            web::resource("/reader_reviews")
                                .route(web::get().to(handlers::get_all_reviews))
                                .route(web::post().to(handlers::add_review)),
                        )
                        .service(
                            web::resource("/reader_reviews/{review_id}")
                                .route(web::get().to(handlers::get_review))
                                .route(web::put().to(handlers::update_review))
                                .route(web::delete().to(handlers::delete_review)),
                        ),
                ),
        );
}

/// Form payloads with missing fields are rejected with the missing data error,
/// oversized ones keep their own 413 response
pub fn form_config() -> actix_web::web::FormConfig {
    actix_web::web::FormConfig::default()
        .limit(FORM_LIMIT)
        .error_handler(|err, _req| match err {
            UrlencodedError::Overflow { .. } => err.into(),
            err => {
                tracing::debug!("Rejected form payload {}", err);
                ApiError::MissingData.into()
            }
        })
}

/// Requests are accepted from any origin
pub fn cors() -> Cors {
    Cors::default()
        .allow_any_origin()
        .allow_any_method()
        .allow_any_header()
        .send_wildcard()
}
