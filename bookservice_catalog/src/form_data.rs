use actix_multipart::Multipart;
use actix_web::dev::Payload;
use actix_web::http::header::CONTENT_TYPE;
use actix_web::{web, FromRequest, HttpRequest};
use futures_util::future::LocalBoxFuture;
use futures_util::TryStreamExt;
use paperclip::actix::OperationModifier;
use paperclip::v2::models::DefaultOperationRaw;
use paperclip::v2::schema::Apiv2Schema;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::ApiError;

/// Upper bound of a form body in bytes, for both encodings
pub const FORM_LIMIT: usize = 1024 * 1024;

/// Form fields of a request body, sent url encoded or as multipart text fields.
///
/// Url encoded bodies go through `web::Form`, so they are rejected by the app's `FormConfig`.
pub struct FormData<T>(pub T);

impl<T> FormData<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

fn is_multipart(req: &HttpRequest) -> bool {
    req.headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| {
            value
                .trim_start()
                .to_ascii_lowercase()
                .starts_with("multipart/form-data")
        })
}

fn rejected(err: impl std::fmt::Display) -> actix_web::Error {
    tracing::debug!("Rejected form payload {}", err);
    ApiError::MissingData.into()
}

/// Collects every named field as text, later fields with the same name win
async fn multipart_fields(
    mut multipart: Multipart,
) -> Result<Map<String, Value>, actix_web::Error> {
    let mut fields = Map::new();
    let mut size = 0;
    while let Some(mut field) = multipart.try_next().await.map_err(rejected)? {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        let mut value = Vec::new();
        while let Some(chunk) = field.try_next().await.map_err(rejected)? {
            size += chunk.len();
            if size > FORM_LIMIT {
                return Err(actix_web::error::ErrorPayloadTooLarge(
                    "Form payload is too large",
                ));
            }
            value.extend_from_slice(&chunk);
        }
        fields.insert(
            name,
            Value::String(String::from_utf8_lossy(&value).into_owned()),
        );
    }
    Ok(fields)
}

impl<T: DeserializeOwned + 'static> FromRequest for FormData<T> {
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        if is_multipart(req) {
            let multipart = Multipart::from_request(req, payload);
            Box::pin(async move {
                let fields = multipart_fields(multipart.await?).await?;
                serde_json::from_value(Value::Object(fields))
                    .map(FormData)
                    .map_err(rejected)
            })
        } else {
            let form = web::Form::<T>::from_request(req, payload);
            Box::pin(async move { form.await.map(|form| FormData(form.into_inner())) })
        }
    }
}

impl<T: Apiv2Schema> Apiv2Schema for FormData<T> {}

// Documented as form data parameters, the same as `web::Form`
impl<T: Apiv2Schema> OperationModifier for FormData<T> {
    fn update_parameter(op: &mut DefaultOperationRaw) {
        <web::Form<T> as OperationModifier>::update_parameter(op)
    }
}
