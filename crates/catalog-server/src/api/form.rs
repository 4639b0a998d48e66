//! Request body for product create and update.
//!
//! Accepts `multipart/form-data` (text fields plus an optional `image` file
//! part) or `application/json`. Field values are kept raw here; parsing and
//! normalization happen in [`ProductForm::fields`] so both encodings share
//! one set of rules.

use axum::{
    body::Bytes,
    extract::{multipart::MultipartError, FromRequest, Multipart, Request},
    http::{header, StatusCode},
    Json,
};
use catalog_core::products::{normalize_optional, normalize_sku, parse_price, require_name};
use catalog_core::CoreError;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::middleware::RequestId;

use super::ApiError;

/// An uploaded file as received, before it is named and written to disk.
#[derive(Debug, Clone)]
pub(super) struct ImageUpload {
    pub original_name: String,
    pub bytes: Bytes,
}

#[derive(Debug, Default)]
pub(super) struct ProductForm {
    pub id: Option<String>,
    pub sku: Option<String>,
    pub name: Option<String>,
    pub price: Option<String>,
    pub description: Option<String>,
    pub image: Option<ImageUpload>,
}

/// Validated, normalized product fields shared by create and update.
#[derive(Debug, Clone, PartialEq)]
pub(super) struct ProductFields {
    pub sku: Option<String>,
    pub name: String,
    pub price: Decimal,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum JsonPrice {
    Number(serde_json::Number),
    Text(String),
}

#[derive(Debug, Deserialize)]
struct JsonProductBody {
    id: Option<String>,
    sku: Option<String>,
    name: Option<String>,
    price: Option<JsonPrice>,
    description: Option<String>,
}

impl From<JsonProductBody> for ProductForm {
    fn from(body: JsonProductBody) -> Self {
        Self {
            id: body.id,
            sku: body.sku,
            name: body.name,
            price: body.price.map(|p| match p {
                JsonPrice::Number(n) => n.to_string(),
                JsonPrice::Text(s) => s,
            }),
            description: body.description,
            image: None,
        }
    }
}

impl ProductForm {
    /// # Errors
    ///
    /// Returns [`CoreError`] if the name is blank or the price is missing or
    /// not a non-negative decimal.
    pub(super) fn fields(&self) -> Result<ProductFields, CoreError> {
        let name = require_name(self.name.as_deref())?;
        let price = parse_price(self.price.as_deref().ok_or(CoreError::MissingField("price"))?)?;
        Ok(ProductFields {
            sku: normalize_sku(self.sku.clone()),
            name,
            price,
            description: normalize_optional(self.description.clone()),
        })
    }

    async fn from_multipart(mut multipart: Multipart) -> Result<Self, MultipartError> {
        let mut form = Self::default();

        while let Some(field) = multipart.next_field().await? {
            let Some(name) = field.name().map(ToOwned::to_owned) else {
                continue;
            };

            if name == "image" {
                let original_name = field.file_name().map(ToOwned::to_owned);
                let bytes = field.bytes().await?;
                // Browsers send an empty, unnamed part when no file was picked.
                if let Some(original_name) = original_name.filter(|n| !n.is_empty()) {
                    form.image = Some(ImageUpload {
                        original_name,
                        bytes,
                    });
                }
                continue;
            }

            let value = field.text().await?;
            match name.as_str() {
                "id" => form.id = Some(value),
                "sku" => form.sku = Some(value),
                "name" => form.name = Some(value),
                "price" => form.price = Some(value),
                "description" => form.description = Some(value),
                _ => tracing::debug!(field = %name, "ignoring unknown form field"),
            }
        }

        Ok(form)
    }
}

fn rejection(request_id: String, status: StatusCode, message: String) -> ApiError {
    let code = if status == StatusCode::PAYLOAD_TOO_LARGE {
        "payload_too_large"
    } else {
        "validation_error"
    };
    ApiError::new(request_id, code, message)
}

impl<S> FromRequest<S> for ProductForm
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let req_id = req
            .extensions()
            .get::<RequestId>()
            .map(|id| id.0.clone())
            .unwrap_or_default();
        let content_type = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();

        if content_type.starts_with("multipart/form-data") {
            let multipart = Multipart::from_request(req, state)
                .await
                .map_err(|e| rejection(req_id.clone(), e.status(), e.body_text()))?;
            return Self::from_multipart(multipart)
                .await
                .map_err(|e| rejection(req_id, e.status(), e.body_text()));
        }

        if content_type.starts_with("application/json") {
            let Json(body) = Json::<JsonProductBody>::from_request(req, state)
                .await
                .map_err(|e| rejection(req_id, e.status(), e.body_text()))?;
            return Ok(body.into());
        }

        Err(ApiError::new(
            req_id,
            "unsupported_media_type",
            "expected multipart/form-data or application/json",
        ))
    }
}
