use axum::{
    extract::{Query, State},
    http::StatusCode,
    Extension, Json,
};
use catalog_core::{
    catalog, CoreError, NewProduct, ProductKey, ProductUpdate, ProductView, WriteOutcome,
    MSG_NOT_FOUND,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::middleware::RequestId;

use super::{
    form::{ImageUpload, ProductForm},
    images::save_upload,
    map_store_error, validation_error, ApiError, AppState,
};

#[derive(Debug, Deserialize)]
pub(super) struct IdQuery {
    pub id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct SkuQuery {
    pub sku: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct DeleteQuery {
    pub id: Option<String>,
    pub sku: Option<String>,
}

/// Ids are UUIDs; anything else cannot match a stored product.
fn parse_id(raw: &str) -> Option<Uuid> {
    Uuid::parse_str(raw.trim()).ok()
}

async fn store_image(
    state: &AppState,
    req_id: &RequestId,
    upload: Option<&ImageUpload>,
) -> Result<Option<String>, ApiError> {
    match upload {
        Some(upload) => Ok(Some(save_upload(&state.upload_dir, req_id, upload).await?)),
        None => Ok(None),
    }
}

pub(super) async fn create_product(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    form: ProductForm,
) -> Result<(StatusCode, Json<WriteOutcome>), ApiError> {
    let fields = form.fields().map_err(|e| validation_error(&req_id, &e))?;
    let image = store_image(&state, &req_id, form.image.as_ref()).await?;

    let product = NewProduct {
        sku: fields.sku,
        name: fields.name,
        price: fields.price,
        description: fields.description,
        image,
    };
    let outcome = catalog::create_product(state.store.as_ref(), &product)
        .await
        .map_err(|e| map_store_error(req_id.0.clone(), &e))?;

    let status = if outcome.success {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(outcome)))
}

pub(super) async fn list_products(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<Vec<ProductView>>, ApiError> {
    let products = catalog::list_products(state.store.as_ref())
        .await
        .map_err(|e| map_store_error(req_id.0.clone(), &e))?;
    Ok(Json(products))
}

async fn lookup(
    state: &AppState,
    req_id: RequestId,
    key: Option<ProductKey>,
) -> Result<Json<ProductView>, ApiError> {
    let Some(key) = key else {
        return Ok(Json(ProductView::placeholder()));
    };

    let found = catalog::get_product(state.store.as_ref(), &key)
        .await
        .map_err(|e| map_store_error(req_id.0, &e))?;
    // Absence keeps the placeholder body rather than a 404.
    Ok(Json(found.unwrap_or_else(ProductView::placeholder)))
}

pub(super) async fn get_product_by_id(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<IdQuery>,
) -> Result<Json<ProductView>, ApiError> {
    let key = query.id.as_deref().and_then(parse_id).map(ProductKey::Id);
    lookup(&state, req_id, key).await
}

pub(super) async fn get_product_by_sku(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<SkuQuery>,
) -> Result<Json<ProductView>, ApiError> {
    let key = query
        .sku
        .map(|sku| sku.trim().to_string())
        .filter(|sku| !sku.is_empty())
        .map(ProductKey::Sku);
    lookup(&state, req_id, key).await
}

pub(super) async fn update_product(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    form: ProductForm,
) -> Result<Json<WriteOutcome>, ApiError> {
    let raw_id = form
        .id
        .as_deref()
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| validation_error(&req_id, &CoreError::MissingField("id")))?;
    let fields = form.fields().map_err(|e| validation_error(&req_id, &e))?;

    let Some(id) = parse_id(raw_id) else {
        tracing::info!(id = %raw_id, "update rejected: id is not a valid product id");
        return Ok(Json(WriteOutcome::rejected(MSG_NOT_FOUND)));
    };

    let image = store_image(&state, &req_id, form.image.as_ref()).await?;
    let update = ProductUpdate {
        id,
        sku: fields.sku,
        name: fields.name,
        price: fields.price,
        description: fields.description,
        image,
    };
    let outcome = catalog::update_product(state.store.as_ref(), &update)
        .await
        .map_err(|e| map_store_error(req_id.0.clone(), &e))?;
    Ok(Json(outcome))
}

pub(super) async fn delete_product(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<DeleteQuery>,
) -> Result<Json<bool>, ApiError> {
    let key = match (query.id, query.sku) {
        (Some(id), _) => match parse_id(&id) {
            Some(id) => ProductKey::Id(id),
            None => {
                tracing::info!(%id, "delete skipped: id is not a valid product id");
                return Ok(Json(false));
            }
        },
        (None, Some(sku)) if !sku.trim().is_empty() => ProductKey::Sku(sku.trim().to_string()),
        _ => {
            return Err(ApiError::new(
                req_id.0,
                "validation_error",
                "id or sku is required",
            ))
        }
    };

    let removed = catalog::delete_product(state.store.as_ref(), &key)
        .await
        .map_err(|e| map_store_error(req_id.0.clone(), &e))?;
    Ok(Json(removed))
}
