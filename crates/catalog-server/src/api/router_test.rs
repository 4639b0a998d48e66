use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request};
use catalog_core::{MemoryProductStore, NewProduct};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use super::*;

const ALLOWED_ORIGIN: &str = "http://localhost:5173";
const BOUNDARY: &str = "catalog-test-boundary";
const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\nnot-really-a-png";

struct Harness {
    app: Router,
    store: Arc<MemoryProductStore>,
    upload_dir: TempDir,
}

fn harness_with_limit(max_upload_bytes: usize) -> Harness {
    let store = Arc::new(MemoryProductStore::default());
    let upload_dir = tempfile::tempdir().expect("tempdir");
    let state = AppState {
        store: Arc::clone(&store) as Arc<dyn ProductStore>,
        upload_dir: Arc::new(upload_dir.path().to_path_buf()),
    };
    let origins = [
        ALLOWED_ORIGIN.to_string(),
        "http://localhost:5174".to_string(),
    ];
    Harness {
        app: build_app(state, &origins, max_upload_bytes),
        store,
        upload_dir,
    }
}

fn harness() -> Harness {
    harness_with_limit(1024 * 1024)
}

fn seed(store: &MemoryProductStore, sku: Option<&str>, name: &str) -> catalog_core::ProductRecord {
    store.seed(NewProduct {
        sku: sku.map(ToOwned::to_owned),
        name: name.to_string(),
        price: Decimal::new(9990, 2),
        description: None,
        image: None,
    })
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("request")
}

fn json_request(method: Method, uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

fn multipart_request(
    method: Method,
    uri: &str,
    fields: &[(&str, &str)],
    image: Option<(&str, &[u8])>,
) -> Request<Body> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some((file_name, bytes)) = image {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"{file_name}\"\r\n\
                 Content-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method(method)
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .expect("request")
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    let json: Value = serde_json::from_slice(&body).expect("json parse");
    (status, json)
}

fn assert_price(value: &Value, expected: f64) {
    let actual = value.as_f64().expect("numeric price");
    assert!((actual - expected).abs() < 1e-9, "{actual} != {expected}");
}

fn extension_of(file_name: &str) -> Option<&str> {
    std::path::Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
}

fn stored_files(dir: &TempDir) -> Vec<String> {
    std::fs::read_dir(dir.path())
        .expect("read upload dir")
        .map(|entry| {
            entry
                .expect("dir entry")
                .file_name()
                .to_string_lossy()
                .into_owned()
        })
        .collect()
}

// -------------------------------------------------------------------------
// Create
// -------------------------------------------------------------------------

#[tokio::test]
async fn create_then_get_by_sku() {
    let h = harness();

    let (status, json) = send(
        &h.app,
        json_request(
            Method::POST,
            "/product",
            &json!({"sku": "SKU1", "name": "Widget", "price": 9.99}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json, json!({"success": true}));

    let (status, json) = send(&h.app, get_request("/product/bySku?sku=SKU1")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["id"].is_string());
    assert_eq!(json["sku"], "SKU1");
    assert_eq!(json["name"], "Widget");
    assert_price(&json["price"], 9.99);
    assert_eq!(json["description"], "");
    assert_eq!(json["image"], "");
}

#[tokio::test]
async fn duplicate_sku_is_a_soft_failure() {
    let h = harness();
    let body = json!({"sku": "SKU1", "name": "Widget", "price": 9.99});

    send(&h.app, json_request(Method::POST, "/product", &body)).await;
    let (status, json) = send(&h.app, json_request(Method::POST, "/product", &body)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        json,
        json!({"success": false, "message": "SKU already registered"})
    );
    assert_eq!(h.store.len(), 1);
    assert_eq!(h.store.insert_calls(), 1);
}

#[tokio::test]
async fn multipart_create_stores_image_and_serves_it() {
    let h = harness();

    let (status, json) = send(
        &h.app,
        multipart_request(
            Method::POST,
            "/product",
            &[("sku", "PROD001"), ("name", "Produto 1"), ("price", "99.90")],
            Some(("photo.png", PNG_BYTES)),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["success"], true);

    let files = stored_files(&h.upload_dir);
    assert_eq!(files.len(), 1);
    let stored = &files[0];
    assert!(stored.starts_with("product-"), "{stored}");
    assert_eq!(extension_of(stored), Some("png"), "{stored}");

    let (_, product) = send(&h.app, get_request("/product/bySku?sku=PROD001")).await;
    assert_eq!(product["image"].as_str(), Some(stored.as_str()));
    assert_price(&product["price"], 99.9);

    let response = h
        .app
        .clone()
        .oneshot(get_request(&format!("/product/image/{stored}")))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "image/png"
    );
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    assert_eq!(&body[..], PNG_BYTES);
}

#[tokio::test]
async fn disallowed_image_extension_is_rejected_before_insert() {
    let h = harness();

    let (status, json) = send(
        &h.app,
        multipart_request(
            Method::POST,
            "/product",
            &[("name", "Widget"), ("price", "1")],
            Some(("notes.txt", &b"hello"[..])),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "validation_error");
    assert!(json["error"]["message"]
        .as_str()
        .unwrap()
        .contains("Only image files are allowed!"));
    assert_eq!(h.store.insert_calls(), 0);
    assert!(stored_files(&h.upload_dir).is_empty());
}

#[tokio::test]
async fn invalid_fields_return_validation_envelope() {
    let h = harness();

    let response = h
        .app
        .clone()
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/product")
                .header(header::CONTENT_TYPE, "application/json")
                .header(REQUEST_ID_HEADER, "req-42")
                .body(Body::from(json!({"name": "  ", "price": 1}).to_string()))
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    let json: Value = serde_json::from_slice(&body).expect("json parse");
    assert_eq!(json["error"]["code"], "validation_error");
    assert_eq!(json["error"]["message"], "name is required");
    assert_eq!(json["meta"]["request_id"], "req-42");

    let (status, json) = send(
        &h.app,
        json_request(
            Method::POST,
            "/product",
            &json!({"name": "Widget", "price": -5}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "validation_error");
    assert_eq!(h.store.insert_calls(), 0);
}

#[tokio::test]
async fn price_with_digit_separators_is_rejected() {
    let h = harness();

    let (status, json) = send(
        &h.app,
        json_request(
            Method::POST,
            "/product",
            &json!({"name": "Widget", "price": "1_000"}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "validation_error");
    assert_eq!(h.store.insert_calls(), 0);
}

#[tokio::test]
async fn unsupported_content_type_is_415() {
    let h = harness();

    let (status, json) = send(
        &h.app,
        Request::builder()
            .method(Method::POST)
            .uri("/product")
            .header(header::CONTENT_TYPE, "text/plain")
            .body(Body::from("name=Widget"))
            .expect("request"),
    )
    .await;

    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert_eq!(json["error"]["code"], "unsupported_media_type");
}

#[tokio::test]
async fn oversized_body_is_413() {
    let h = harness_with_limit(64);

    let (status, json) = send(
        &h.app,
        json_request(
            Method::POST,
            "/product",
            &json!({"name": "Widget", "price": 1, "description": "x".repeat(256)}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(json["error"]["code"], "payload_too_large");
}

// -------------------------------------------------------------------------
// Read
// -------------------------------------------------------------------------

#[tokio::test]
async fn unknown_id_returns_placeholder_shape() {
    let h = harness();

    for uri in [
        "/product/byId?id=nonexistent",
        "/product/byId",
        "/product/byId?id=6f1c3a52-0d8e-4f7e-9d43-8f6a3c2b1e00",
    ] {
        let (status, json) = send(&h.app, get_request(uri)).await;
        assert_eq!(status, StatusCode::OK, "{uri}");
        assert_eq!(
            json,
            json!({"sku": "", "name": "", "price": null, "description": "", "image": ""}),
            "{uri}"
        );
    }
}

#[tokio::test]
async fn create_then_get_by_id_round_trips() {
    let h = harness();

    let (status, _) = send(
        &h.app,
        json_request(
            Method::POST,
            "/product",
            &json!({"sku": "P1", "name": "Widget", "price": "99.90", "description": "Blue"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, by_sku) = send(&h.app, get_request("/product/bySku?sku=P1")).await;
    let id = by_sku["id"].as_str().expect("stored id").to_string();

    let (status, json) = send(&h.app, get_request(&format!("/product/byId?id={id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["id"], id.as_str());
    assert_eq!(json["sku"], "P1");
    assert_eq!(json["name"], "Widget");
    assert_price(&json["price"], 99.9);
    assert_eq!(json["description"], "Blue");
    assert_eq!(json["image"], "");
}

#[tokio::test]
async fn get_by_id_finds_seeded_product() {
    let h = harness();
    let record = seed(&h.store, Some("P1"), "Widget");

    let (status, json) = send(
        &h.app,
        get_request(&format!("/product/byId?id={}", record.id)),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["id"], record.id.to_string());
    assert_eq!(json["sku"], "P1");
    assert_eq!(json["name"], "Widget");
    assert_price(&json["price"], 99.9);
    assert_eq!(json["description"], "");
    assert_eq!(json["image"], "");
}

#[tokio::test]
async fn list_returns_normalized_products_in_name_order() {
    let h = harness();
    seed(&h.store, None, "Produto B");
    let first = seed(&h.store, Some("PROD001"), "Produto A");

    let (status, json) = send(&h.app, get_request("/product")).await;
    assert_eq!(status, StatusCode::OK);
    let items = json.as_array().expect("array");
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["id"], first.id.to_string());
    assert_eq!(items[0]["sku"], "PROD001");
    assert_eq!(items[1]["sku"], "");
    assert_price(&items[1]["price"], 99.9);
}

#[tokio::test]
async fn store_failure_is_internal_error() {
    let h = harness();
    h.store.fail_next_call();

    let (status, json) = send(&h.app, get_request("/product")).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["error"]["code"], "internal_error");
}

#[tokio::test]
async fn missing_or_unsafe_image_names_are_not_found() {
    let h = harness();
    for uri in [
        "/product/image/missing.png",
        "/product/image/..%2Fsecret.png",
        "/product/image/..",
    ] {
        let (status, json) = send(&h.app, get_request(uri)).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
        assert_eq!(json, json!({"message": "Image not found"}), "{uri}");
    }
}

// -------------------------------------------------------------------------
// Update
// -------------------------------------------------------------------------

#[tokio::test]
async fn update_of_unknown_product_issues_no_write() {
    let h = harness();

    for id in ["X", "6f1c3a52-0d8e-4f7e-9d43-8f6a3c2b1e00"] {
        let (status, json) = send(
            &h.app,
            json_request(
                Method::PUT,
                "/product",
                &json!({"id": id, "sku": "SKU1-new", "name": "Widget v2", "price": 12.0}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            json,
            json!({"success": false, "message": "Product not found"})
        );
    }
    assert_eq!(h.store.update_calls(), 0);
}

#[tokio::test]
async fn update_without_image_keeps_stored_image() {
    let h = harness();
    let record = h.store.seed(NewProduct {
        sku: Some("PROD001".to_string()),
        name: "Produto 1".to_string(),
        price: Decimal::new(9990, 2),
        description: Some("old".to_string()),
        image: Some("product-1-1.png".to_string()),
    });
    let id = record.id.to_string();

    let (status, json) = send(
        &h.app,
        multipart_request(
            Method::PUT,
            "/product",
            &[
                ("id", id.as_str()),
                ("sku", "PROD001"),
                ("name", "Produto 1 v2"),
                ("price", "150"),
            ],
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        json,
        json!({"success": true, "message": "Product updated successfully"})
    );

    let stored = h.store.get(record.id).expect("still present");
    assert_eq!(stored.name, "Produto 1 v2");
    assert_eq!(stored.price, Decimal::new(150, 0));
    assert_eq!(stored.description, None);
    assert_eq!(stored.image.as_deref(), Some("product-1-1.png"));
}

#[tokio::test]
async fn update_with_image_replaces_reference() {
    let h = harness();
    let record = h.store.seed(NewProduct {
        sku: Some("PROD001".to_string()),
        name: "Produto 1".to_string(),
        price: Decimal::new(9990, 2),
        description: None,
        image: Some("product-1-1.png".to_string()),
    });
    let id = record.id.to_string();

    let (_, json) = send(
        &h.app,
        multipart_request(
            Method::PUT,
            "/product",
            &[("id", id.as_str()), ("name", "Produto 1"), ("price", "99.90")],
            Some(("new.GIF", &b"GIF89a"[..])),
        ),
    )
    .await;
    assert_eq!(json["success"], true);

    let files = stored_files(&h.upload_dir);
    assert_eq!(files.len(), 1);
    let stored = h.store.get(record.id).expect("still present");
    assert_eq!(stored.image.as_deref(), Some(files[0].as_str()));
    assert_eq!(extension_of(&files[0]), Some("GIF"));
}

#[tokio::test]
async fn update_requires_id() {
    let h = harness();

    let (status, json) = send(
        &h.app,
        json_request(
            Method::PUT,
            "/product",
            &json!({"name": "Widget", "price": 1}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["message"], "id is required");
}

// -------------------------------------------------------------------------
// Delete
// -------------------------------------------------------------------------

#[tokio::test]
async fn delete_of_unknown_product_is_false_without_delete() {
    let h = harness();

    for uri in [
        "/product/delete?id=X",
        "/product/delete?id=6f1c3a52-0d8e-4f7e-9d43-8f6a3c2b1e00",
        "/product/delete?sku=NOPE",
    ] {
        let (status, json) = send(
            &h.app,
            Request::builder()
                .method(Method::DELETE)
                .uri(uri)
                .body(Body::empty())
                .expect("request"),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{uri}");
        assert_eq!(json, json!(false), "{uri}");
    }
    assert_eq!(h.store.delete_calls(), 0);
}

#[tokio::test]
async fn delete_existing_product_by_id_and_sku() {
    let h = harness();
    let by_id = seed(&h.store, Some("PROD001"), "Produto 1");
    seed(&h.store, Some("PROD002"), "Produto 2");

    for uri in [
        format!("/product/delete?id={}", by_id.id),
        "/product/delete?sku=PROD002".to_string(),
    ] {
        let (_, json) = send(
            &h.app,
            Request::builder()
                .method(Method::DELETE)
                .uri(uri.as_str())
                .body(Body::empty())
                .expect("request"),
        )
        .await;
        assert_eq!(json, json!(true), "{uri}");
    }
    assert!(h.store.is_empty());
}

// -------------------------------------------------------------------------
// Health, CORS, request id
// -------------------------------------------------------------------------

#[tokio::test]
async fn health_reports_store_state() {
    let h = harness();

    let (status, json) = send(&h.app, get_request("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"], json!({"status": "ok", "database": "ok"}));
    assert!(json["meta"]["request_id"].is_string());

    h.store.fail_next_call();
    let (status, json) = send(&h.app, get_request("/health")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json["data"]["database"], "unavailable");
}

#[tokio::test]
async fn cors_allows_configured_origins_only() {
    let h = harness();

    let preflight = |origin: &str| {
        Request::builder()
            .method(Method::OPTIONS)
            .uri("/product")
            .header(header::ORIGIN, origin)
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .body(Body::empty())
            .expect("request")
    };

    let response = h
        .app
        .clone()
        .oneshot(preflight(ALLOWED_ORIGIN))
        .await
        .expect("response");
    assert_eq!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .unwrap(),
        ALLOWED_ORIGIN
    );
    let methods = response
        .headers()
        .get(header::ACCESS_CONTROL_ALLOW_METHODS)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(methods.contains("POST"), "{methods}");

    let response = h
        .app
        .clone()
        .oneshot(preflight("http://evil.example"))
        .await
        .expect("response");
    assert!(response
        .headers()
        .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
        .is_none());
}

#[test]
fn api_error_codes_map_to_statuses() {
    for (code, status) in [
        ("validation_error", StatusCode::BAD_REQUEST),
        ("payload_too_large", StatusCode::PAYLOAD_TOO_LARGE),
        ("unsupported_media_type", StatusCode::UNSUPPORTED_MEDIA_TYPE),
        ("internal_error", StatusCode::INTERNAL_SERVER_ERROR),
    ] {
        let response = ApiError::new("req-1", code, "message").into_response();
        assert_eq!(response.status(), status, "{code}");
    }
}
