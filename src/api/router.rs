//! API router.
//!
//! Returns a composable `Router`; routes are nested under `/api/`.
//!
//! Layers (outermost → innermost):
//! 1. CORS → 2. Access log → 3. Body limit → handler

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::services::ServeDir;

use crate::api::endpoints;
use crate::api::middleware;
use crate::api::types::{ApiContext, HttpSettings};
use crate::core_state::ServiceContext;

/// Room for multipart boundaries and headers on top of the photo itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

pub fn api_router(core: Arc<ServiceContext>, settings: &HttpSettings) -> Router {
    let ctx = ApiContext::new(core, settings.max_upload_bytes);

    // NOTE: Path params use `:param` syntax (matchit 0.7 / axum 0.7).
    let api = Router::new()
        .route("/scan", post(endpoints::scan::scan))
        .route("/manual-add", post(endpoints::manual::add))
        .route("/inventory", get(endpoints::inventory::list))
        .route("/inventory/:id/status", post(endpoints::inventory::update_status))
        .route("/health", get(endpoints::health::check))
        .with_state(ctx)
        .layer(DefaultBodyLimit::max(
            settings.max_upload_bytes.saturating_add(MULTIPART_OVERHEAD),
        ));

    let mut app = Router::new().nest("/api", api);
    if let Some(dir) = &settings.photo_dir {
        app = app.nest_service("/uploads", ServeDir::new(dir));
    }

    app.layer(axum::middleware::from_fn(middleware::access_log::log_access))
        .layer(cors_layer(&settings.cors_origins))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    if origins.iter().any(|o| o == "*") {
        return base.allow_origin(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %o, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    base.allow_origin(AllowOrigin::list(allowed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use chrono::{TimeZone, Utc};
    use tower::ServiceExt;

    use crate::inference::engine::MockClassifier;
    use crate::inference::preprocess::tests::jpeg_bytes;
    use crate::inference::{Classifier, ClassifierWeights, InferenceEngine};
    use crate::models::{FoodClass, Label};
    use crate::pipeline::{FixedClock, RetryPolicy};
    use crate::storage::{
        InventoryStore, LocalPhotoStore, MemoryInventoryStore, MockFailure, MockPhotoStore,
    };

    const BOUNDARY: &str = "X-FRIDGE-TEST-BOUNDARY";

    struct TestApp {
        router: Router,
        photos: Arc<MockPhotoStore>,
        inventory: Arc<MemoryInventoryStore>,
    }

    fn test_app_with(label: Label, photos: MockPhotoStore, settings: HttpSettings) -> TestApp {
        let photos = Arc::new(photos);
        let inventory = Arc::new(MemoryInventoryStore::new());
        let core = ServiceContext::new(
            Arc::new(MockClassifier::new(label)),
            photos.clone(),
            inventory.clone(),
        )
        .with_retry(RetryPolicy::none())
        .with_clock(Arc::new(FixedClock(
            Utc.with_ymd_and_hms(2025, 3, 14, 9, 26, 53).unwrap(),
        )));
        TestApp {
            router: api_router(Arc::new(core), &settings),
            photos,
            inventory,
        }
    }

    fn test_app(label: Label) -> TestApp {
        test_app_with(label, MockPhotoStore::new(), HttpSettings::default())
    }

    fn multipart_request(field: &str, file_name: &str, bytes: &[u8]) -> Request<Body> {
        let mut body = Vec::new();
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(b"Content-Type: image/jpeg\r\n\r\n");
        body.extend_from_slice(bytes);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        Request::builder()
            .method("POST")
            .uri("/api/scan")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    fn json_request(method: &str, uri: &str, json: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap()
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn send(router: &Router, req: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = router.clone().oneshot(req).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), 1024 * 1024).await.unwrap();
        let json = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
        (status, json)
    }

    #[tokio::test]
    async fn scan_returns_stored_item() {
        let app = test_app(Label::Food(FoodClass::Tomato));
        let (status, json) = send(&app.router, multipart_request("file", "photo.jpg", &jpeg_bytes())).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "success");
        assert_eq!(json["message"], "Successfully added tomato");
        assert_eq!(json["item"]["name"], "tomato");
        assert_eq!(json["item"]["status"], "in_fridge");
        assert_eq!(json["item"]["date_placed"], "2025-03-14T09:26:53.000000Z");
        assert_eq!(json["item"]["expiration_date"], json["item"]["date_placed"]);
        assert!(!json["item"]["image"]["url"].as_str().unwrap().is_empty());
        assert!(json["item"]["_id"].is_string());
    }

    #[tokio::test]
    async fn scan_without_file_field_is_400_no_file_part() {
        let app = test_app(Label::Food(FoodClass::Tomato));
        let (status, json) = send(&app.router, multipart_request("photo", "a.jpg", b"abc")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "No file part");
        assert!(app.photos.uploads().is_empty());
    }

    #[tokio::test]
    async fn scan_with_non_multipart_body_is_400_json() {
        let app = test_app(Label::Food(FoodClass::Tomato));
        let (status, json) = send(
            &app.router,
            json_request("POST", "/api/scan", serde_json::json!({})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "No file part");
        assert_eq!(json["code"], "NO_FILE_PART");
        assert!(app.photos.uploads().is_empty());

        let bare = Request::builder()
            .method("POST")
            .uri("/api/scan")
            .body(Body::from("{}"))
            .unwrap();
        let (status, json) = send(&app.router, bare).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["code"], "NO_FILE_PART");
    }

    #[tokio::test]
    async fn scan_of_empty_file_is_400_no_selected_file() {
        let app = test_app(Label::Food(FoodClass::Tomato));
        let (status, json) = send(&app.router, multipart_request("file", "empty.jpg", b"")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "No selected file");
        assert!(app.photos.uploads().is_empty());
        assert_eq!(app.inventory.insert_calls(), 0);
    }

    #[tokio::test]
    async fn scan_with_empty_file_name_is_400_no_selected_file() {
        let app = test_app(Label::Food(FoodClass::Tomato));
        let (status, json) = send(&app.router, multipart_request("file", "", b"bytes")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["code"], "NO_SELECTED_FILE");
    }

    #[tokio::test]
    async fn scan_of_non_image_still_stores_sentinel() {
        let engine = InferenceEngine::from_classifier(Classifier::new(ClassifierWeights::zeros()).unwrap());
        let inventory = Arc::new(MemoryInventoryStore::new());
        let core = ServiceContext::new(Arc::new(engine), Arc::new(MockPhotoStore::new()), inventory.clone())
            .with_retry(RetryPolicy::none());
        let router = api_router(Arc::new(core), &HttpSettings::default());

        let (status, json) = send(&router, multipart_request("file", "notes.jpg", b"plain text")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["item"]["name"], "Analysis Failed");
        assert_eq!(inventory.len(), 1);
    }

    #[tokio::test]
    async fn upload_failure_is_500_and_nothing_persisted() {
        let app = test_app_with(
            Label::Food(FoodClass::Eggs),
            MockPhotoStore::new().fail_uploads([MockFailure::Rejected]),
            HttpSettings::default(),
        );
        let (status, json) = send(&app.router, multipart_request("file", "a.jpg", b"jpeg")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["code"], "UPLOAD_FAILED");
        assert_eq!(json["error"], "Failed to upload image");
        assert_eq!(app.inventory.insert_calls(), 0);
    }

    #[tokio::test]
    async fn permission_failure_is_500_permission_failed() {
        let app = test_app_with(
            Label::Food(FoodClass::Eggs),
            MockPhotoStore::new().fail_make_public([MockFailure::Rejected]),
            HttpSettings::default(),
        );
        let (status, json) = send(&app.router, multipart_request("file", "a.jpg", b"jpeg")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["code"], "PERMISSION_FAILED");
    }

    #[tokio::test]
    async fn oversized_upload_is_413() {
        let settings = HttpSettings {
            max_upload_bytes: 16,
            ..HttpSettings::default()
        };
        let app = test_app_with(Label::Food(FoodClass::Eggs), MockPhotoStore::new(), settings);
        let (status, json) = send(&app.router, multipart_request("file", "big.jpg", &[0xAB; 64])).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(json["code"], "PAYLOAD_TOO_LARGE");
        assert!(app.photos.uploads().is_empty());
    }

    #[tokio::test]
    async fn manual_add_echoes_label_and_stores_nothing() {
        let app = test_app(Label::Food(FoodClass::Eggs));
        let (status, json) = send(
            &app.router,
            json_request("POST", "/api/manual-add", serde_json::json!({"label": "milk"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "success");
        assert_eq!(json["message"], "Manually added milk");
        assert_eq!(json["item"], serde_json::json!({"name": "milk"}));

        let (_, listed) = send(&app.router, get_request("/api/inventory")).await;
        assert_eq!(listed, serde_json::json!([]));
    }

    #[tokio::test]
    async fn manual_add_without_label_is_400() {
        let app = test_app(Label::Food(FoodClass::Eggs));
        let (status, json) = send(
            &app.router,
            json_request("POST", "/api/manual-add", serde_json::json!({"name": "milk"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["code"], "BAD_REQUEST");
    }

    #[tokio::test]
    async fn inventory_lists_scanned_items_in_order() {
        let app = test_app(Label::Food(FoodClass::Orange));
        for _ in 0..2 {
            send(&app.router, multipart_request("file", "a.jpg", b"jpeg")).await;
        }
        let (status, json) = send(&app.router, get_request("/api/inventory")).await;
        assert_eq!(status, StatusCode::OK);
        let items = json.as_array().unwrap();
        assert_eq!(items.len(), 2);
        assert!(items.iter().all(|i| i["name"] == "orange"));
    }

    #[tokio::test]
    async fn inventory_filters_by_status_query() {
        let app = test_app(Label::Food(FoodClass::Orange));
        let (_, scanned) = send(&app.router, multipart_request("file", "a.jpg", b"jpeg")).await;
        let id = scanned["item"]["_id"].as_str().unwrap().to_string();
        app.inventory.update_status(&id, crate::models::ItemStatus::Expired).unwrap();

        let (_, fresh) = send(&app.router, get_request("/api/inventory?status=in_fridge")).await;
        assert_eq!(fresh, serde_json::json!([]));
        let (_, expired) = send(&app.router, get_request("/api/inventory?status=expired&name=orange")).await;
        assert_eq!(expired.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn inventory_rejects_unknown_status_filter() {
        let app = test_app(Label::Food(FoodClass::Orange));
        let (status, _) = send(&app.router, get_request("/api/inventory?status=eaten")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn status_update_changes_item() {
        let app = test_app(Label::Food(FoodClass::Sauce));
        let (_, scanned) = send(&app.router, multipart_request("file", "a.jpg", b"jpeg")).await;
        let id = scanned["item"]["_id"].as_str().unwrap();

        let (status, json) = send(
            &app.router,
            json_request(
                "POST",
                &format!("/api/inventory/{id}/status"),
                serde_json::json!({"status": "removed"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "removed");
        assert_eq!(json["name"], "sauce");
    }

    #[tokio::test]
    async fn status_update_of_unknown_item_is_404() {
        let app = test_app(Label::Food(FoodClass::Sauce));
        let (status, json) = send(
            &app.router,
            json_request("POST", "/api/inventory/missing/status", serde_json::json!({"status": "removed"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn health_reports_model_state() {
        let app = test_app(Label::ModelError);
        let (status, json) = send(&app.router, get_request("/api/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "ok");
        assert_eq!(json["model_loaded"], false);
        assert_eq!(json["version"], crate::config::APP_VERSION);
    }

    #[tokio::test]
    async fn cors_allows_configured_origin() {
        let app = test_app(Label::Food(FoodClass::Soda));
        let req = Request::builder()
            .uri("/api/health")
            .header(header::ORIGIN, "http://localhost:3000")
            .body(Body::empty())
            .unwrap();
        let response = app.router.clone().oneshot(req).await.unwrap();
        assert_eq!(
            response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "http://localhost:3000"
        );
    }

    #[tokio::test]
    async fn local_photos_are_served_under_uploads() {
        let dir = tempfile::tempdir().unwrap();
        let photos = Arc::new(LocalPhotoStore::new(dir.path(), "http://localhost:5000/uploads").unwrap());
        let core = ServiceContext::new(
            Arc::new(MockClassifier::new(Label::Food(FoodClass::Cucumber))),
            photos,
            Arc::new(MemoryInventoryStore::new()),
        );
        let settings = HttpSettings {
            photo_dir: Some(dir.path().to_path_buf()),
            ..HttpSettings::default()
        };
        let router = api_router(Arc::new(core), &settings);

        let (_, scanned) = send(&router, multipart_request("file", "a.jpg", b"JPEGDATA")).await;
        let url = scanned["item"]["image"]["url"].as_str().unwrap();
        let path = url.strip_prefix("http://localhost:5000").unwrap();

        let response = router.clone().oneshot(get_request(path)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), 1024).await.unwrap();
        assert_eq!(&body[..], b"JPEGDATA");
    }
}
