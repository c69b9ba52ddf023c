//! HTTP server for the kitchen inventory API
//!
//! JSON in, JSON out. Handlers open a scoped database connection per
//! request; multi-statement mutations run inside repository-level
//! transactions. Uploaded images are served back as static files.

use axum::{
    extract::{DefaultBodyLimit, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{delete, get, post, put},
    Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

use crate::database::Database;
use crate::error::AppError;
use crate::history::{self, Snapshot};
use crate::image_store::ImageStore;
use crate::openfoodfacts::{is_valid_ean, LookupClient, LookupError};
use crate::products::{self, BatchRequest, DuplicateCheck, Product, ProductInput};
use crate::shopping_list::{self, ShoppingItem, ShoppingItemInput};
use crate::stats::{self, AdvancedStatistics, Statistics};

/// Maximum request body size (inline image payloads included)
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub images: Arc<ImageStore>,
    pub lookup: Arc<LookupClient>,
}

// ── Products ─────────────────────────────────────────────────────────

/// GET /products
async fn list_products(State(state): State<AppState>) -> Result<Json<Vec<Product>>, AppError> {
    let conn = state.db.open()?;
    Ok(Json(products::list(&conn)?))
}

/// POST /products
async fn create_product(
    State(state): State<AppState>,
    Json(input): Json<ProductInput>,
) -> Result<Response, AppError> {
    let mut conn = state.db.open()?;
    let id = products::create(&mut conn, &state.images, &input)?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "id": id, "message": "Product created" })),
    )
        .into_response())
}

/// PUT /products/{id}
async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<ProductInput>,
) -> Result<Json<serde_json::Value>, AppError> {
    let mut conn = state.db.open()?;
    products::update(&mut conn, &state.images, id, &input)?;
    Ok(Json(json!({ "message": "Product updated" })))
}

/// DELETE /products/{id}
async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, AppError> {
    let mut conn = state.db.open()?;
    products::delete(&mut conn, &state.images, id)?;
    Ok(Json(json!({ "message": "Product deleted" })))
}

/// POST /products/batch
async fn batch_products(
    State(state): State<AppState>,
    Json(request): Json<BatchRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let conn = state.db.open()?;
    let count = products::batch(&conn, &request)?;
    Ok(Json(json!({ "message": format!("{} products updated", count) })))
}

/// Duplicate check request body
#[derive(Debug, Deserialize)]
struct DuplicateRequest {
    ean: Option<String>,
    name: Option<String>,
}

/// POST /products/check-duplicate
async fn check_duplicate(
    State(state): State<AppState>,
    Json(request): Json<DuplicateRequest>,
) -> Result<Json<DuplicateCheck>, AppError> {
    let conn = state.db.open()?;
    let result = products::check_duplicate(
        &conn,
        request.ean.as_deref(),
        request.name.as_deref(),
    )?;
    Ok(Json(result))
}

// ── Statistics ───────────────────────────────────────────────────────

/// GET /statistics
async fn statistics(State(state): State<AppState>) -> Result<Json<Statistics>, AppError> {
    let conn = state.db.open()?;
    Ok(Json(stats::overview(&conn)?))
}

/// GET /statistics/advanced
async fn advanced_statistics(
    State(state): State<AppState>,
) -> Result<Json<AdvancedStatistics>, AppError> {
    let conn = state.db.open()?;
    Ok(Json(stats::advanced(&conn)?))
}

// ── Barcode scan proxy ───────────────────────────────────────────────

/// GET /scan/{ean}
///
/// Proxies the external product database and records the scan in the
/// barcode history. The history write is best-effort: a failure is logged
/// and never fails the lookup response.
async fn scan_product(State(state): State<AppState>, Path(ean): Path<String>) -> Response {
    if !is_valid_ean(&ean) {
        return AppError::Validation("Invalid EAN format".to_string()).into_response();
    }

    match state.lookup.lookup(&ean).await {
        Ok(Some(info)) => {
            let snapshot = Snapshot {
                name: &info.name,
                category: Some(&info.category),
                weight_volume: Some(&info.quantity),
                tags: Some(""),
                is_vegetarian: info.is_vegetarian,
                is_vegan: info.is_vegan,
            };
            let touched = state
                .db
                .open()
                .and_then(|mut conn| history::touch(&mut conn, &ean, &snapshot));
            if let Err(e) = touched {
                log::warn!("History update error: {}", e);
            }

            Json(json!({
                "found": true,
                "name": info.name,
                "image_url": info.image_url,
                "quantity": info.quantity,
                "brands": info.brands,
                "category": info.category,
            }))
            .into_response()
        }
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "found": false, "message": "Product not found in the database" })),
        )
            .into_response(),
        Err(LookupError::Timeout) => (
            StatusCode::GATEWAY_TIMEOUT,
            Json(json!({ "found": false, "error": "The external API request timed out" })),
        )
            .into_response(),
        Err(e @ (LookupError::Unavailable(_) | LookupError::Status(_))) => {
            log::warn!("Barcode lookup failed for {}: {}", ean, e);
            (
                StatusCode::BAD_GATEWAY,
                Json(json!({ "found": false, "error": "Failed to reach the external API" })),
            )
                .into_response()
        }
        Err(e) => {
            log::error!("Unexpected error looking up {}: {}", ean, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "found": false, "error": "An unexpected error occurred" })),
            )
                .into_response()
        }
    }
}

// ── Shopping list ────────────────────────────────────────────────────

/// GET /shopping-list
async fn list_shopping(State(state): State<AppState>) -> Result<Json<Vec<ShoppingItem>>, AppError> {
    let conn = state.db.open()?;
    Ok(Json(shopping_list::list(&conn)?))
}

/// POST /shopping-list
async fn create_shopping(
    State(state): State<AppState>,
    Json(input): Json<ShoppingItemInput>,
) -> Result<Response, AppError> {
    let conn = state.db.open()?;
    shopping_list::create(&conn, &input)?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Item added to shopping list" })),
    )
        .into_response())
}

/// PUT /shopping-list/{id}
async fn update_shopping(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<ShoppingItemInput>,
) -> Result<Json<serde_json::Value>, AppError> {
    let conn = state.db.open()?;
    shopping_list::update(&conn, id, &input)?;
    Ok(Json(json!({ "message": "Item updated" })))
}

/// DELETE /shopping-list/{id}
async fn delete_shopping(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, AppError> {
    let conn = state.db.open()?;
    shopping_list::delete(&conn, id)?;
    Ok(Json(json!({ "message": "Item deleted" })))
}

/// DELETE /shopping-list/clear-checked
async fn clear_checked(State(state): State<AppState>) -> Result<Json<serde_json::Value>, AppError> {
    let conn = state.db.open()?;
    shopping_list::clear_checked(&conn)?;
    Ok(Json(json!({ "message": "Checked items cleared" })))
}

/// POST /shopping-list/generate
async fn generate_shopping(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    let mut conn = state.db.open()?;
    let count = shopping_list::generate(&mut conn)?;
    Ok(Json(json!({
        "message": format!("{} items added to shopping list", count),
        "count": count,
    })))
}

// ── Barcode history ──────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct HistoryParams {
    #[serde(default = "default_history_limit")]
    limit: i64,
}

fn default_history_limit() -> i64 {
    10
}

/// GET /barcode-history?limit=N
async fn barcode_history(
    State(state): State<AppState>,
    Query(params): Query<HistoryParams>,
) -> Result<Json<Vec<history::BarcodeHistoryEntry>>, AppError> {
    let conn = state.db.open()?;
    Ok(Json(history::list(&conn, params.limit)?))
}

// ── Router / server ──────────────────────────────────────────────────

/// Build the API router.
pub fn create_router(state: AppState) -> Router {
    let uploads_dir = state.images.uploads_dir().to_path_buf();

    Router::new()
        .route("/products", get(list_products).post(create_product))
        .route("/products/batch", post(batch_products))
        .route("/products/check-duplicate", post(check_duplicate))
        .route("/products/{id}", put(update_product).delete(delete_product))
        .route("/statistics", get(statistics))
        .route("/statistics/advanced", get(advanced_statistics))
        .route("/scan/{ean}", get(scan_product))
        .route("/shopping-list", get(list_shopping).post(create_shopping))
        .route("/shopping-list/clear-checked", delete(clear_checked))
        .route("/shopping-list/generate", post(generate_shopping))
        .route(
            "/shopping-list/{id}",
            put(update_shopping).delete(delete_shopping),
        )
        .route("/barcode-history", get(barcode_history))
        .nest_service("/static/uploads", ServeDir::new(uploads_dir))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Start the web server (async)
///
/// Binds to 0.0.0.0 (all interfaces) so the app is reachable on the local
/// network; restrict external exposure with firewall rules or port mapping.
pub async fn serve(state: AppState, port: u16) -> Result<(), Box<dyn std::error::Error>> {
    let app = create_router(state);
    let addr = format!("0.0.0.0:{}", port);

    log::info!("Kitchen inventory API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for shutdown signal: {}", e);
    }
    log::info!("Shutting down");
}
