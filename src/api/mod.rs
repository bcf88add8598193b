//! HTTP surface: router, response envelope and error mapping

use axum::{http::StatusCode, response::{IntoResponse, Response}, routing::{delete, get, post, put}, Json, Router};
use serde::Serialize;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::service::CartService;
use crate::CartError;

pub mod auth;
pub mod handlers;

pub use auth::{DenyAll, Identity, IdentityVerifier, JwtVerifier};

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<CartService>,
    pub verifier: Arc<dyn IdentityVerifier>,
}

/// `{success, message?, count?, data?, error?}` on every response.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self { Self { success: true, message: None, count: None, data: Some(data), error: None } }

    pub fn with_message(mut self, message: impl Into<String>) -> Self { self.message = Some(message.into()); self }
}

impl<T> ApiResponse<Vec<T>> {
    pub fn list(data: Vec<T>) -> Self {
        let count = data.len();
        Self { count: Some(count), ..Self::ok(data) }
    }
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
    error: Option<String>,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self { Self { status, message: message.into(), error: None } }
    pub fn bad_request(message: impl Into<String>) -> Self { Self::new(StatusCode::BAD_REQUEST, message) }
    pub fn unauthorized(message: impl Into<String>) -> Self { Self::new(StatusCode::UNAUTHORIZED, message) }
    pub fn forbidden(message: impl Into<String>) -> Self { Self::new(StatusCode::FORBIDDEN, message) }

    /// Maps a service failure; `context` is the message used for unexpected failures.
    pub fn from_cart(e: CartError, context: &str) -> Self {
        match e {
            CartError::Validation(m) => Self::bad_request(m),
            e @ (CartError::ProductNotFound | CartError::CartNotFound | CartError::ItemNotFound) => Self::new(StatusCode::NOT_FOUND, e.to_string()),
            CartError::Persistence(e) => {
                tracing::error!(error = %e, "{context}");
                Self { status: StatusCode::INTERNAL_SERVER_ERROR, message: context.to_string(), error: Some(e.to_string()) }
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ApiResponse::<()> { success: false, message: Some(self.message), count: None, data: None, error: self.error };
        (self.status, Json(body)).into_response()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/v1/cart", get(handlers::get_cart))
        .route("/api/v1/cart/add", post(handlers::add_item))
        .route("/api/v1/cart/update", put(handlers::update_quantity))
        .route("/api/v1/cart/remove/:product_id", delete(handlers::remove_item))
        .route("/api/v1/cart/clear", delete(handlers::clear_cart))
        .route("/api/v1/carts", get(handlers::list_carts))
        .route("/api/v1/products", get(handlers::list_products))
        .route("/api/v1/products/:id", get(handlers::get_product))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
