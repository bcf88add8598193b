//! HTTP handlers

use axum::{extract::{rejection::JsonRejection, Path, State}, http::StatusCode, Json};

use super::auth::{AdminUser, VerifiedUser};
use super::{ApiError, ApiResponse, AppState};
use crate::domain::aggregates::Product;
use crate::service::{AddItemRequest, CartView, UpdateQuantityRequest};

type Reply<T> = Result<(StatusCode, Json<ApiResponse<T>>), ApiError>;

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload.map(|Json(v)| v).map_err(|e| ApiError::bad_request(format!("Invalid request body: {}", e.body_text())))
}

pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "healthy", "service": "storefront-cart"}))
}

pub async fn add_item(State(s): State<AppState>, VerifiedUser(id): VerifiedUser, payload: Result<Json<AddItemRequest>, JsonRejection>) -> Reply<CartView> {
    let req = body(payload)?;
    let cart = s.service.add_item(&id.user_id, req).await.map_err(|e| ApiError::from_cart(e, "Failed to add item to cart"))?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(cart).with_message("Item added to cart successfully"))))
}

pub async fn get_cart(State(s): State<AppState>, VerifiedUser(id): VerifiedUser) -> Reply<CartView> {
    let cart = s.service.get_cart(&id.user_id).await.map_err(|e| ApiError::from_cart(e, "Failed to fetch cart"))?;
    let response = if cart.id.is_none() { ApiResponse::ok(cart).with_message("Cart is empty") } else { ApiResponse::ok(cart) };
    Ok((StatusCode::OK, Json(response)))
}

pub async fn update_quantity(State(s): State<AppState>, VerifiedUser(id): VerifiedUser, payload: Result<Json<UpdateQuantityRequest>, JsonRejection>) -> Reply<CartView> {
    let req = body(payload)?;
    let cart = s.service.update_quantity(&id.user_id, req).await.map_err(|e| ApiError::from_cart(e, "Failed to update cart"))?;
    Ok((StatusCode::OK, Json(ApiResponse::ok(cart).with_message("Cart updated successfully"))))
}

pub async fn remove_item(State(s): State<AppState>, VerifiedUser(id): VerifiedUser, Path(product_id): Path<String>) -> Reply<CartView> {
    let cart = s.service.remove_item(&id.user_id, &product_id).await.map_err(|e| ApiError::from_cart(e, "Failed to remove item from cart"))?;
    Ok((StatusCode::OK, Json(ApiResponse::ok(cart).with_message("Item removed from cart successfully"))))
}

pub async fn clear_cart(State(s): State<AppState>, VerifiedUser(id): VerifiedUser) -> Reply<CartView> {
    let cart = s.service.clear_cart(&id.user_id).await.map_err(|e| ApiError::from_cart(e, "Failed to clear cart"))?;
    Ok((StatusCode::OK, Json(ApiResponse::ok(cart).with_message("Cart cleared successfully"))))
}

pub async fn list_carts(State(s): State<AppState>, AdminUser(_): AdminUser) -> Reply<Vec<CartView>> {
    let carts = s.service.list_all_carts().await.map_err(|e| ApiError::from_cart(e, "Failed to fetch cart data"))?;
    Ok((StatusCode::OK, Json(ApiResponse::list(carts))))
}

pub async fn list_products(State(s): State<AppState>) -> Reply<Vec<Product>> {
    let products = s.service.list_products().await.map_err(|e| ApiError::from_cart(e, "Failed to fetch products"))?;
    Ok((StatusCode::OK, Json(ApiResponse::list(products))))
}

pub async fn get_product(State(s): State<AppState>, Path(id): Path<String>) -> Reply<Product> {
    let product = s.service.get_product(&id).await.map_err(|e| ApiError::from_cart(e, "Failed to fetch product"))?;
    Ok((StatusCode::OK, Json(ApiResponse::ok(product))))
}
