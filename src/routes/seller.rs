use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use rust_decimal::Decimal;

use crate::{
    AppState,
    error::{AppError, Result},
    models::{
        CreateProductRequest, CreateVoucherRequest, Invoice, InvoiceQuery, InvoiceResponse,
        InvoiceStatus, Product, ProductQuery, UpdateInvoiceStatusRequest, UpdateProductRequest,
        UpdateVoucherRequest, Voucher, VoucherQuery,
    },
    queries::{
        category_queries, invoice_queries, invoice_queries::InvoiceFilter, product_queries,
        voucher_queries,
    },
    routes::{invoices, shops::require_own_shop, vouchers},
    utils::{jwt::Claims, pagination::Paginated},
};

//PRODUCT ROUTES
pub async fn get_products(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(mut params): Query<ProductQuery>,
) -> Result<Json<Paginated<Product>>> {
    let shop = require_own_shop(&state, &claims).await?;
    params.shop_id = Some(shop.id);

    let products = product_queries::search_products(&state.db, &params).await?;

    Ok(Json(products))
}

pub async fn create_product(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateProductRequest>,
) -> Result<Json<Product>> {
    let shop = require_own_shop(&state, &claims).await?;

    if payload.name.trim().is_empty() {
        return Err(AppError::BadRequest("name is required".to_string()));
    }
    validate_price_and_stock(Some(payload.price), Some(payload.stock))?;
    ensure_category_exists(&state, payload.category_id).await?;

    let product = product_queries::create_product(&state.db, shop.id, &payload).await?;

    Ok(Json(product))
}

pub async fn update_product(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateProductRequest>,
) -> Result<Json<Product>> {
    let shop = require_own_shop(&state, &claims).await?;

    if let Some(ref name) = payload.name {
        if name.trim().is_empty() {
            return Err(AppError::BadRequest("name cannot be empty".to_string()));
        }
    }
    validate_price_and_stock(payload.price, payload.stock)?;
    if let Some(category_id) = payload.category_id {
        ensure_category_exists(&state, category_id).await?;
    }

    let product = product_queries::update_product(&state.db, id, shop.id, &payload)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Product with id {} not found", id)))?;

    Ok(Json(product))
}

pub async fn delete_product(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i32>,
) -> Result<StatusCode> {
    let shop = require_own_shop(&state, &claims).await?;

    if !product_queries::soft_delete_product(&state.db, id, shop.id).await? {
        return Err(AppError::NotFound(format!(
            "Product with id {} not found",
            id
        )));
    }

    Ok(StatusCode::NO_CONTENT)
}

fn validate_price_and_stock(price: Option<Decimal>, stock: Option<i32>) -> Result<()> {
    if let Some(price) = price {
        if price <= Decimal::ZERO {
            return Err(AppError::BadRequest(
                "price must be greater than 0".to_string(),
            ));
        }
    }

    if let Some(stock) = stock {
        if stock < 0 {
            return Err(AppError::BadRequest("stock cannot be negative".to_string()));
        }
    }

    Ok(())
}

async fn ensure_category_exists(state: &AppState, category_id: i32) -> Result<()> {
    if category_queries::find_by_id(&state.db, category_id)
        .await?
        .is_none()
    {
        return Err(AppError::NotFound(format!(
            "Category with id {} not found",
            category_id
        )));
    }
    Ok(())
}

//VOUCHER ROUTES
pub async fn get_vouchers(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<VoucherQuery>,
) -> Result<Json<Paginated<Voucher>>> {
    let shop = require_own_shop(&state, &claims).await?;
    let vouchers = voucher_queries::find_paginated(&state.db, Some(shop.id), params.page()).await?;
    Ok(Json(vouchers))
}

pub async fn create_voucher(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateVoucherRequest>,
) -> Result<Json<Voucher>> {
    let shop = require_own_shop(&state, &claims).await?;
    let voucher = vouchers::create_scoped(&state, Some(shop.id), payload).await?;
    Ok(Json(voucher))
}

pub async fn update_voucher(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateVoucherRequest>,
) -> Result<Json<Voucher>> {
    let shop = require_own_shop(&state, &claims).await?;
    let voucher = vouchers::update_scoped(&state, id, Some(shop.id), payload).await?;
    Ok(Json(voucher))
}

pub async fn delete_voucher(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i32>,
) -> Result<StatusCode> {
    let shop = require_own_shop(&state, &claims).await?;
    vouchers::delete_scoped(&state, id, Some(shop.id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

//INVOICE ROUTES
pub async fn get_invoices(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<InvoiceQuery>,
) -> Result<Json<Paginated<InvoiceResponse>>> {
    let shop = require_own_shop(&state, &claims).await?;

    let filter = InvoiceFilter {
        user_id: None,
        shop_id: Some(shop.id),
        status: params.status,
    };

    let invoices = invoice_queries::find_paginated(&state.db, filter, params.page()).await?;

    Ok(Json(invoices))
}

pub async fn update_invoice_status(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateInvoiceStatusRequest>,
) -> Result<Json<Invoice>> {
    let shop = require_own_shop(&state, &claims).await?;
    let invoice = invoices::find_invoice(&state, id).await?;

    if invoice.shop_id != shop.id {
        return Err(AppError::NotFound(format!(
            "Invoice with id {} not found",
            id
        )));
    }

    if payload.status == InvoiceStatus::Pending {
        return Err(AppError::BadRequest(
            "Invoices cannot be moved back to pending".to_string(),
        ));
    }

    let invoice = invoices::change_status(&state, invoice, payload.status).await?;

    Ok(Json(invoice))
}
