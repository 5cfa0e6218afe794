use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use chrono::Utc;
use uuid::Uuid;

use crate::{
    AppState,
    error::{AppError, Result},
    models::{
        CheckoutRequest, CheckoutResponse, Invoice, InvoiceQuery, InvoiceResponse, InvoiceStatus,
    },
    queries::{
        address_queries, invoice_queries,
        invoice_queries::InvoiceFilter,
        product_queries, shop_queries, voucher_queries,
    },
    services::{checkout_service, voucher_service},
    utils::{
        extractors::{extract_user_id, is_admin},
        jwt::Claims,
        pagination::Paginated,
    },
};

pub async fn checkout(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CheckoutRequest>,
) -> Result<Json<CheckoutResponse>> {
    let user_id = extract_user_id(&claims)?;

    let cart = checkout_service::merge_cart(&payload.items)?;

    let address = address_queries::find_for_user(&state.db, payload.address_id, user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Address not found".to_string()))?;

    let product_ids: Vec<i32> = cart.keys().copied().collect();
    let products = product_queries::find_by_ids(&state.db, &product_ids).await?;

    let mut drafts = checkout_service::split_by_shop(&cart, &products, state.shipping_fee)?;

    for shop_id in payload.shop_vouchers.keys() {
        if !drafts.iter().any(|d| d.shop_id == *shop_id) {
            return Err(AppError::BadRequest(format!(
                "Cart has no items from shop {}",
                shop_id
            )));
        }
    }

    let now = Utc::now();

    for draft in drafts.iter_mut() {
        let Some(raw_code) = payload.shop_vouchers.get(&draft.shop_id) else {
            continue;
        };

        let code = voucher_service::normalize_code(raw_code)?;
        let voucher = voucher_queries::find_by_code(&state.db, &code)
            .await?
            .filter(|v| v.shop_id == Some(draft.shop_id))
            .ok_or_else(|| {
                AppError::BadRequest(format!(
                    "Voucher {} is not valid for shop {}",
                    code, draft.shop_id
                ))
            })?;

        draft.shop_discount = voucher_service::discount_for(&voucher, draft.subtotal, now)?;
        draft.shop_voucher_id = Some(voucher.id);
        draft.compute_total();
    }

    if let Some(ref raw_code) = payload.voucher_code {
        let code = voucher_service::normalize_code(raw_code)?;
        let voucher = voucher_queries::find_by_code(&state.db, &code)
            .await?
            .filter(|v| v.shop_id.is_none())
            .ok_or_else(|| AppError::BadRequest(format!("Voucher {} is not valid", code)))?;

        let eligible = drafts.iter().map(|d| d.after_shop_discount()).sum();
        let discount = voucher_service::discount_for(&voucher, eligible, now)?;

        checkout_service::apply_platform_discount(&mut drafts, discount, voucher.id);
    }

    let address_snapshot = serde_json::to_value(&address)
        .map_err(|e| AppError::InternalError(e.to_string()))?;

    let checkout_id = Uuid::new_v4();

    let invoices = invoice_queries::create_checkout(
        &state.db,
        user_id,
        checkout_id,
        &address_snapshot,
        payload.payment_method,
        &drafts,
    )
    .await?;

    tracing::info!(
        "Checkout {} by user {} created {} invoice(s)",
        checkout_id,
        user_id,
        invoices.len()
    );

    Ok(Json(CheckoutResponse {
        checkout_id,
        invoices,
    }))
}

pub async fn get_my_invoices(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<InvoiceQuery>,
) -> Result<Json<Paginated<InvoiceResponse>>> {
    let user_id = extract_user_id(&claims)?;

    let filter = InvoiceFilter {
        user_id: Some(user_id),
        shop_id: params.shop_id,
        status: params.status,
    };

    let invoices = invoice_queries::find_paginated(&state.db, filter, params.page()).await?;

    Ok(Json(invoices))
}

pub async fn get_invoice(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i32>,
) -> Result<Json<InvoiceResponse>> {
    let user_id = extract_user_id(&claims)?;
    let invoice = find_invoice(&state, id).await?;

    let is_owner = invoice.user_id == user_id;
    let is_seller = match shop_queries::find_by_owner(&state.db, user_id).await? {
        Some(shop) => shop.id == invoice.shop_id,
        None => false,
    };

    // Hide the invoice's existence from anyone not involved in it.
    if !(is_owner || is_seller || is_admin(&claims)) {
        return Err(AppError::NotFound(format!(
            "Invoice with id {} not found",
            id
        )));
    }

    let mut items_map = invoice_queries::get_items_for_invoices(&state.db, &[invoice.id]).await?;
    let items = items_map.remove(&invoice.id).unwrap_or_default();

    Ok(Json(InvoiceResponse { invoice, items }))
}

pub async fn cancel_invoice(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i32>,
) -> Result<Json<Invoice>> {
    let user_id = extract_user_id(&claims)?;
    let invoice = find_invoice(&state, id).await?;

    if invoice.user_id != user_id {
        return Err(AppError::NotFound(format!(
            "Invoice with id {} not found",
            id
        )));
    }

    if invoice.status != InvoiceStatus::Pending {
        return Err(AppError::BadRequest(
            "Only pending invoices can be cancelled".to_string(),
        ));
    }

    let invoice = change_status(&state, invoice, InvoiceStatus::Cancelled).await?;

    Ok(Json(invoice))
}

pub(crate) async fn find_invoice(state: &AppState, id: i32) -> Result<Invoice> {
    invoice_queries::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Invoice with id {} not found", id)))
}

/// Applies a lifecycle transition after checking it is allowed.
pub(crate) async fn change_status(
    state: &AppState,
    invoice: Invoice,
    next: InvoiceStatus,
) -> Result<Invoice> {
    if !invoice.status.can_transition_to(next) {
        return Err(AppError::BadRequest(format!(
            "Cannot change invoice status from {:?} to {:?}",
            invoice.status, next
        )));
    }

    let updated = invoice_queries::update_status(&state.db, invoice.id, invoice.status, next)
        .await?
        .ok_or_else(|| {
            AppError::Conflict("Invoice status was changed concurrently".to_string())
        })?;

    tracing::info!(
        "Invoice {} moved from {:?} to {:?}",
        updated.id,
        invoice.status,
        updated.status
    );

    Ok(updated)
}
