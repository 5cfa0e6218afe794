use axum::{
    Json,
    extract::{Query, State},
};
use chrono::Utc;

use crate::{
    AppState,
    error::{AppError, Result},
    models::{
        AvailableVoucherQuery, CheckVoucherQuery, CreateVoucherRequest, UpdateVoucherRequest,
        Voucher, VoucherCheckResponse,
    },
    queries::voucher_queries,
    services::voucher_service::{self, VoucherFields},
};

pub async fn get_available_vouchers(
    State(state): State<AppState>,
    Query(params): Query<AvailableVoucherQuery>,
) -> Result<Json<Vec<Voucher>>> {
    let vouchers = voucher_queries::find_available(&state.db, params.shop_id).await?;
    Ok(Json(vouchers))
}

pub async fn check_voucher(
    State(state): State<AppState>,
    Query(params): Query<CheckVoucherQuery>,
) -> Result<Json<VoucherCheckResponse>> {
    let code = voucher_service::normalize_code(&params.code)?;

    let voucher = voucher_queries::find_by_code(&state.db, &code)
        .await?
        .filter(|v| v.shop_id == params.shop_id)
        .ok_or_else(|| AppError::NotFound(format!("Voucher {} not found", code)))?;

    let discount = voucher_service::discount_for(&voucher, params.amount, Utc::now())?;

    Ok(Json(VoucherCheckResponse {
        amount_after_discount: params.amount - discount,
        discount,
        voucher,
    }))
}

/// Shared by the admin (platform) and seller (shop) voucher endpoints.
pub(crate) async fn create_scoped(
    state: &AppState,
    shop_id: Option<i32>,
    payload: CreateVoucherRequest,
) -> Result<Voucher> {
    let fields = VoucherFields {
        discount_percent: payload.discount_percent,
        max_discount: payload.max_discount,
        min_order_value: payload.min_order_value,
        quantity: payload.quantity,
        start_at: payload.start_at,
        end_at: payload.end_at,
    };
    voucher_service::validate_fields(&fields)?;

    let code = match payload.code {
        Some(ref code) => voucher_service::normalize_code(code)?,
        None => voucher_service::generate_code(&mut rand::rng()),
    };

    if voucher_queries::find_by_code(&state.db, &code)
        .await?
        .is_some()
    {
        return Err(AppError::Conflict(format!(
            "Voucher with code '{}' already exists",
            code
        )));
    }

    voucher_queries::create_voucher(
        &state.db,
        shop_id,
        &code,
        payload.description.as_deref(),
        &fields,
    )
    .await
}

pub(crate) async fn update_scoped(
    state: &AppState,
    id: i32,
    shop_id: Option<i32>,
    mut payload: UpdateVoucherRequest,
) -> Result<Voucher> {
    let existing = voucher_queries::find_in_scope(&state.db, id, shop_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Voucher with id {} not found", id)))?;

    let merged = VoucherFields {
        discount_percent: payload.discount_percent.unwrap_or(existing.discount_percent),
        max_discount: payload.max_discount.unwrap_or(existing.max_discount),
        min_order_value: payload.min_order_value.unwrap_or(existing.min_order_value),
        quantity: payload.quantity.unwrap_or(existing.quantity),
        start_at: payload.start_at.unwrap_or(existing.start_at),
        end_at: payload.end_at.unwrap_or(existing.end_at),
    };
    voucher_service::validate_fields(&merged)?;

    if let Some(ref raw) = payload.code {
        let code = voucher_service::normalize_code(raw)?;

        if let Some(other) = voucher_queries::find_by_code(&state.db, &code).await? {
            if other.id != id {
                return Err(AppError::Conflict(format!(
                    "Another voucher with code '{}' already exists",
                    code
                )));
            }
        }

        payload.code = Some(code);
    }

    voucher_queries::update_voucher(&state.db, id, shop_id, &payload)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Voucher with id {} not found", id)))
}

pub(crate) async fn delete_scoped(state: &AppState, id: i32, shop_id: Option<i32>) -> Result<()> {
    if !voucher_queries::soft_delete_voucher(&state.db, id, shop_id).await? {
        return Err(AppError::NotFound(format!(
            "Voucher with id {} not found",
            id
        )));
    }
    Ok(())
}
