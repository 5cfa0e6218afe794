use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};

use http::StatusCode;

use crate::{
    AppState,
    error::{AppError, Result},
    models::{
        AdminUpdateUserRequest, Category, CreateCategoryRequest, CreateVoucherRequest, Invoice,
        InvoiceQuery, InvoiceResponse, UpdateCategoryRequest, UpdateInvoiceStatusRequest,
        UpdateVoucherRequest, User, UserQuery, Voucher, VoucherQuery,
    },
    queries::{
        category_queries, invoice_queries, invoice_queries::InvoiceFilter, shop_queries,
        user_queries, voucher_queries,
    },
    routes::{invoices, vouchers},
    utils::{extractors::extract_user_id, jwt::Claims, pagination::Paginated},
};

//USER ROUTES
pub async fn search_users(
    State(state): State<AppState>,
    Query(params): Query<UserQuery>,
) -> Result<Json<Paginated<User>>> {
    let response = user_queries::search_users(&state.db, &params).await?;

    Ok(Json(response))
}

pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<AdminUpdateUserRequest>,
) -> Result<Json<User>> {
    if let Some(ref name) = payload.name {
        if name.trim().is_empty() {
            return Err(AppError::BadRequest("Name cannot be empty".to_string()));
        }
    }

    let user = user_queries::admin_update_user(&state.db, id, &payload)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))?;

    Ok(Json(user))
}

pub async fn delete_user(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i32>,
) -> Result<StatusCode> {
    if extract_user_id(&claims)? == id {
        return Err(AppError::BadRequest(
            "Admins cannot delete their own account".to_string(),
        ));
    }

    if !user_queries::soft_delete_user(&state.db, id).await? {
        return Err(AppError::NotFound(format!("User with id {} not found", id)));
    }

    Ok(StatusCode::NO_CONTENT)
}

//CATEGORY ROUTES
pub async fn create_category(
    State(state): State<AppState>,
    Json(payload): Json<CreateCategoryRequest>,
) -> Result<Json<Category>> {
    let name = payload.name.trim();
    if name.is_empty() {
        return Err(AppError::BadRequest("Category name is required".to_string()));
    }

    if category_queries::find_by_name(&state.db, name)
        .await?
        .is_some()
    {
        return Err(AppError::Conflict(format!(
            "Category with name '{}' already exists",
            name
        )));
    }

    if let Some(parent_id) = payload.parent_id {
        if category_queries::find_by_id(&state.db, parent_id)
            .await?
            .is_none()
        {
            return Err(AppError::NotFound(format!(
                "Parent category with id {} not found",
                parent_id
            )));
        }
    }

    let category = category_queries::create_category(&state.db, &payload).await?;
    Ok(Json(category))
}

pub async fn update_category(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateCategoryRequest>,
) -> Result<Json<Category>> {
    if category_queries::find_by_id(&state.db, id).await?.is_none() {
        return Err(AppError::NotFound(format!(
            "Category with id {} not found",
            id
        )));
    }

    if let Some(ref new_name) = payload.name {
        let new_name = new_name.trim();
        if new_name.is_empty() {
            return Err(AppError::BadRequest("Category name is required".to_string()));
        }

        if let Some(existing) = category_queries::find_by_name(&state.db, new_name).await? {
            if existing.id != id {
                return Err(AppError::Conflict(format!(
                    "Another category with name '{}' already exists",
                    new_name
                )));
            }
        }
    }

    if let Some(parent_id) = payload.parent_id {
        if parent_id == id {
            return Err(AppError::BadRequest(
                "Category cannot be its own parent".to_string(),
            ));
        }
        if category_queries::find_by_id(&state.db, parent_id)
            .await?
            .is_none()
        {
            return Err(AppError::NotFound(format!(
                "Parent category with id {} not found",
                parent_id
            )));
        }

        let categories = category_queries::get_all(&state.db).await?;
        if category_queries::would_create_cycle(id, parent_id, &categories) {
            return Err(AppError::BadRequest(
                "Category cannot be moved under one of its descendants".to_string(),
            ));
        }
    }

    let category = category_queries::update_category(&state.db, id, payload)
        .await?
        .ok_or(AppError::NotFound(format!(
            "Category with id {} not found",
            id
        )))?;

    Ok(Json(category))
}

pub async fn delete_category(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode> {
    if !category_queries::soft_delete_category(&state.db, id).await? {
        return Err(AppError::NotFound(format!(
            "Category with id {} not found",
            id
        )));
    }

    Ok(StatusCode::NO_CONTENT)
}

//SHOP ROUTES
pub async fn delete_shop(State(state): State<AppState>, Path(id): Path<i32>) -> Result<StatusCode> {
    if !shop_queries::soft_delete_shop(&state.db, id).await? {
        return Err(AppError::NotFound(format!("Shop with id {} not found", id)));
    }

    tracing::info!("Shop {} removed with its products, vouchers and conversations", id);

    Ok(StatusCode::NO_CONTENT)
}

//VOUCHER ROUTES
pub async fn get_vouchers(
    State(state): State<AppState>,
    Query(params): Query<VoucherQuery>,
) -> Result<Json<Paginated<Voucher>>> {
    let vouchers = voucher_queries::find_paginated(&state.db, None, params.page()).await?;
    Ok(Json(vouchers))
}

pub async fn create_voucher(
    State(state): State<AppState>,
    Json(payload): Json<CreateVoucherRequest>,
) -> Result<Json<Voucher>> {
    let voucher = vouchers::create_scoped(&state, None, payload).await?;
    Ok(Json(voucher))
}

pub async fn update_voucher(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateVoucherRequest>,
) -> Result<Json<Voucher>> {
    let voucher = vouchers::update_scoped(&state, id, None, payload).await?;
    Ok(Json(voucher))
}

pub async fn delete_voucher(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode> {
    vouchers::delete_scoped(&state, id, None).await?;
    Ok(StatusCode::NO_CONTENT)
}

//INVOICE ROUTES
pub async fn get_all_invoices(
    State(state): State<AppState>,
    Query(params): Query<InvoiceQuery>,
) -> Result<Json<Paginated<InvoiceResponse>>> {
    let filter = InvoiceFilter {
        user_id: None,
        shop_id: params.shop_id,
        status: params.status,
    };

    let invoices = invoice_queries::find_paginated(&state.db, filter, params.page()).await?;

    Ok(Json(invoices))
}

pub async fn update_invoice_status(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateInvoiceStatusRequest>,
) -> Result<Json<Invoice>> {
    let invoice = invoices::find_invoice(&state, id).await?;
    let invoice = invoices::change_status(&state, invoice, payload.status).await?;

    Ok(Json(invoice))
}
