use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};

use crate::{
    AppState,
    error::{AppError, Result},
    models::{Address, CreateAddressRequest, UpdateAddressRequest},
    queries::address_queries,
    utils::{
        extractors::extract_user_id,
        jwt::Claims,
        pagination::{PageQuery, Paginated},
    },
};

pub async fn create_address(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateAddressRequest>,
) -> Result<Json<Address>> {
    let user_id = extract_user_id(&claims)?;

    require_non_blank("full_name", &payload.full_name)?;
    require_non_blank("phone", &payload.phone)?;
    require_non_blank("street", &payload.street)?;

    let address = address_queries::create_address(&state.db, user_id, &payload).await?;

    Ok(Json(address))
}

pub async fn get_addresses(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<PageQuery>,
) -> Result<Json<Paginated<Address>>> {
    let user_id = extract_user_id(&claims)?;

    let addresses = address_queries::find_all_for_user(&state.db, user_id, params.into()).await?;

    Ok(Json(addresses))
}

pub async fn get_address(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i32>,
) -> Result<Json<Address>> {
    let user_id = extract_user_id(&claims)?;

    let address = address_queries::find_for_user(&state.db, id, user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Address with id {} not found", id)))?;

    Ok(Json(address))
}

pub async fn update_address(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateAddressRequest>,
) -> Result<Json<Address>> {
    let user_id = extract_user_id(&claims)?;

    for (field, value) in [
        ("full_name", &payload.full_name),
        ("phone", &payload.phone),
        ("street", &payload.street),
    ] {
        if let Some(value) = value {
            require_non_blank(field, value)?;
        }
    }

    let address = address_queries::update_address(&state.db, id, user_id, &payload)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Address with id {} not found", id)))?;

    Ok(Json(address))
}

pub async fn delete_address(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i32>,
) -> Result<StatusCode> {
    let user_id = extract_user_id(&claims)?;

    if !address_queries::soft_delete_address(&state.db, id, user_id).await? {
        return Err(AppError::NotFound(format!(
            "Address with id {} not found",
            id
        )));
    }

    Ok(StatusCode::NO_CONTENT)
}

fn require_non_blank(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(AppError::BadRequest(format!("{} is required", field)));
    }
    Ok(())
}
