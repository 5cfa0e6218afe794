use sqlx::PgPool;

use crate::{
    error::Result,
    models::{Address, CreateAddressRequest, UpdateAddressRequest},
    utils::pagination::{Page, Paginated},
};

pub async fn create_address(
    pool: &PgPool,
    user_id: i32,
    req: &CreateAddressRequest,
) -> Result<Address> {
    let mut tx = pool.begin().await?;

    let existing: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM addresses WHERE user_id = $1 AND delete_at IS NULL",
    )
    .bind(user_id)
    .fetch_one(&mut *tx)
    .await?;

    // A user's first address is always the default one.
    let is_default = req.is_default || existing == 0;

    if is_default {
        sqlx::query(
            "UPDATE addresses SET is_default = FALSE, update_at = NOW()
             WHERE user_id = $1 AND is_default AND delete_at IS NULL",
        )
        .bind(user_id)
        .execute(&mut *tx)
        .await?;
    }

    let address = sqlx::query_as::<_, Address>(
        "INSERT INTO addresses (user_id, full_name, phone, province, district, ward, street, is_default)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
         RETURNING *",
    )
    .bind(user_id)
    .bind(&req.full_name)
    .bind(&req.phone)
    .bind(&req.province)
    .bind(&req.district)
    .bind(&req.ward)
    .bind(&req.street)
    .bind(is_default)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(address)
}

pub async fn find_for_user(pool: &PgPool, id: i32, user_id: i32) -> Result<Option<Address>> {
    let address = sqlx::query_as::<_, Address>(
        "SELECT * FROM addresses WHERE id = $1 AND user_id = $2 AND delete_at IS NULL",
    )
    .bind(id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(address)
}

pub async fn find_all_for_user(
    pool: &PgPool,
    user_id: i32,
    page: Page,
) -> Result<Paginated<Address>> {
    let total: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM addresses WHERE user_id = $1 AND delete_at IS NULL",
    )
    .bind(user_id)
    .fetch_one(pool)
    .await?;

    let addresses = sqlx::query_as::<_, Address>(
        "SELECT * FROM addresses WHERE user_id = $1 AND delete_at IS NULL
         ORDER BY is_default DESC, create_at DESC
         LIMIT $2 OFFSET $3",
    )
    .bind(user_id)
    .bind(page.limit)
    .bind(page.skip())
    .fetch_all(pool)
    .await?;

    Ok(Paginated::new(addresses, total, page))
}

pub async fn update_address(
    pool: &PgPool,
    id: i32,
    user_id: i32,
    req: &UpdateAddressRequest,
) -> Result<Option<Address>> {
    let mut tx = pool.begin().await?;

    if req.is_default == Some(true) {
        sqlx::query(
            "UPDATE addresses SET is_default = FALSE, update_at = NOW()
             WHERE user_id = $1 AND id != $2 AND is_default AND delete_at IS NULL",
        )
        .bind(user_id)
        .bind(id)
        .execute(&mut *tx)
        .await?;
    }

    let address = sqlx::query_as::<_, Address>(
        r#"
        UPDATE addresses
        SET
            full_name = COALESCE($1, full_name),
            phone = COALESCE($2, phone),
            province = COALESCE($3, province),
            district = COALESCE($4, district),
            ward = COALESCE($5, ward),
            street = COALESCE($6, street),
            is_default = COALESCE($7, is_default),
            update_at = NOW()
        WHERE id = $8 AND user_id = $9 AND delete_at IS NULL
        RETURNING *
        "#,
    )
    .bind(&req.full_name)
    .bind(&req.phone)
    .bind(&req.province)
    .bind(&req.district)
    .bind(&req.ward)
    .bind(&req.street)
    .bind(req.is_default)
    .bind(id)
    .bind(user_id)
    .fetch_optional(&mut *tx)
    .await?;

    if address.is_none() {
        tx.rollback().await?;
        return Ok(None);
    }

    tx.commit().await?;
    Ok(address)
}

pub async fn soft_delete_address(pool: &PgPool, id: i32, user_id: i32) -> Result<bool> {
    let result = sqlx::query(
        "UPDATE addresses SET delete_at = NOW(), is_default = FALSE
         WHERE id = $1 AND user_id = $2 AND delete_at IS NULL",
    )
    .bind(id)
    .bind(user_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}
