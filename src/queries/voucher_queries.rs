use sqlx::PgPool;

use crate::{
    error::Result,
    models::{UpdateVoucherRequest, Voucher},
    services::voucher_service::VoucherFields,
    utils::pagination::{Page, Paginated},
};

// `shop_id IS NOT DISTINCT FROM $n` matches NULL for platform vouchers.

pub async fn find_by_code(pool: &PgPool, code: &str) -> Result<Option<Voucher>> {
    let voucher = sqlx::query_as::<_, Voucher>(
        "SELECT * FROM vouchers WHERE code = $1 AND delete_at IS NULL",
    )
    .bind(code)
    .fetch_optional(pool)
    .await?;

    Ok(voucher)
}

pub async fn find_in_scope(
    pool: &PgPool,
    id: i32,
    shop_id: Option<i32>,
) -> Result<Option<Voucher>> {
    let voucher = sqlx::query_as::<_, Voucher>(
        "SELECT * FROM vouchers
         WHERE id = $1 AND shop_id IS NOT DISTINCT FROM $2 AND delete_at IS NULL",
    )
    .bind(id)
    .bind(shop_id)
    .fetch_optional(pool)
    .await?;

    Ok(voucher)
}

pub async fn find_paginated(
    pool: &PgPool,
    shop_id: Option<i32>,
    page: Page,
) -> Result<Paginated<Voucher>> {
    let total: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM vouchers
         WHERE shop_id IS NOT DISTINCT FROM $1 AND delete_at IS NULL",
    )
    .bind(shop_id)
    .fetch_one(pool)
    .await?;

    let vouchers = sqlx::query_as::<_, Voucher>(
        "SELECT * FROM vouchers
         WHERE shop_id IS NOT DISTINCT FROM $1 AND delete_at IS NULL
         ORDER BY create_at DESC
         LIMIT $2 OFFSET $3",
    )
    .bind(shop_id)
    .bind(page.limit)
    .bind(page.skip())
    .fetch_all(pool)
    .await?;

    Ok(Paginated::new(vouchers, total, page))
}

/// Vouchers in their validity window with uses left.
pub async fn find_available(pool: &PgPool, shop_id: Option<i32>) -> Result<Vec<Voucher>> {
    let vouchers = sqlx::query_as::<_, Voucher>(
        "SELECT * FROM vouchers
         WHERE shop_id IS NOT DISTINCT FROM $1
           AND delete_at IS NULL
           AND quantity > 0
           AND start_at <= NOW() AND end_at > NOW()
         ORDER BY end_at ASC",
    )
    .bind(shop_id)
    .fetch_all(pool)
    .await?;

    Ok(vouchers)
}

pub async fn create_voucher(
    pool: &PgPool,
    shop_id: Option<i32>,
    code: &str,
    description: Option<&str>,
    fields: &VoucherFields,
) -> Result<Voucher> {
    let voucher = sqlx::query_as::<_, Voucher>(
        r#"
        INSERT INTO vouchers (
            shop_id, code, description, discount_percent, max_discount,
            min_order_value, quantity, start_at, end_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING *
        "#,
    )
    .bind(shop_id)
    .bind(code)
    .bind(description)
    .bind(fields.discount_percent)
    .bind(fields.max_discount)
    .bind(fields.min_order_value)
    .bind(fields.quantity)
    .bind(fields.start_at)
    .bind(fields.end_at)
    .fetch_one(pool)
    .await?;

    Ok(voucher)
}

/// `code` is expected to be normalized already when present.
pub async fn update_voucher(
    pool: &PgPool,
    id: i32,
    shop_id: Option<i32>,
    req: &UpdateVoucherRequest,
) -> Result<Option<Voucher>> {
    let voucher = sqlx::query_as::<_, Voucher>(
        r#"
        UPDATE vouchers
        SET
            code = COALESCE($1, code),
            description = COALESCE($2, description),
            discount_percent = COALESCE($3, discount_percent),
            max_discount = CASE WHEN $11 THEN $4 ELSE max_discount END,
            min_order_value = COALESCE($5, min_order_value),
            quantity = COALESCE($6, quantity),
            start_at = COALESCE($7, start_at),
            end_at = COALESCE($8, end_at),
            update_at = NOW()
        WHERE id = $9 AND shop_id IS NOT DISTINCT FROM $10 AND delete_at IS NULL
        RETURNING *
        "#,
    )
    .bind(&req.code)
    .bind(&req.description)
    .bind(req.discount_percent)
    .bind(req.max_discount.flatten())
    .bind(req.min_order_value)
    .bind(req.quantity)
    .bind(req.start_at)
    .bind(req.end_at)
    .bind(id)
    .bind(shop_id)
    .bind(req.max_discount.is_some())
    .fetch_optional(pool)
    .await?;

    Ok(voucher)
}

pub async fn soft_delete_voucher(pool: &PgPool, id: i32, shop_id: Option<i32>) -> Result<bool> {
    let result = sqlx::query(
        "UPDATE vouchers SET delete_at = NOW()
         WHERE id = $1 AND shop_id IS NOT DISTINCT FROM $2 AND delete_at IS NULL",
    )
    .bind(id)
    .bind(shop_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}
