use std::collections::{BTreeSet, HashMap};

use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    error::{AppError, Result},
    models::{Invoice, InvoiceItem, InvoiceResponse, InvoiceStatus, PaymentMethod},
    services::checkout_service::InvoiceDraft,
    utils::pagination::{Page, Paginated},
};

/// Scope for invoice listings; `None` means unrestricted.
#[derive(Debug, Default, Clone, Copy)]
pub struct InvoiceFilter {
    pub user_id: Option<i32>,
    pub shop_id: Option<i32>,
    pub status: Option<InvoiceStatus>,
}

/// Writes every draft, reserves stock and spends vouchers atomically.
pub async fn create_checkout(
    pool: &PgPool,
    user_id: i32,
    checkout_id: Uuid,
    address_snapshot: &serde_json::Value,
    payment_method: PaymentMethod,
    drafts: &[InvoiceDraft],
) -> Result<Vec<InvoiceResponse>> {
    let mut tx = pool.begin().await?;
    let mut created = Vec::with_capacity(drafts.len());

    for draft in drafts {
        let invoice = sqlx::query_as::<_, Invoice>(
            "INSERT INTO invoices (checkout_id, user_id, shop_id, address_snapshot, payment_method,
             subtotal, shipping_fee, shop_discount, platform_discount, total, shop_voucher_id, voucher_id)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
             RETURNING *",
        )
        .bind(checkout_id)
        .bind(user_id)
        .bind(draft.shop_id)
        .bind(address_snapshot)
        .bind(payment_method)
        .bind(draft.subtotal)
        .bind(draft.shipping_fee)
        .bind(draft.shop_discount)
        .bind(draft.platform_discount)
        .bind(draft.total)
        .bind(draft.shop_voucher_id)
        .bind(draft.voucher_id)
        .fetch_one(&mut *tx)
        .await?;

        let product_ids: Vec<i32> = draft.lines.iter().map(|l| l.product_id).collect();
        let names: Vec<&str> = draft.lines.iter().map(|l| l.product_name.as_str()).collect();
        let prices: Vec<Decimal> = draft.lines.iter().map(|l| l.price).collect();
        let quantities: Vec<i32> = draft.lines.iter().map(|l| l.quantity).collect();

        let items = sqlx::query_as::<_, InvoiceItem>(
            "INSERT INTO invoice_items (invoice_id, product_id, product_name, price, quantity)
             SELECT $1, unnest($2::int[]), unnest($3::varchar[]), unnest($4::numeric[]), unnest($5::int[])
             RETURNING *",
        )
        .bind(invoice.id)
        .bind(&product_ids)
        .bind(&names)
        .bind(&prices)
        .bind(&quantities)
        .fetch_all(&mut *tx)
        .await?;

        for line in &draft.lines {
            let result = sqlx::query(
                "UPDATE products
                 SET stock = stock - $1, sold = sold + $1, update_at = NOW()
                 WHERE id = $2 AND stock >= $1 AND delete_at IS NULL",
            )
            .bind(line.quantity)
            .bind(line.product_id)
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() == 0 {
                tx.rollback().await?;
                return Err(AppError::BadRequest(format!(
                    "Insufficient stock for product {}",
                    line.product_id
                )));
            }
        }

        created.push(InvoiceResponse { invoice, items });
    }

    let voucher_ids: BTreeSet<i32> = drafts
        .iter()
        .flat_map(|d| d.shop_voucher_id.into_iter().chain(d.voucher_id))
        .collect();

    for voucher_id in voucher_ids {
        let result = sqlx::query(
            "UPDATE vouchers SET quantity = quantity - 1, update_at = NOW()
             WHERE id = $1 AND quantity > 0 AND delete_at IS NULL",
        )
        .bind(voucher_id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(AppError::BadRequest(
                "Voucher is no longer available".to_string(),
            ));
        }
    }

    tx.commit().await?;
    Ok(created)
}

pub async fn find_by_id(pool: &PgPool, id: i32) -> Result<Option<Invoice>> {
    let invoice = sqlx::query_as::<_, Invoice>(
        "SELECT * FROM invoices WHERE id = $1 AND delete_at IS NULL",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(invoice)
}

pub async fn get_items_for_invoices(
    pool: &PgPool,
    invoice_ids: &[i32],
) -> Result<HashMap<i32, Vec<InvoiceItem>>> {
    if invoice_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let items = sqlx::query_as::<_, InvoiceItem>(
        "SELECT * FROM invoice_items WHERE invoice_id = ANY($1) ORDER BY id ASC",
    )
    .bind(invoice_ids)
    .fetch_all(pool)
    .await?;

    let mut items_map: HashMap<i32, Vec<InvoiceItem>> = HashMap::new();
    for item in items {
        items_map.entry(item.invoice_id).or_default().push(item);
    }

    Ok(items_map)
}

fn push_invoice_filters(query: &mut QueryBuilder<'_, Postgres>, filter: InvoiceFilter) {
    query.push(" WHERE delete_at IS NULL");

    if let Some(user_id) = filter.user_id {
        query.push(" AND user_id = ");
        query.push_bind(user_id);
    }

    if let Some(shop_id) = filter.shop_id {
        query.push(" AND shop_id = ");
        query.push_bind(shop_id);
    }

    if let Some(status) = filter.status {
        query.push(" AND status = ");
        query.push_bind(status);
    }
}

pub async fn find_paginated(
    pool: &PgPool,
    filter: InvoiceFilter,
    page: Page,
) -> Result<Paginated<InvoiceResponse>> {
    let mut count_query: QueryBuilder<Postgres> =
        QueryBuilder::new("SELECT COUNT(*) FROM invoices");
    push_invoice_filters(&mut count_query, filter);
    let total = count_query
        .build_query_scalar::<i64>()
        .fetch_one(pool)
        .await?;

    let mut query: QueryBuilder<Postgres> = QueryBuilder::new("SELECT * FROM invoices");
    push_invoice_filters(&mut query, filter);
    query.push(" ORDER BY create_at DESC, id DESC LIMIT ");
    query.push_bind(page.limit);
    query.push(" OFFSET ");
    query.push_bind(page.skip());

    let invoices = query.build_query_as::<Invoice>().fetch_all(pool).await?;

    let invoice_ids: Vec<i32> = invoices.iter().map(|i| i.id).collect();
    let mut items_map = get_items_for_invoices(pool, &invoice_ids).await?;

    let data = invoices
        .into_iter()
        .map(|invoice| {
            let items = items_map.remove(&invoice.id).unwrap_or_default();
            InvoiceResponse { invoice, items }
        })
        .collect();

    Ok(Paginated::new(data, total, page))
}

/// Moves an invoice from `from` to `to`; cancelling puts the stock back.
/// Returns `None` when the invoice is no longer in `from`.
pub async fn update_status(
    pool: &PgPool,
    id: i32,
    from: InvoiceStatus,
    to: InvoiceStatus,
) -> Result<Option<Invoice>> {
    let mut tx = pool.begin().await?;

    // Guarding on the current status keeps concurrent updates from double-applying.
    let invoice = sqlx::query_as::<_, Invoice>(
        "UPDATE invoices SET status = $1, update_at = NOW()
         WHERE id = $2 AND status = $3 AND delete_at IS NULL
         RETURNING *",
    )
    .bind(to)
    .bind(id)
    .bind(from)
    .fetch_optional(&mut *tx)
    .await?;

    let Some(invoice) = invoice else {
        tx.rollback().await?;
        return Ok(None);
    };

    if to == InvoiceStatus::Cancelled {
        sqlx::query(
            "UPDATE products p
             SET stock = p.stock + ii.quantity,
                 sold = GREATEST(p.sold - ii.quantity, 0),
                 update_at = NOW()
             FROM invoice_items ii
             WHERE ii.invoice_id = $1 AND p.id = ii.product_id",
        )
        .bind(invoice.id)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(Some(invoice))
}
