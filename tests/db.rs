//! Runs against a real Postgres. Each test gets a fresh database with the
//! migrations applied; run with `DATABASE_URL=... cargo test -- --ignored`.

mod common;

use axum::http::StatusCode;
use bazaar_back::{
    AppError,
    models::{CreateCategoryRequest, PaymentMethod, UserRole},
    queries::{category_queries, chat_queries, invoice_queries, shop_queries, voucher_queries},
    services::checkout_service::{DraftLine, InvoiceDraft},
};
use rust_decimal::{Decimal, dec};
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use common::{app_with, get, json_request, request, send_to, token_for};

async fn seed_user(pool: &PgPool, email: &str, role: &str) -> i32 {
    sqlx::query_scalar(
        "INSERT INTO users (email, name, password, role)
         VALUES ($1, $1, 'not-a-hash', $2::user_role)
         RETURNING id",
    )
    .bind(email)
    .bind(role)
    .fetch_one(pool)
    .await
    .unwrap()
}

async fn seed_shop(pool: &PgPool, owner_id: i32, name: &str) -> i32 {
    sqlx::query_scalar("INSERT INTO shops (owner_id, name) VALUES ($1, $2) RETURNING id")
        .bind(owner_id)
        .bind(name)
        .fetch_one(pool)
        .await
        .unwrap()
}

async fn seed_category(pool: &PgPool, name: &str, parent_id: Option<i32>) -> i32 {
    sqlx::query_scalar("INSERT INTO categories (name, parent_id) VALUES ($1, $2) RETURNING id")
        .bind(name)
        .bind(parent_id)
        .fetch_one(pool)
        .await
        .unwrap()
}

async fn seed_product(pool: &PgPool, shop_id: i32, category_id: i32, price: Decimal, stock: i32) -> i32 {
    sqlx::query_scalar(
        "INSERT INTO products (shop_id, category_id, name, price, stock)
         VALUES ($1, $2, 'Widget', $3, $4)
         RETURNING id",
    )
    .bind(shop_id)
    .bind(category_id)
    .bind(price)
    .bind(stock)
    .fetch_one(pool)
    .await
    .unwrap()
}

async fn seed_voucher(pool: &PgPool, shop_id: Option<i32>, code: &str, quantity: i32) -> i32 {
    sqlx::query_scalar(
        "INSERT INTO vouchers (shop_id, code, discount_percent, max_discount, quantity, start_at, end_at)
         VALUES ($1, $2, 10, 5, $3, NOW() - INTERVAL '1 day', NOW() + INTERVAL '1 day')
         RETURNING id",
    )
    .bind(shop_id)
    .bind(code)
    .bind(quantity)
    .fetch_one(pool)
    .await
    .unwrap()
}

async fn stock_of(pool: &PgPool, product_id: i32) -> (i32, i32) {
    sqlx::query_as("SELECT stock, sold FROM products WHERE id = $1")
        .bind(product_id)
        .fetch_one(pool)
        .await
        .unwrap()
}

async fn voucher_quantity(pool: &PgPool, voucher_id: i32) -> i32 {
    sqlx::query_scalar("SELECT quantity FROM vouchers WHERE id = $1")
        .bind(voucher_id)
        .fetch_one(pool)
        .await
        .unwrap()
}

async fn invoice_count(pool: &PgPool) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM invoices")
        .fetch_one(pool)
        .await
        .unwrap()
}

fn draft(shop_id: i32, product_id: i32, price: Decimal, quantity: i32, voucher_id: Option<i32>) -> InvoiceDraft {
    let mut draft = InvoiceDraft {
        shop_id,
        lines: vec![DraftLine {
            product_id,
            product_name: "Widget".to_string(),
            price,
            quantity,
        }],
        subtotal: price * Decimal::from(quantity),
        shop_discount: Decimal::ZERO,
        platform_discount: Decimal::ZERO,
        shipping_fee: dec!(30),
        total: Decimal::ZERO,
        shop_voucher_id: None,
        voucher_id,
    };
    draft.compute_total();
    draft
}

async fn checkout(pool: &PgPool, user_id: i32, drafts: &[InvoiceDraft]) -> Result<(), AppError> {
    let address = json!({ "full_name": "Buyer", "street": "1 Main St" });

    invoice_queries::create_checkout(pool, user_id, Uuid::new_v4(), &address, PaymentMethod::Cod, drafts)
        .await
        .map(|_| ())
}

#[sqlx::test]
#[ignore = "needs DATABASE_URL"]
async fn duplicate_category_name_is_a_conflict(pool: PgPool) {
    let admin = token_for(seed_user(&pool, "admin@example.com", "admin").await, UserRole::Admin);
    let body = json!({ "name": "Books" });

    let (status, _) = send_to(
        app_with(pool.clone()),
        json_request("POST", "/admin/categories", Some(&admin), body.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send_to(
        app_with(pool),
        json_request("POST", "/admin/categories", Some(&admin), body),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "Category with name 'Books' already exists");
}

#[sqlx::test]
#[ignore = "needs DATABASE_URL"]
async fn unique_index_violation_surfaces_as_conflict(pool: PgPool) {
    let req = CreateCategoryRequest {
        parent_id: None,
        name: "Toys".to_string(),
        description: None,
        image_url: None,
    };

    category_queries::create_category(&pool, &req).await.unwrap();
    let second = category_queries::create_category(&pool, &req).await;

    assert!(matches!(second, Err(AppError::Conflict(_))));
}

#[sqlx::test]
#[ignore = "needs DATABASE_URL"]
async fn removing_a_category_twice_is_not_found(pool: PgPool) {
    let admin = token_for(seed_user(&pool, "admin@example.com", "admin").await, UserRole::Admin);
    let id = seed_category(&pool, "Garden", None).await;
    let uri = format!("/admin/categories/{}", id);

    let (status, _) = send_to(app_with(pool.clone()), request("DELETE", &uri, Some(&admin))).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send_to(app_with(pool.clone()), request("DELETE", &uri, Some(&admin))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // The name is free again once the old row is gone.
    seed_category(&pool, "Garden", None).await;
}

#[sqlx::test]
#[ignore = "needs DATABASE_URL"]
async fn category_cannot_move_under_its_own_child(pool: PgPool) {
    let admin = token_for(seed_user(&pool, "admin@example.com", "admin").await, UserRole::Admin);
    let parent = seed_category(&pool, "Electronics", None).await;
    let child = seed_category(&pool, "Phones", Some(parent)).await;

    let (status, _) = send_to(
        app_with(pool.clone()),
        json_request(
            "PATCH",
            &format!("/admin/categories/{}", parent),
            Some(&admin),
            json!({ "parent_id": child }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, tree) = send_to(app_with(pool), get("/categories/tree", None)).await;
    assert_eq!(status, StatusCode::OK);
    let roots = &tree["categories"];
    assert_eq!(roots.as_array().map(Vec::len), Some(1));
    assert_eq!(roots[0]["id"], parent);
}

#[sqlx::test]
#[ignore = "needs DATABASE_URL"]
async fn failed_stock_guard_rolls_back_the_whole_checkout(pool: PgPool) {
    let buyer = seed_user(&pool, "buyer@example.com", "customer").await;
    let first_owner = seed_user(&pool, "one@example.com", "seller").await;
    let second_owner = seed_user(&pool, "two@example.com", "seller").await;
    let first_shop = seed_shop(&pool, first_owner, "First").await;
    let second_shop = seed_shop(&pool, second_owner, "Second").await;
    let category = seed_category(&pool, "Misc", None).await;
    let plenty = seed_product(&pool, first_shop, category, dec!(10), 5).await;
    let scarce = seed_product(&pool, second_shop, category, dec!(20), 1).await;
    let voucher = seed_voucher(&pool, None, "SAVE10", 3).await;

    let drafts = [
        draft(first_shop, plenty, dec!(10), 2, Some(voucher)),
        draft(second_shop, scarce, dec!(20), 2, Some(voucher)),
    ];
    let result = checkout(&pool, buyer, &drafts).await;

    assert!(matches!(result, Err(AppError::BadRequest(_))));
    assert_eq!(stock_of(&pool, plenty).await, (5, 0));
    assert_eq!(stock_of(&pool, scarce).await, (1, 0));
    assert_eq!(voucher_quantity(&pool, voucher).await, 3);
    assert_eq!(invoice_count(&pool).await, 0);
}

#[sqlx::test]
#[ignore = "needs DATABASE_URL"]
async fn spent_voucher_releases_reserved_stock(pool: PgPool) {
    let buyer = seed_user(&pool, "buyer@example.com", "customer").await;
    let owner = seed_user(&pool, "owner@example.com", "seller").await;
    let shop = seed_shop(&pool, owner, "Only").await;
    let category = seed_category(&pool, "Misc", None).await;
    let product = seed_product(&pool, shop, category, dec!(10), 5).await;
    let voucher = seed_voucher(&pool, None, "GONE", 0).await;

    let result = checkout(&pool, buyer, &[draft(shop, product, dec!(10), 3, Some(voucher))]).await;

    assert!(matches!(result, Err(AppError::BadRequest(_))));
    assert_eq!(stock_of(&pool, product).await, (5, 0));
    assert_eq!(voucher_quantity(&pool, voucher).await, 0);
    assert_eq!(invoice_count(&pool).await, 0);
}

#[sqlx::test]
#[ignore = "needs DATABASE_URL"]
async fn successful_checkout_reserves_stock_and_spends_voucher_once(pool: PgPool) {
    let buyer = seed_user(&pool, "buyer@example.com", "customer").await;
    let first_owner = seed_user(&pool, "one@example.com", "seller").await;
    let second_owner = seed_user(&pool, "two@example.com", "seller").await;
    let first_shop = seed_shop(&pool, first_owner, "First").await;
    let second_shop = seed_shop(&pool, second_owner, "Second").await;
    let category = seed_category(&pool, "Misc", None).await;
    let a = seed_product(&pool, first_shop, category, dec!(10), 5).await;
    let b = seed_product(&pool, second_shop, category, dec!(20), 2).await;
    let voucher = seed_voucher(&pool, None, "SAVE10", 3).await;

    let drafts = [
        draft(first_shop, a, dec!(10), 2, Some(voucher)),
        draft(second_shop, b, dec!(20), 2, Some(voucher)),
    ];
    checkout(&pool, buyer, &drafts).await.unwrap();

    assert_eq!(stock_of(&pool, a).await, (3, 2));
    assert_eq!(stock_of(&pool, b).await, (0, 2));
    assert_eq!(voucher_quantity(&pool, voucher).await, 2);
    assert_eq!(invoice_count(&pool).await, 2);
}

#[sqlx::test]
#[ignore = "needs DATABASE_URL"]
async fn removed_shop_takes_its_vouchers_and_conversations(pool: PgPool) {
    let customer = seed_user(&pool, "buyer@example.com", "customer").await;
    let owner = seed_user(&pool, "owner@example.com", "seller").await;
    let shop = seed_shop(&pool, owner, "Closing").await;
    let voucher = seed_voucher(&pool, Some(shop), "SHOP10", 3).await;
    let conversation = chat_queries::open_conversation(&pool, customer, shop).await.unwrap();

    let available = voucher_queries::find_available(&pool, Some(shop)).await.unwrap();
    assert_eq!(available.iter().map(|v| v.id).collect::<Vec<_>>(), vec![voucher]);

    assert!(shop_queries::soft_delete_shop(&pool, shop).await.unwrap());
    assert!(!shop_queries::soft_delete_shop(&pool, shop).await.unwrap());

    assert!(voucher_queries::find_available(&pool, Some(shop)).await.unwrap().is_empty());
    assert!(chat_queries::find_participants(&pool, conversation.id).await.unwrap().is_none());
    assert!(chat_queries::list_for_user(&pool, customer).await.unwrap().is_empty());
    assert!(chat_queries::list_for_user(&pool, owner).await.unwrap().is_empty());

    let token = token_for(customer, UserRole::Customer);
    let (status, _) = send_to(
        app_with(pool),
        json_request(
            "POST",
            &format!("/chat/conversations/{}/messages", conversation.id),
            Some(&token),
            json!({ "content": "still there?" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[sqlx::test]
#[ignore = "needs DATABASE_URL"]
async fn voucher_cap_can_be_removed(pool: PgPool) {
    let admin = token_for(seed_user(&pool, "admin@example.com", "admin").await, UserRole::Admin);
    let voucher = seed_voucher(&pool, None, "CAPPED", 3).await;
    let uri = format!("/admin/vouchers/{}", voucher);

    let (status, body) = send_to(
        app_with(pool.clone()),
        json_request("PATCH", &uri, Some(&admin), json!({ "quantity": 4 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["quantity"], 4);
    assert!(!body["max_discount"].is_null());

    let (status, body) = send_to(
        app_with(pool),
        json_request("PATCH", &uri, Some(&admin), json!({ "max_discount": null })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["max_discount"].is_null());
    assert_eq!(body["quantity"], 4);
}
