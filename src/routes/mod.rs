mod addresses;
mod admin;
mod categories;
mod chat;
mod health;
mod invoices;
mod login;
mod products;
mod register;
mod seller;
mod shops;
mod users;
mod vouchers;

use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{delete, get, patch, post},
};

use crate::{
    AppState,
    middleware::{admin_middleware, auth_middleware, seller_middleware},
};

pub fn create_router(state: AppState) -> Router<AppState> {
    Router::new()
        .merge(public_routes())
        .merge(customer_routes(state.clone()))
        .merge(seller_routes(state.clone()))
        .merge(admin_routes(state))
}

fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check))
        .route("/auth/register", post(register::register_user))
        .route("/auth/login", post(login::login_user))
        .route("/categories", get(categories::get_categories))
        .route("/categories/tree", get(categories::get_category_tree))
        .route("/categories/{id}", get(categories::get_category))
        .route("/shops", get(shops::get_shops))
        .route("/shops/{id}", get(shops::get_shop))
        .route("/products", get(products::search_products))
        .route("/products/{id}", get(products::get_product))
        .route("/vouchers/available", get(vouchers::get_available_vouchers))
        .route("/vouchers/check", get(vouchers::check_voucher))
}

fn customer_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/users/me", get(users::get_me).patch(users::update_me))
        .route(
            "/addresses",
            get(addresses::get_addresses).post(addresses::create_address),
        )
        .route(
            "/addresses/{id}",
            get(addresses::get_address)
                .patch(addresses::update_address)
                .delete(addresses::delete_address),
        )
        .route("/shops", post(shops::open_shop))
        .route(
            "/shops/me",
            get(shops::get_my_shop).patch(shops::update_my_shop),
        )
        .route("/invoices/checkout", post(invoices::checkout))
        .route("/invoices", get(invoices::get_my_invoices))
        .route("/invoices/{id}", get(invoices::get_invoice))
        .route("/invoices/{id}/cancel", patch(invoices::cancel_invoice))
        .route(
            "/chat/conversations",
            get(chat::list_conversations).post(chat::open_conversation),
        )
        .route(
            "/chat/conversations/{id}/messages",
            get(chat::get_messages).post(chat::send_message),
        )
        .route("/chat/conversations/{id}/read", post(chat::mark_read))
        .route("/chat/conversations/{id}/ws", get(chat::chat_socket))
        .route_layer(from_fn_with_state(state, auth_middleware))
}

fn seller_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/seller/products",
            get(seller::get_products).post(seller::create_product),
        )
        .route(
            "/seller/products/{id}",
            patch(seller::update_product).delete(seller::delete_product),
        )
        .route(
            "/seller/vouchers",
            get(seller::get_vouchers).post(seller::create_voucher),
        )
        .route(
            "/seller/vouchers/{id}",
            patch(seller::update_voucher).delete(seller::delete_voucher),
        )
        .route("/seller/invoices", get(seller::get_invoices))
        .route(
            "/seller/invoices/{id}/status",
            patch(seller::update_invoice_status),
        )
        .route_layer(from_fn_with_state(state, seller_middleware))
}

fn admin_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/admin/users", get(admin::search_users))
        .route(
            "/admin/users/{id}",
            patch(admin::update_user).delete(admin::delete_user),
        )
        .route("/admin/categories", post(admin::create_category))
        .route(
            "/admin/categories/{id}",
            patch(admin::update_category).delete(admin::delete_category),
        )
        .route("/admin/shops/{id}", delete(admin::delete_shop))
        .route(
            "/admin/vouchers",
            get(admin::get_vouchers).post(admin::create_voucher),
        )
        .route(
            "/admin/vouchers/{id}",
            patch(admin::update_voucher).delete(admin::delete_voucher),
        )
        .route("/admin/invoices", get(admin::get_all_invoices))
        .route(
            "/admin/invoices/{id}/status",
            patch(admin::update_invoice_status),
        )
        .route_layer(from_fn_with_state(state, admin_middleware))
}
