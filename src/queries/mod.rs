pub mod address_queries;
pub mod category_queries;
pub mod chat_queries;
pub mod invoice_queries;
pub mod product_queries;
pub mod shop_queries;
pub mod user_queries;
pub mod voucher_queries;
