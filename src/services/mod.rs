pub mod chat_hub;
pub mod checkout_service;
pub mod voucher_service;
