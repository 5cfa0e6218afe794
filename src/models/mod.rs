mod address;
mod category;
mod chat;
mod invoice;
mod product;
mod shop;
mod user;
mod voucher;

pub use address::*;
pub use category::*;
pub use chat::*;
pub use invoice::*;
pub use product::*;
pub use shop::*;
pub use user::*;
pub use voucher::*;
