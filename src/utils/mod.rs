pub mod extractors;
pub mod jwt;
pub mod pagination;
pub mod serde_helpers;
