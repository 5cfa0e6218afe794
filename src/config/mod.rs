mod app_config;

pub use app_config::{
    AppConfig, AuthConfig, CheckoutConfig, CorsConfig, DatabaseConfig, ServerConfig,
};
