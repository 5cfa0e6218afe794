use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
};
use rust_decimal::Decimal;
use sqlx::PgPool;
use tower_http::cors::CorsLayer;

use crate::{
    config::AppConfig,
    database,
    error::{AppError, Result},
    routes,
    services::chat_hub::ChatHub,
};

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub jwt_secret: String,
    pub token_expiry_days: i64,
    pub shipping_fee: Decimal,
    pub chat_hub: ChatHub,
}

impl AppState {
    pub fn new(db: PgPool, config: &AppConfig) -> Self {
        Self {
            db,
            jwt_secret: config.auth.jwt_secret.clone(),
            token_expiry_days: config.auth.token_expiry_days,
            shipping_fee: config.checkout.shipping_fee,
            chat_hub: ChatHub::default(),
        }
    }
}

pub async fn build(config: &AppConfig) -> Result<Router> {
    let pool = database::create_pool(&config.database).await?;
    let state = AppState::new(pool, config);

    router(state, config)
}

pub fn router(state: AppState, config: &AppConfig) -> Result<Router> {
    let allowed_origins: Vec<HeaderValue> = config
        .cors
        .allowed_origins
        .iter()
        .map(|origin| {
            origin
                .parse::<HeaderValue>()
                .map_err(|_| AppError::ConfigError(format!("Invalid CORS origin: {}", origin)))
        })
        .collect::<Result<Vec<_>>>()?;

    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([http::header::CONTENT_TYPE, http::header::AUTHORIZATION])
        .allow_origin(allowed_origins);

    let app = routes::create_router(state.clone())
        .layer(DefaultBodyLimit::max(config.server.max_body_size))
        .layer(cors)
        .with_state(state);

    Ok(app)
}
