use crate::{
    error::{AppError, Result},
    models::UserRole,
    utils::jwt::Claims,
};

pub fn extract_user_id(claims: &Claims) -> Result<i32> {
    claims
        .sub
        .parse::<i32>()
        .map_err(|_| AppError::Unauthorized("Unauthorized".to_string()))
}

pub fn is_admin(claims: &Claims) -> bool {
    claims.role == UserRole::Admin
}
