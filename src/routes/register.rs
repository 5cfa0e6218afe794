use axum::{Json, extract::State};

use crate::{
    AppState,
    error::{AppError, Result},
    models::{AuthResponse, RegisterRequest},
    queries::user_queries,
    utils::jwt,
};

const MIN_PASSWORD_LEN: usize = 8;

pub async fn register_user(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<Json<AuthResponse>> {
    validate_registration(&payload)?;

    let email = payload.email.trim().to_lowercase();

    if user_queries::find_by_email(&state.db, &email)
        .await?
        .is_some()
    {
        return Err(AppError::Conflict("Email already registered".to_string()));
    }

    let password_hash = bcrypt::hash(&payload.password, bcrypt::DEFAULT_COST)
        .map_err(|e| AppError::InternalError(format!("Password hashing failed: {}", e)))?;

    let user =
        user_queries::create_user(&state.db, &email, payload.name.trim(), &password_hash).await?;

    tracing::info!("Registered user {}", user.id);

    let token = jwt::generate_token(
        &state.jwt_secret,
        state.token_expiry_days,
        user.id,
        &user.email,
        &user.name,
        user.role,
    )?;

    Ok(Json(AuthResponse { token }))
}

pub(crate) fn validate_registration(payload: &RegisterRequest) -> Result<()> {
    if payload.email.trim().is_empty() || !payload.email.contains('@') {
        return Err(AppError::BadRequest("Invalid email address".to_string()));
    }

    if payload.name.trim().is_empty() {
        return Err(AppError::BadRequest("Name cannot be empty".to_string()));
    }

    if payload.password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::BadRequest(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(email: &str, name: &str, password: &str) -> RegisterRequest {
        RegisterRequest {
            email: email.to_string(),
            name: name.to_string(),
            password: password.to_string(),
        }
    }

    #[test]
    fn accepts_valid_registration() {
        assert!(validate_registration(&request("a@b.test", "Ann", "password1")).is_ok());
    }

    #[test]
    fn rejects_bad_email_blank_name_and_short_password() {
        assert!(validate_registration(&request("nope", "Ann", "password1")).is_err());
        assert!(validate_registration(&request("a@b.test", "  ", "password1")).is_err());
        assert!(validate_registration(&request("a@b.test", "Ann", "short")).is_err());
    }
}
