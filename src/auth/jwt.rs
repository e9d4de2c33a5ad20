use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};

use crate::{auth::auth::AuthUser, model::role::Role, models::Claims};

pub fn verify_token(token: &str, secret: &str) -> Result<Claims, String> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )
    .map(|data| data.claims)
    .map_err(|e| e.to_string())
}

/// Resolves an `Authorization` header value into the calling user.
/// The error is the message returned with the 401.
pub fn authenticate(header_value: Option<&str>, secret: &str) -> Result<AuthUser, String> {
    let header_value = header_value.ok_or("Missing Authorization header")?;
    let token = header_value
        .strip_prefix("Bearer ")
        .ok_or("Authorization header must start with Bearer")?;

    let claims = verify_token(token, secret).map_err(|e| format!("Invalid or expired token: {e}"))?;
    let role = claims
        .role
        .parse::<Role>()
        .map_err(|_| format!("Invalid role '{}'", claims.role))?;

    Ok(AuthUser {
        user_id: claims.user_id,
        username: claims.sub,
        role,
    })
}
