//! `POST /api-token-auth/`: exchange credentials for a token

use crate::core::auth::verify_password;
use crate::core::error::{ApiError, ApiResult};
use crate::core::extractors::Payload;
use crate::entities::{TokenRequest, TokenResponse};
use crate::server::host::ServerHost;
use axum::Json;
use axum::extract::State;
use std::sync::Arc;

const INVALID_CREDENTIALS: &str = "Unable to log in with provided credentials.";

pub async fn obtain_token(
    State(host): State<Arc<ServerHost>>,
    Payload(request): Payload<TokenRequest>,
) -> ApiResult<Json<TokenResponse>> {
    let (username, password) = request.into_credentials()?;

    let Some(user) = host.users.find_user_by_username(&username).await? else {
        tracing::warn!(user = %username, "Token requested for unknown user");
        return Err(invalid_credentials());
    };

    let hash = user.password_hash.clone();
    let verified = tokio::task::spawn_blocking(move || verify_password(&hash, &password)).await?;
    if !verified || !user.is_active {
        tracing::warn!(user = %username, "Token request rejected");
        return Err(invalid_credentials());
    }

    let token = host.users.get_or_create_token(user.id).await?;
    tracing::info!(user = %username, "Token issued");
    Ok(Json(TokenResponse { token: token.key }))
}

fn invalid_credentials() -> ApiError {
    ApiError::field("non_field_errors", INVALID_CREDENTIALS)
}
