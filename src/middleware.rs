use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::database::AppState;
use crate::error::ApiError;

/// Middleware guarding the dashboard routes with a shared token
///
/// When the application state carries a token, every request must send it
/// verbatim in the `Authorization` header. Without a configured token the
/// check is skipped.
pub async fn auth_middleware(
    State(state): State<AppState>,
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Result<Response, Response> {
    if let Some(expected) = state.auth_token.as_deref() {
        let provided = headers
            .get("Authorization")
            .and_then(|value| value.to_str().ok());

        if provided != Some(expected) {
            return Err(ApiError::Unauthorized.into_response());
        }
    }

    Ok(next.run(request).await)
}
