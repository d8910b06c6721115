//! Admin key middleware.
//!
//! Admin routes require `X-Admin-Key` to match the configured key. With no
//! key configured every admin request is refused.

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::warn;

use crate::app::AppState;
use crate::error::ApiError;

pub const ADMIN_KEY_HEADER: &str = "X-Admin-Key";

fn check_admin_key(configured: &str, presented: Option<&str>) -> Result<(), ApiError> {
    if configured.is_empty() {
        return Err(ApiError::Forbidden("Admin routes are disabled".into()));
    }
    match presented {
        None => Err(ApiError::Unauthorized("Missing admin key".into())),
        Some(key) if key == configured => Ok(()),
        Some(_) => Err(ApiError::Forbidden("Invalid admin key".into())),
    }
}

pub async fn require_admin(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let presented = req
        .headers()
        .get(ADMIN_KEY_HEADER)
        .and_then(|v| v.to_str().ok());

    match check_admin_key(&state.config.admin.api_key, presented) {
        Ok(()) => next.run(req).await,
        Err(err) => {
            warn!(path = %req.uri().path(), error = %err, "Admin request rejected");
            err.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matching_key_is_accepted() {
        assert!(check_admin_key("secret", Some("secret")).is_ok());
    }

    #[test]
    fn test_missing_key_is_unauthorized() {
        assert!(matches!(
            check_admin_key("secret", None),
            Err(ApiError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_wrong_key_is_forbidden() {
        assert!(matches!(
            check_admin_key("secret", Some("guess")),
            Err(ApiError::Forbidden(_))
        ));
    }

    #[test]
    fn test_empty_configured_key_disables_admin() {
        assert!(matches!(
            check_admin_key("", Some("")),
            Err(ApiError::Forbidden(_))
        ));
        assert!(matches!(
            check_admin_key("", None),
            Err(ApiError::Forbidden(_))
        ));
    }
}
