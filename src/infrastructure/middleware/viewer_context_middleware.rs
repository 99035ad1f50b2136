// ViewerContext Middleware - builds the request-scoped identity from the
// headers set by the upstream authentication gateway

use axum::{extract::Request, http::HeaderMap, middleware::Next, response::Response};
use std::sync::Arc;
use uuid::Uuid;

use crate::core::UserId;
use crate::error::{AppError, AppResult};
use crate::infrastructure::viewer::ViewerContext;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

/// Authentication information extracted from request
#[derive(Debug, Clone, PartialEq)]
pub struct AuthInfo {
    pub user_id: Option<UserId>,
    pub is_admin: bool,
}

/// Injects `Arc<ViewerContext>` into request extensions for the `Vc` extractor.
pub async fn viewer_context_middleware(
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth_info = extract_auth_from_request(request.headers())?;
    let viewer_context = create_viewer_context(auth_info);

    tracing::debug!(
        request_id = %viewer_context.request_id,
        user_id = ?viewer_context.user_id(),
        "viewer context attached"
    );

    request.extensions_mut().insert(viewer_context);
    Ok(next.run(request).await)
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> AppResult<Option<&'a str>> {
    headers
        .get(name)
        .map(|value| {
            value
                .to_str()
                .map(str::trim)
                .map_err(|_| AppError::BadRequest(format!("Header {} is not valid text", name)))
        })
        .transpose()
}

/// Missing user id means anonymous; a role without a user id is ignored.
pub fn extract_auth_from_request(headers: &HeaderMap) -> AppResult<AuthInfo> {
    let Some(raw_id) = header_str(headers, USER_ID_HEADER)? else {
        return Ok(AuthInfo {
            user_id: None,
            is_admin: false,
        });
    };

    let user_id: UserId = raw_id.parse()?;

    let is_admin = match header_str(headers, USER_ROLE_HEADER)? {
        None => false,
        Some(role) if role.eq_ignore_ascii_case("user") => false,
        Some(role) if role.eq_ignore_ascii_case("admin") => true,
        Some(other) => {
            return Err(AppError::BadRequest(format!("Unknown user role: {}", other)));
        }
    };

    Ok(AuthInfo {
        user_id: Some(user_id),
        is_admin,
    })
}

pub fn create_viewer_context(auth_info: AuthInfo) -> Arc<ViewerContext> {
    let request_id = format!("req-{}", Uuid::new_v4());

    let viewer_context = match auth_info {
        AuthInfo {
            user_id: Some(user_id),
            is_admin: true,
        } => ViewerContext::admin(user_id, request_id),
        AuthInfo {
            user_id: Some(user_id),
            is_admin: false,
        } => ViewerContext::authenticated_user(user_id, request_id),
        AuthInfo { user_id: None, .. } => ViewerContext::anonymous(request_id),
    };

    Arc::new(viewer_context)
}
