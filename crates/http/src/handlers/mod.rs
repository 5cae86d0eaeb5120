pub mod opportunities;

use std::sync::Arc;

use axum::http::{header, HeaderMap};

use pipeline_core::User;

use crate::api_error::ApiError;
use crate::blocking::blocking;
use crate::AppState;

pub const USER_HEADER: &str = "x-user-id";

/// Resolves the authenticated user from the identity header. The session
/// collaborator upstream is responsible for setting it; here a missing or
/// unknown id is simply a 401.
pub async fn require_user(
    state: &Arc<AppState>,
    headers: &HeaderMap,
) -> Result<User, ApiError> {
    let id = headers
        .get(USER_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::Unauthorized("missing X-User-Id header".to_string()))?
        .to_string();
    let storage = Arc::clone(&state.storage);
    let user = blocking(move || Ok(storage.get_user(&id)?)).await?;
    user.ok_or_else(|| ApiError::Unauthorized("unknown user".to_string()))
}

/// Whether the request was made from the list view, detected from the
/// Referer. Drives whether saves and deletes ship a refreshed
/// list+sidebar back.
pub fn is_list_context(headers: &HeaderMap) -> bool {
    headers
        .get(header::REFERER)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|referer| referer.trim_end_matches('/').ends_with("/opportunities"))
}

/// Account id from a `/accounts/{id}` Referer, used to re-select the
/// related account when a create from an account page fails validation.
pub fn referer_account_id(headers: &HeaderMap) -> Option<String> {
    let referer = headers.get(header::REFERER)?.to_str().ok()?;
    let (_, id) = referer.rsplit_once("/accounts/")?;
    let id = id.trim_end_matches('/');
    if id.is_empty() || id.contains('/') {
        return None;
    }
    Some(id.to_string())
}

/// Whether the client wants a full-page (HTML) response rather than a
/// fragment; deletes answer those with a redirect to the list.
pub fn wants_html(headers: &HeaderMap) -> bool {
    headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|accept| accept.contains("text/html"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with(name: header::HeaderName, value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(name, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn list_context_requires_list_referer() {
        assert!(is_list_context(&headers_with(
            header::REFERER,
            "http://crm.local/opportunities"
        )));
        assert!(is_list_context(&headers_with(
            header::REFERER,
            "http://crm.local/opportunities/"
        )));
        assert!(!is_list_context(&headers_with(
            header::REFERER,
            "http://crm.local/accounts/42"
        )));
        assert!(!is_list_context(&HeaderMap::new()));
    }

    #[test]
    fn referer_account_id_extracts_trailing_id() {
        assert_eq!(
            referer_account_id(&headers_with(header::REFERER, "http://crm.local/accounts/42")),
            Some("42".to_string())
        );
        assert_eq!(
            referer_account_id(&headers_with(
                header::REFERER,
                "http://crm.local/accounts/42/edit"
            )),
            None
        );
        assert_eq!(
            referer_account_id(&headers_with(header::REFERER, "http://crm.local/opportunities")),
            None
        );
    }

    #[test]
    fn html_detection_reads_accept() {
        assert!(wants_html(&headers_with(header::ACCEPT, "text/html,application/xhtml+xml")));
        assert!(!wants_html(&headers_with(header::ACCEPT, "application/json")));
        assert!(!wants_html(&HeaderMap::new()));
    }
}
