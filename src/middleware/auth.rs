use axum::{
    extract::Request,
    http::HeaderMap,
    middleware::Next,
    response::Response,
};

use crate::auth::validate_jwt;
use crate::error::ApiError;
use crate::types::Principal;

/// Principal attached to every request; `None` when no credentials were sent
#[derive(Clone, Debug, Default)]
pub struct RequestPrincipal(pub Option<Principal>);

/// Authenticate when a bearer token is present, pass through anonymously otherwise.
///
/// A header that is present but unusable is rejected rather than treated as anonymous.
pub async fn optional_auth_middleware(
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let principal = match extract_jwt_from_headers(&headers).map_err(ApiError::unauthorized)? {
        Some(token) => {
            let claims = validate_jwt(&token).map_err(|e| {
                tracing::debug!("Rejected bearer token: {}", e);
                ApiError::unauthorized(e.to_string())
            })?;
            Some(Principal::from(claims))
        }
        None => None,
    };

    request.extensions_mut().insert(RequestPrincipal(principal));
    Ok(next.run(request).await)
}

/// Extract JWT token from Authorization header
fn extract_jwt_from_headers(headers: &HeaderMap) -> Result<Option<String>, String> {
    let Some(auth_header) = headers.get(axum::http::header::AUTHORIZATION) else {
        return Ok(None);
    };

    let auth_str = auth_header
        .to_str()
        .map_err(|_| "Invalid Authorization header format".to_string())?;

    if let Some(token) = auth_str.strip_prefix("Bearer ") {
        if token.trim().is_empty() {
            return Err("Empty JWT token".to_string());
        }
        Ok(Some(token.trim().to_string()))
    } else {
        Err("Authorization header must use Bearer token format".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn missing_header_is_anonymous() {
        assert_eq!(extract_jwt_from_headers(&HeaderMap::new()), Ok(None));
    }

    #[test]
    fn bearer_token_is_extracted() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Bearer abc.def"));
        assert_eq!(extract_jwt_from_headers(&headers), Ok(Some("abc.def".to_string())));
    }

    #[test]
    fn other_schemes_are_rejected() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Basic dXNlcg=="));
        assert!(extract_jwt_from_headers(&headers).is_err());

        headers.insert("authorization", HeaderValue::from_static("Bearer   "));
        assert!(extract_jwt_from_headers(&headers).is_err());
    }
}
