use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};

use crate::auth::{validate_jwt, Claims};
use crate::error::ApiError;
use crate::state::AppState;

/// Authenticated account extracted from JWT
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub account_id: String,
    pub is_admin: bool,
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self {
            is_admin: claims.is_admin(),
            account_id: claims.sub,
        }
    }
}

/// Who is calling an owner route. `Trusted` when no JWT secret is configured
/// and the account id in the request is taken at face value.
#[derive(Clone, Debug)]
pub enum Caller {
    Trusted,
    User(AuthUser),
}

impl Caller {
    pub fn authorize(&self, account_id: &str) -> Result<(), ApiError> {
        match self {
            Caller::Trusted => Ok(()),
            Caller::User(user) if user.account_id == account_id => Ok(()),
            Caller::User(user) => {
                tracing::warn!("Token for {} used against account {}", user.account_id, account_id);
                Err(ApiError::forbidden("Token does not grant access to this account"))
            }
        }
    }

    pub fn require_admin(&self) -> Result<(), ApiError> {
        match self {
            Caller::Trusted => Ok(()),
            Caller::User(user) if user.is_admin => Ok(()),
            Caller::User(_) => Err(ApiError::forbidden("Administrator access required")),
        }
    }
}

/// JWT authentication middleware that validates tokens and injects the caller
pub async fn jwt_auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let caller = match state.config.security.jwt_secret.as_deref() {
        None => Caller::Trusted,
        Some(secret) => {
            let token = extract_jwt_from_headers(request.headers()).map_err(ApiError::unauthorized)?;
            let claims = validate_jwt(&token, secret).map_err(|e| {
                tracing::warn!("Rejected token: {}", e);
                ApiError::unauthorized(e.to_string())
            })?;
            Caller::User(AuthUser::from(claims))
        }
    };

    request.extensions_mut().insert(caller);
    Ok(next.run(request).await)
}

/// Extract JWT token from Authorization header
fn extract_jwt_from_headers(headers: &HeaderMap) -> Result<String, String> {
    let auth_header = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or_else(|| "Missing Authorization header".to_string())?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| "Invalid Authorization header format".to_string())?;

    if let Some(token) = auth_str.strip_prefix("Bearer ") {
        if token.trim().is_empty() {
            return Err("Empty JWT token".to_string());
        }
        Ok(token.trim().to_string())
    } else {
        Err("Authorization header must use Bearer token format".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trusted_caller_passes_everything() {
        assert!(Caller::Trusted.authorize("anyone").is_ok());
        assert!(Caller::Trusted.require_admin().is_ok());
    }

    #[test]
    fn user_is_limited_to_own_account() {
        let caller = Caller::User(AuthUser {
            account_id: "acc_1".into(),
            is_admin: false,
        });
        assert!(caller.authorize("acc_1").is_ok());
        assert_eq!(caller.authorize("acc_2").unwrap_err().status_code(), axum::http::StatusCode::FORBIDDEN);
        assert!(caller.require_admin().is_err());
    }

    #[test]
    fn admin_claims_pass_the_admin_check() {
        let admin = Caller::User(AuthUser::from(Claims::new("ops", crate::auth::ACCESS_ADMIN, 1)));
        assert!(admin.require_admin().is_ok());
        let user = Caller::User(AuthUser::from(Claims::new("acc_1", crate::auth::ACCESS_USER, 1)));
        assert!(user.require_admin().is_err());
    }

    #[test]
    fn bearer_header_parsing() {
        let mut headers = HeaderMap::new();
        assert!(extract_jwt_from_headers(&headers).is_err());
        headers.insert("authorization", "Basic abc".parse().unwrap());
        assert!(extract_jwt_from_headers(&headers).is_err());
        headers.insert("authorization", "Bearer abc.def".parse().unwrap());
        assert_eq!(extract_jwt_from_headers(&headers).unwrap(), "abc.def");
    }
}
