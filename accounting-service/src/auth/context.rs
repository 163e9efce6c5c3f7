//! Per-request company context extracted from the bearer token.
//!
//! The token is decoded and its role and permission strings are parsed once,
//! here. Handlers only ever see the typed [`CompanyContext`].

use std::collections::HashSet;

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use service_core::error::AppError;
use uuid::Uuid;

use super::permission::{Permission, Role};
use crate::startup::AppState;

/// Access token claims as issued by the identity provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: Uuid,
    pub company_id: Uuid,
    pub role: String,
    #[serde(default)]
    pub permissions: Vec<String>,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
}

/// HS256 verifier for access tokens.
#[derive(Clone)]
pub struct TokenVerifier {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 30;
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
        }
    }

    pub fn verify(&self, token: &str) -> Result<Claims, AppError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation)?;
        Ok(data.claims)
    }

    /// Sign claims with the same secret. Used by tooling and tests.
    pub fn issue(&self, claims: &Claims) -> Result<String, AppError> {
        Ok(encode(
            &Header::new(Algorithm::HS256),
            claims,
            &self.encoding_key,
        )?)
    }
}

/// Who is calling and for which company.
#[derive(Debug, Clone)]
pub struct CompanyContext {
    pub user_id: Uuid,
    pub company_id: Uuid,
    pub role: Role,
    permissions: HashSet<Permission>,
}

impl CompanyContext {
    /// Parse role and permissions; any unknown string rejects the token.
    pub fn from_claims(claims: Claims) -> Result<Self, AppError> {
        let role = Role::parse(&claims.role).ok_or_else(|| {
            AppError::Unauthorized(anyhow::anyhow!("Unknown role '{}'", claims.role))
        })?;

        let permissions = claims
            .permissions
            .iter()
            .map(|p| {
                Permission::parse(p).ok_or_else(|| {
                    AppError::Unauthorized(anyhow::anyhow!("Unknown permission '{}'", p))
                })
            })
            .collect::<Result<HashSet<_>, _>>()?;

        Ok(Self {
            user_id: claims.sub,
            company_id: claims.company_id,
            role,
            permissions,
        })
    }

    /// Admins hold every permission.
    pub fn has(&self, permission: Permission) -> bool {
        self.role == Role::Admin || self.permissions.contains(&permission)
    }

    pub fn require(&self, permission: Permission) -> Result<(), AppError> {
        if self.has(permission) {
            Ok(())
        } else {
            tracing::warn!(
                user_id = %self.user_id,
                company_id = %self.company_id,
                permission = permission.as_str(),
                "Permission denied"
            );
            Err(AppError::Forbidden(anyhow::anyhow!(
                "Missing permission '{}'",
                permission.as_str()
            )))
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CompanyContext {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .ok_or_else(|| {
                AppError::Unauthorized(anyhow::anyhow!("Missing bearer token"))
            })?;

        let ctx = CompanyContext::from_claims(state.verifier.verify(token)?)?;

        let span = tracing::Span::current();
        span.record("company_id", tracing::field::display(ctx.company_id));
        span.record("user_id", tracing::field::display(ctx.user_id));

        Ok(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(role: &str, permissions: &[&str]) -> Claims {
        let now = chrono::Utc::now().timestamp();
        Claims {
            sub: Uuid::new_v4(),
            company_id: Uuid::new_v4(),
            role: role.to_string(),
            permissions: permissions.iter().map(|p| p.to_string()).collect(),
            exp: now + 3600,
            iat: now,
        }
    }

    #[test]
    fn token_round_trips_through_verifier() {
        let verifier = TokenVerifier::new(b"test-secret");
        let original = claims("manager", &["read-items"]);
        let token = verifier.issue(&original).unwrap();
        let decoded = verifier.verify(&token).unwrap();
        assert_eq!(decoded.company_id, original.company_id);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = TokenVerifier::new(b"a").issue(&claims("admin", &[])).unwrap();
        assert!(matches!(
            TokenVerifier::new(b"b").verify(&token),
            Err(AppError::InvalidToken(_))
        ));
    }

    #[test]
    fn unknown_permission_rejects_the_context() {
        let err = CompanyContext::from_claims(claims("employee", &["read-everything"])).unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
        let err = CompanyContext::from_claims(claims("owner", &[])).unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[test]
    fn require_checks_the_permission_set() {
        let ctx = CompanyContext::from_claims(claims("employee", &["read-items"])).unwrap();
        assert!(ctx.require(Permission::ReadItems).is_ok());
        assert!(matches!(
            ctx.require(Permission::CreateItems),
            Err(AppError::Forbidden(_))
        ));

        let admin = CompanyContext::from_claims(claims("admin", &[])).unwrap();
        assert!(admin.require(Permission::DeletePurchasesBills).is_ok());
    }
}
