use axum::extract::FromRequestParts;
use http::request::Parts;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::claims::{ClaimMap, Claims};
use crate::error::JwtError;
use crate::token::JwtService;

/// Axum extractor: validates the admin bearer token.
///
/// Looks up the [`JwtService`] registered as a request extension.
/// Generic over custom claims `E`, defaulting to a [`ClaimMap`].
///
/// ```rust,no_run
/// use axum::{routing::get, Extension, Router};
/// use larke_admin::{AdminAuth, JwtConfig, JwtService};
///
/// async fn profile(admin: AdminAuth) -> String {
///     format!("admin {:?}", admin.claims.get("adminid"))
/// }
///
/// # async fn example() {
/// let service = JwtService::new(JwtConfig::from_env().unwrap());
/// let app: Router = Router::new()
///     .route("/admin/profile", get(profile))
///     .layer(Extension(service));
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct AdminAuth<E = ClaimMap> {
    /// Decoded claims, including custom claims of type `E`.
    pub claims: Claims<E>,

    /// Raw bearer token (needed to blacklist it on logout).
    pub token: String,
}

impl<S, E> FromRequestParts<S> for AdminAuth<E>
where
    S: Send + Sync,
    E: DeserializeOwned + Clone + Send + Sync + 'static,
{
    type Rejection = JwtError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let token = extract_bearer(parts)?;

        let service = parts.extensions.get::<JwtService>().ok_or_else(|| {
            JwtError::ConfigError(
                "JwtService not found, add `.layer(Extension(service))`".into(),
            )
        })?;

        let claims = service.validate_as::<E>(&token).inspect_err(|e| {
            debug!(error = %e, path = %parts.uri.path(), "admin token rejected");
        })?;

        Ok(AdminAuth { claims, token })
    }
}

/// Like [`AdminAuth`] but yields `None` when no `Authorization` header
/// is present.  A malformed header or bad token still returns an error.
#[derive(Debug, Clone)]
pub struct OptionalAdminAuth<E = ClaimMap>(Option<AdminAuth<E>>);

impl<E> OptionalAdminAuth<E> {
    pub fn into_inner(self) -> Option<AdminAuth<E>> {
        self.0
    }
    pub fn as_ref(&self) -> Option<&AdminAuth<E>> {
        self.0.as_ref()
    }
}

impl<S, E> FromRequestParts<S> for OptionalAdminAuth<E>
where
    S: Send + Sync,
    E: DeserializeOwned + Clone + Send + Sync + 'static,
{
    type Rejection = JwtError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if parts.headers.get(http::header::AUTHORIZATION).is_none() {
            return Ok(Self(None));
        }
        AdminAuth::from_request_parts(parts, state)
            .await
            .map(|a| Self(Some(a)))
    }
}

fn extract_bearer(parts: &Parts) -> Result<String, JwtError> {
    let header = parts
        .headers
        .get(http::header::AUTHORIZATION)
        .ok_or(JwtError::MissingHeader)?
        .to_str()
        .map_err(|_| JwtError::InvalidHeaderFormat)?;

    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_owned)
        .ok_or(JwtError::InvalidBearerFormat)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::JwtConfig;
    use http::Request;
    use serde_json::json;

    fn service() -> JwtService {
        JwtService::new(JwtConfig::new("s3cr3t").iss("app"))
    }

    fn parts(auth: Option<&str>, with_service: bool) -> Parts {
        let mut builder = Request::builder().uri("/admin/profile");
        if let Some(v) = auth {
            builder = builder.header(http::header::AUTHORIZATION, v);
        }
        if with_service {
            builder = builder.extension(service());
        }
        builder.body(()).unwrap().into_parts().0
    }

    fn token() -> String {
        let mut custom = ClaimMap::new();
        custom.insert("adminid".into(), json!("a1"));
        service().issue(custom).unwrap()
    }

    #[tokio::test]
    async fn valid_token_extracted() {
        let token = token();
        let mut p = parts(Some(&format!("Bearer {token}")), true);
        let admin = AdminAuth::<ClaimMap>::from_request_parts(&mut p, &()).await.unwrap();
        assert_eq!(admin.token, token);
        assert_eq!(admin.claims.get("adminid"), Some(&json!("a1")));
    }

    #[tokio::test]
    async fn missing_header_rejected() {
        let mut p = parts(None, true);
        let err = AdminAuth::<ClaimMap>::from_request_parts(&mut p, &()).await.unwrap_err();
        assert_eq!(err, JwtError::MissingHeader);
    }

    #[tokio::test]
    async fn non_bearer_scheme_rejected() {
        let mut p = parts(Some("Basic dXNlcjpwYXNz"), true);
        let err = AdminAuth::<ClaimMap>::from_request_parts(&mut p, &()).await.unwrap_err();
        assert_eq!(err, JwtError::InvalidBearerFormat);
    }

    #[tokio::test]
    async fn missing_service_is_config_error() {
        let mut p = parts(Some(&format!("Bearer {}", token())), false);
        let err = AdminAuth::<ClaimMap>::from_request_parts(&mut p, &()).await.unwrap_err();
        assert!(matches!(err, JwtError::ConfigError(_)));
    }

    #[tokio::test]
    async fn bad_token_rejected() {
        let mut p = parts(Some("Bearer not.a.token"), true);
        let err = AdminAuth::<ClaimMap>::from_request_parts(&mut p, &()).await.unwrap_err();
        assert!(matches!(err, JwtError::MalformedToken(_)));
    }

    #[tokio::test]
    async fn optional_without_header_is_none() {
        let mut p = parts(None, true);
        let admin = OptionalAdminAuth::<ClaimMap>::from_request_parts(&mut p, &()).await.unwrap();
        assert!(admin.as_ref().is_none());
    }

    #[tokio::test]
    async fn optional_with_token_is_some() {
        let mut p = parts(Some(&format!("Bearer {}", token())), true);
        let admin = OptionalAdminAuth::<ClaimMap>::from_request_parts(&mut p, &()).await.unwrap();
        assert!(admin.into_inner().is_some());
    }
}
