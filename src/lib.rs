//! # larke-admin
//!
//! Admin-panel building blocks for [Axum](https://docs.rs/axum) services:
//!
//! * [`JwtService`]: issues and validates the signed, time-bounded tokens
//!   that identify admin sessions (HMAC, RSA, RSA-PSS or ECDSA).
//! * [`AdminAuth`]: an extractor that validates the bearer token.
//! * [`response`]: the `success` / `error` JSON envelopes and their CORS
//!   headers.
//! * [`ExtensionManifest`]: the static descriptor an admin extension ships
//!   with, plus an [`ExtensionRegistry`].
//!
//! ## Usage
//!
//! ```rust,no_run
//! use axum::{routing::get, Extension, Router};
//! use larke_admin::{response, AdminAuth, JwtConfig, JwtService};
//! use serde_json::json;
//!
//! async fn profile(admin: AdminAuth) -> response::ApiResponse {
//!     response::success("fetched", json!({ "adminid": admin.claims.get("adminid") }))
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     // Ensure JWT_SECRET (and optionally JWT_ISS, JWT_AUD, ...) are set
//!     // in the environment before calling from_env.
//!     let service = JwtService::new(JwtConfig::from_env().unwrap());
//!
//!     let app: Router = Router::new()
//!         .route("/admin/profile", get(profile))
//!         .layer(Extension(service));
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await.unwrap();
//!     axum::serve(listener, app).await.unwrap();
//! }
//! ```
//!
//! ## Host configuration
//!
//! [`JwtConfig::from_value`] reads the mapping a host keeps under its
//! `jwt` config key:
//!
//! ```rust
//! use larke_admin::{JwtConfig, JwtService};
//! use serde_json::json;
//!
//! let config = JwtConfig::from_value(json!({
//!     "alg": "HS256",
//!     "iss": "app",
//!     "aud": "admin",
//!     "sub": "user",
//!     "jti": "",
//!     "exptime": 3600,
//!     "notbeforetime": 0,
//!     "signer_type": "symmetric",
//!     "secrect": "s3cr3t",
//! }))
//! .unwrap();
//!
//! let service = JwtService::new(config);
//! let token = service.issue(serde_json::Map::new()).unwrap();
//! assert!(service.validate(&token).is_ok());
//! ```
//!
//! ## Environment variables (`JwtConfig::from_env`)
//!
//! This crate does **not** load `.env` files.
//!
//! | Variable            | Required        | Default            |
//! |---------------------|-----------------|--------------------|
//! | `JWT_ALG`           | no              | `HS256`            |
//! | `JWT_ISS`           | no              | *(unset)*          |
//! | `JWT_AUD`           | no              | *(unset)*          |
//! | `JWT_SUB`           | no              | *(unset)*          |
//! | `JWT_JTI`           | no              | *(random per token)* |
//! | `JWT_EXPTIME`       | no              | `3600`             |
//! | `JWT_NOTBEFORETIME` | no              | `0`                |
//! | `JWT_SIGNER_TYPE`   | no              | derived from alg   |
//! | `JWT_SECRET`        | HMAC            |                    |
//! | `JWT_PRIVATE_KEY`   | RSA/ECDSA issue |                    |
//! | `JWT_PUBLIC_KEY`    | RSA/ECDSA verify|                    |

pub mod claims;
pub mod config;
pub mod error;
pub mod extension;
pub mod middleware;
pub mod response;
pub mod token;

pub use claims::{ClaimMap, Claims};
pub use config::{JwtConfig, SignerType};
pub use error::{JwtError, ManifestError};
pub use extension::{ConfigField, ExtensionManifest, ExtensionRegistry, FieldKind};
pub use middleware::{AdminAuth, OptionalAdminAuth};
pub use response::{ApiResponse, CorsConfig, JsonResponder};
pub use token::{generate_jti, Clock, FixedClock, JwtService, SystemClock};
