use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use rand::distr::Alphanumeric;
use rand::Rng;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::claims::{ClaimMap, Claims, RESERVED_CLAIMS};
use crate::config::JwtConfig;
use crate::error::JwtError;

/// Length of generated `jti` values.
pub const JTI_LENGTH: usize = 16;

/// Random alphanumeric `jti`.
pub fn generate_jti(length: usize) -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

/// Source of the current Unix time, in seconds.
pub trait Clock: Send + Sync {
    fn now(&self) -> i64;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or_default()
    }
}

/// A clock stopped at a given Unix time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(pub i64);

impl Clock for FixedClock {
    fn now(&self) -> i64 {
        self.0
    }
}

/// Issues and validates admin tokens.
///
/// Construct once at startup and share it (it is cheap to clone); the
/// configuration is frozen at construction.  Key material is parsed up
/// front, but a bad key only surfaces as [`JwtError::ConfigError`] from
/// the operation that needs it, so a validate-only deployment can run
/// without a private key.
///
/// ```rust
/// use serde_json::json;
/// use larke_admin::{JwtConfig, JwtService};
///
/// let service = JwtService::new(JwtConfig::new("s3cr3t").iss("app").aud("admin"));
/// let mut custom = serde_json::Map::new();
/// custom.insert("uid".into(), json!(42));
///
/// let token = service.issue(custom).unwrap();
/// let claims = service.validate(&token).unwrap();
/// assert_eq!(claims.get("uid"), Some(&json!(42)));
/// ```
#[derive(Clone)]
pub struct JwtService<C = SystemClock> {
    config: JwtConfig,
    signing: Result<EncodingKey, JwtError>,
    verifying: Result<DecodingKey, JwtError>,
    clock: C,
}

impl<C: fmt::Debug> fmt::Debug for JwtService<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtService")
            .field("config", &self.config)
            .field("can_issue", &self.signing.is_ok())
            .field("can_validate", &self.verifying.is_ok())
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}

impl JwtService<SystemClock> {
    pub fn new(config: JwtConfig) -> Self {
        Self::with_clock(config, SystemClock)
    }
}

impl<C: Clock> JwtService<C> {
    /// Service that reads the time from `clock` instead of the system.
    pub fn with_clock(config: JwtConfig, clock: C) -> Self {
        let signing = config.encoding_key();
        let verifying = config.decoding_key();
        if let Err(e) = &verifying {
            warn!(error = %e, "jwt service cannot validate tokens");
        }
        Self {
            config,
            signing,
            verifying,
            clock,
        }
    }

    pub fn config(&self) -> &JwtConfig {
        &self.config
    }

    /// Issue a token carrying `custom` alongside the registered claims.
    ///
    /// Custom claims named like a registered claim are dropped; the
    /// configured value wins.
    pub fn issue(&self, custom: ClaimMap) -> Result<String, JwtError> {
        self.config.check_issuance()?;
        let key = self.signing.as_ref().map_err(Clone::clone)?;

        let mut extra = custom;
        for name in RESERVED_CLAIMS {
            if extra.remove(name).is_some() {
                debug!(claim = name, "custom claim shadowed by registered claim");
            }
        }

        let now = self.clock.now();
        let exp = now
            .checked_add(self.config.exp_time)
            .ok_or_else(|| JwtError::ConfigError("exptime overflows the token expiry".into()))?;
        let nbf = now.checked_add(self.config.not_before_time).ok_or_else(|| {
            JwtError::ConfigError("notbeforetime overflows the token not-before".into())
        })?;
        let jti = if self.config.jti.is_empty() {
            generate_jti(JTI_LENGTH)
        } else {
            self.config.jti.clone()
        };

        let claims = Claims {
            iss: non_empty(&self.config.iss),
            aud: non_empty(&self.config.aud),
            sub: non_empty(&self.config.sub),
            jti: Some(jti),
            iat: now,
            exp,
            nbf,
            extra,
        };

        let token = encode(&Header::new(self.config.alg), &claims, key)
            .map_err(|e| JwtError::SigningError(e.to_string()))?;

        debug!(alg = ?self.config.alg, exp = claims.exp, "issued admin token");
        Ok(token)
    }

    /// Like [`issue`](Self::issue) with a typed custom-claims struct.  `E`
    /// must serialize to a JSON object.
    pub fn issue_with<E: Serialize>(&self, extra: E) -> Result<String, JwtError> {
        match serde_json::to_value(extra) {
            Ok(Value::Object(map)) => self.issue(map),
            Ok(other) => Err(JwtError::SigningError(format!(
                "custom claims must be an object, got {other}"
            ))),
            Err(e) => Err(JwtError::SigningError(format!(
                "custom claims not serializable: {e}"
            ))),
        }
    }

    /// Validate a token and return every claim it carries.
    pub fn validate(&self, token: &str) -> Result<Claims, JwtError> {
        self.validate_as::<ClaimMap>(token)
    }

    /// Validate a token, deserializing custom claims into `E`.
    ///
    /// Checks run in this order: verification key available, token
    /// structure, expiry, not-before, signature, then the configured
    /// `iss` / `aud` / `sub`.  Time checks read the payload before the
    /// signature is verified, so an elapsed token is reported as
    /// [`JwtError::Expired`] whatever its signature.
    pub fn validate_as<E>(&self, token: &str) -> Result<Claims<E>, JwtError>
    where
        E: DeserializeOwned + Clone,
    {
        let key = self.verifying.as_ref().map_err(Clone::clone)?;

        let window = peek_window(token)?;
        let now = self.clock.now();
        if now > window.exp {
            debug!(exp = window.exp, now, "rejected expired token");
            return Err(JwtError::Expired);
        }
        if let Some(nbf) = window.nbf {
            if now < nbf {
                debug!(nbf, now, "rejected premature token");
                return Err(JwtError::NotYetValid);
            }
        }
        check_signature_segment(token)?;

        let mut validation = Validation::new(self.config.alg);
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.set_required_spec_claims(&["exp"]);

        let claims = decode::<Claims<E>>(token, key, &validation)
            .map_err(map_decode_error)?
            .claims;

        expect_claim("iss", &self.config.iss, claims.iss.as_deref())?;
        expect_claim("aud", &self.config.aud, claims.aud.as_deref())?;
        expect_claim("sub", &self.config.sub, claims.sub.as_deref())?;

        Ok(claims)
    }
}

/// The time claims, read without verifying the signature.
#[derive(Deserialize)]
struct TimeWindow {
    exp: i64,
    #[serde(default)]
    nbf: Option<i64>,
}

fn peek_window(token: &str) -> Result<TimeWindow, JwtError> {
    let segments: Vec<&str> = token.split('.').collect();
    if segments.len() != 3 || segments.iter().any(|s| s.is_empty()) {
        return Err(JwtError::MalformedToken(
            "expected three dot-separated segments".into(),
        ));
    }

    let payload = URL_SAFE_NO_PAD
        .decode(segments[1])
        .map_err(|e| JwtError::MalformedToken(format!("payload is not base64url: {e}")))?;

    serde_json::from_slice(&payload)
        .map_err(|e| JwtError::MalformedToken(format!("payload is not a claim set: {e}")))
}

/// A signature segment that is not valid base64url cannot match any key.
fn check_signature_segment(token: &str) -> Result<(), JwtError> {
    let signature = token.rsplit('.').next().unwrap_or_default();
    URL_SAFE_NO_PAD
        .decode(signature)
        .map(|_| ())
        .map_err(|e| {
            debug!(error = %e, "signature segment is not base64url");
            JwtError::SignatureInvalid
        })
}

fn map_decode_error(e: jsonwebtoken::errors::Error) -> JwtError {
    use jsonwebtoken::errors::ErrorKind;

    match e.kind() {
        ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => JwtError::SignatureInvalid,
        ErrorKind::InvalidKeyFormat | ErrorKind::InvalidRsaKey(_) | ErrorKind::InvalidEcdsaKey => {
            JwtError::ConfigError(e.to_string())
        }
        _ => JwtError::MalformedToken(e.to_string()),
    }
}

fn expect_claim(name: &str, expected: &str, actual: Option<&str>) -> Result<(), JwtError> {
    if expected.is_empty() || actual == Some(expected) {
        return Ok(());
    }
    Err(JwtError::InvalidClaim(format!(
        "{name} is {actual:?}, expected {expected:?}"
    )))
}

fn non_empty(s: &str) -> Option<String> {
    (!s.is_empty()).then(|| s.to_string())
}
