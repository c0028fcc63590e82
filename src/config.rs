use std::fmt;
use std::str::FromStr;

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey};
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

use crate::error::JwtError;

/// Whether tokens are signed with a shared secret or a key pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignerType {
    /// HMAC: one secret both signs and verifies.
    Symmetric,
    /// RSA, RSA-PSS or ECDSA: private key signs, public key verifies.
    Asymmetric,
}

impl SignerType {
    /// The signer type an algorithm family requires.
    pub fn for_algorithm(alg: Algorithm) -> Self {
        match alg {
            Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512 => Self::Symmetric,
            _ => Self::Asymmetric,
        }
    }
}

impl FromStr for SignerType {
    type Err = JwtError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "symmetric" | "hmac" => Ok(Self::Symmetric),
            "asymmetric" | "rsa" | "ecdsa" => Ok(Self::Asymmetric),
            other => Err(JwtError::ConfigError(format!(
                "unknown signer type {other:?}"
            ))),
        }
    }
}

/// Parse an algorithm name.  Only the HMAC, RSA, RSA-PSS and ECDSA
/// families are accepted.
pub fn parse_algorithm(name: &str) -> Result<Algorithm, JwtError> {
    let alg = match name.trim().to_ascii_uppercase().as_str() {
        "HS256" => Algorithm::HS256,
        "HS384" => Algorithm::HS384,
        "HS512" => Algorithm::HS512,
        "RS256" => Algorithm::RS256,
        "RS384" => Algorithm::RS384,
        "RS512" => Algorithm::RS512,
        "PS256" => Algorithm::PS256,
        "PS384" => Algorithm::PS384,
        "PS512" => Algorithm::PS512,
        "ES256" => Algorithm::ES256,
        "ES384" => Algorithm::ES384,
        other => {
            return Err(JwtError::ConfigError(format!(
                "unsupported algorithm {other:?}"
            )))
        }
    };
    Ok(alg)
}

/// Configuration for the admin token service.
///
/// Build with [`new`](Self::new), [`asymmetric`](Self::asymmetric),
/// [`from_value`](Self::from_value) or [`from_env`](Self::from_env), then
/// hand it to [`JwtService::new`](crate::JwtService::new).  The service
/// keeps its own copy, so later changes to a config never reach tokens
/// it has already issued.
///
/// Empty `iss`, `aud`, `sub` strings are left out of issued tokens and are
/// not checked on validation.  An empty `jti` means every token gets a
/// fresh random id.
#[derive(Clone)]
pub struct JwtConfig {
    pub alg: Algorithm,
    pub iss: String,
    pub aud: String,
    pub sub: String,
    pub jti: String,
    /// Token lifetime in seconds.  Must be positive to issue.
    pub exp_time: i64,
    /// Seconds after issuance before the token becomes valid.
    pub not_before_time: i64,
    pub signer_type: SignerType,
    pub secret: Option<String>,
    /// PEM-encoded private key for asymmetric signing.
    pub private_key: Option<String>,
    /// PEM-encoded public key for asymmetric verification.
    pub public_key: Option<String>,
}

impl fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtConfig")
            .field("alg", &self.alg)
            .field("iss", &self.iss)
            .field("aud", &self.aud)
            .field("sub", &self.sub)
            .field("jti", &self.jti)
            .field("exp_time", &self.exp_time)
            .field("not_before_time", &self.not_before_time)
            .field("signer_type", &self.signer_type)
            .field("secret", &redacted(&self.secret))
            .field("private_key", &redacted(&self.private_key))
            .field("public_key", &self.public_key.is_some())
            .finish()
    }
}

fn redacted(v: &Option<String>) -> &'static str {
    if v.is_some() {
        "<redacted>"
    } else {
        "<unset>"
    }
}

pub const DEFAULT_EXP_TIME: i64 = 3600;

impl JwtConfig {
    /// HS256 config signed with `secret`, one hour lifetime.
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            alg: Algorithm::HS256,
            iss: String::new(),
            aud: String::new(),
            sub: String::new(),
            jti: String::new(),
            exp_time: DEFAULT_EXP_TIME,
            not_before_time: 0,
            signer_type: SignerType::Symmetric,
            secret: Some(secret.into()),
            private_key: None,
            public_key: None,
        }
    }

    /// Key-pair config.  Either key may be omitted on a service that only
    /// issues or only validates.
    pub fn asymmetric(
        alg: Algorithm,
        private_key: Option<String>,
        public_key: Option<String>,
    ) -> Self {
        Self {
            alg,
            signer_type: SignerType::Asymmetric,
            secret: None,
            private_key,
            public_key,
            ..Self::new("")
        }
    }

    /// Build from a host configuration mapping.
    ///
    /// | Key             | Required | Default              |
    /// |-----------------|----------|----------------------|
    /// | `alg`           | no       | `HS256`              |
    /// | `iss`           | no       | *(empty)*            |
    /// | `aud`           | no       | *(empty)*            |
    /// | `sub`           | no       | *(empty)*            |
    /// | `jti`           | no       | *(empty: random)*    |
    /// | `exptime`       | no       | `3600`               |
    /// | `notbeforetime` | no       | `0`                  |
    /// | `signer_type`   | no       | derived from `alg`   |
    /// | `secrect`       | symmetric| (`secret` also read) |
    /// | `private_key`   | to issue, asymmetric  |         |
    /// | `public_key`    | to validate, asymmetric |       |
    ///
    /// Integer fields accept numeric strings.  Empty key strings count as
    /// unset.
    pub fn from_value(value: Value) -> Result<Self, JwtError> {
        let raw: RawJwtConfig = serde_json::from_value(value)
            .map_err(|e| JwtError::ConfigError(format!("invalid jwt config: {e}")))?;

        let alg = parse_algorithm(&raw.alg)?;
        let signer_type = match raw.signer_type.as_deref().filter(|s| !s.is_empty()) {
            Some(s) => s.parse()?,
            None => SignerType::for_algorithm(alg),
        };

        Ok(Self {
            alg,
            iss: raw.iss,
            aud: raw.aud,
            sub: raw.sub,
            jti: raw.jti,
            exp_time: raw.exptime,
            not_before_time: raw.notbeforetime,
            signer_type,
            secret: non_empty(raw.secret),
            private_key: non_empty(raw.private_key),
            public_key: non_empty(raw.public_key),
        })
    }

    /// Build from environment variables already set in the process.
    ///
    /// Reads `JWT_ALG`, `JWT_ISS`, `JWT_AUD`, `JWT_SUB`, `JWT_JTI`,
    /// `JWT_EXPTIME`, `JWT_NOTBEFORETIME`, `JWT_SIGNER_TYPE`, `JWT_SECRET`,
    /// `JWT_PRIVATE_KEY` and `JWT_PUBLIC_KEY`, with the defaults of
    /// [`from_value`](Self::from_value).  This crate does not load `.env`
    /// files.
    pub fn from_env() -> Result<Self, JwtError> {
        const VARS: [(&str, &str); 11] = [
            ("JWT_ALG", "alg"),
            ("JWT_ISS", "iss"),
            ("JWT_AUD", "aud"),
            ("JWT_SUB", "sub"),
            ("JWT_JTI", "jti"),
            ("JWT_EXPTIME", "exptime"),
            ("JWT_NOTBEFORETIME", "notbeforetime"),
            ("JWT_SIGNER_TYPE", "signer_type"),
            ("JWT_SECRET", "secrect"),
            ("JWT_PRIVATE_KEY", "private_key"),
            ("JWT_PUBLIC_KEY", "public_key"),
        ];

        let map: Map<String, Value> = VARS
            .iter()
            .filter_map(|(var, key)| {
                std::env::var(var)
                    .ok()
                    .filter(|v| !v.is_empty())
                    .map(|v| ((*key).to_string(), Value::String(v)))
            })
            .collect();

        Self::from_value(Value::Object(map))
    }

    pub fn alg(mut self, v: Algorithm) -> Self {
        self.alg = v;
        self
    }
    pub fn iss(mut self, v: impl Into<String>) -> Self {
        self.iss = v.into();
        self
    }
    pub fn aud(mut self, v: impl Into<String>) -> Self {
        self.aud = v.into();
        self
    }
    pub fn sub(mut self, v: impl Into<String>) -> Self {
        self.sub = v.into();
        self
    }
    pub fn jti(mut self, v: impl Into<String>) -> Self {
        self.jti = v.into();
        self
    }
    pub fn exp_time(mut self, secs: i64) -> Self {
        self.exp_time = secs;
        self
    }
    pub fn not_before_time(mut self, secs: i64) -> Self {
        self.not_before_time = secs;
        self
    }
    pub fn signer_type(mut self, v: SignerType) -> Self {
        self.signer_type = v;
        self
    }
    pub fn secret(mut self, v: impl Into<String>) -> Self {
        self.secret = Some(v.into());
        self
    }
    pub fn private_key(mut self, pem: impl Into<String>) -> Self {
        self.private_key = Some(pem.into());
        self
    }
    pub fn public_key(mut self, pem: impl Into<String>) -> Self {
        self.public_key = Some(pem.into());
        self
    }

    /// Checks that only matter when a token is about to be issued.
    pub(crate) fn check_issuance(&self) -> Result<(), JwtError> {
        if self.exp_time <= 0 {
            return Err(JwtError::ConfigError(format!(
                "exptime must be positive, got {}",
                self.exp_time
            )));
        }
        if self.not_before_time < 0 {
            return Err(JwtError::ConfigError(format!(
                "notbeforetime must not be negative, got {}",
                self.not_before_time
            )));
        }
        Ok(())
    }

    fn check_signer(&self) -> Result<(), JwtError> {
        let required = SignerType::for_algorithm(self.alg);
        if self.signer_type != required {
            return Err(JwtError::ConfigError(format!(
                "algorithm {:?} requires a {:?} signer, configured {:?}",
                self.alg, required, self.signer_type
            )));
        }
        Ok(())
    }

    fn shared_secret(&self) -> Result<&[u8], JwtError> {
        match self.secret.as_deref() {
            Some(s) if !s.is_empty() => Ok(s.as_bytes()),
            _ => Err(JwtError::ConfigError(
                "symmetric signer requires a secret".into(),
            )),
        }
    }

    /// Signing key for the configured signer type and algorithm.
    pub(crate) fn encoding_key(&self) -> Result<EncodingKey, JwtError> {
        self.check_signer()?;
        match self.signer_type {
            SignerType::Symmetric => Ok(EncodingKey::from_secret(self.shared_secret()?)),
            SignerType::Asymmetric => {
                let pem = self.private_key.as_deref().ok_or_else(|| {
                    JwtError::ConfigError("asymmetric signer requires a private key".into())
                })?;
                let key = match self.alg {
                    Algorithm::ES256 | Algorithm::ES384 => EncodingKey::from_ec_pem(pem.as_bytes()),
                    _ => EncodingKey::from_rsa_pem(pem.as_bytes()),
                };
                key.map_err(|e| JwtError::ConfigError(format!("invalid private key: {e}")))
            }
        }
    }

    /// Verification key for the configured signer type and algorithm.
    pub(crate) fn decoding_key(&self) -> Result<DecodingKey, JwtError> {
        self.check_signer()?;
        match self.signer_type {
            SignerType::Symmetric => Ok(DecodingKey::from_secret(self.shared_secret()?)),
            SignerType::Asymmetric => {
                let pem = self.public_key.as_deref().ok_or_else(|| {
                    JwtError::ConfigError("asymmetric signer requires a public key".into())
                })?;
                let key = match self.alg {
                    Algorithm::ES256 | Algorithm::ES384 => DecodingKey::from_ec_pem(pem.as_bytes()),
                    _ => DecodingKey::from_rsa_pem(pem.as_bytes()),
                };
                key.map_err(|e| JwtError::ConfigError(format!("invalid public key: {e}")))
            }
        }
    }
}

#[derive(Deserialize)]
struct RawJwtConfig {
    #[serde(default = "default_alg")]
    alg: String,
    #[serde(default)]
    iss: String,
    #[serde(default)]
    aud: String,
    #[serde(default)]
    sub: String,
    #[serde(default)]
    jti: String,
    #[serde(default = "default_exptime", deserialize_with = "int_or_string")]
    exptime: i64,
    #[serde(default, deserialize_with = "int_or_string")]
    notbeforetime: i64,
    #[serde(default)]
    signer_type: Option<String>,
    #[serde(default, rename = "secrect", alias = "secret")]
    secret: Option<String>,
    #[serde(default)]
    private_key: Option<String>,
    #[serde(default)]
    public_key: Option<String>,
}

fn default_alg() -> String {
    "HS256".into()
}

fn default_exptime() -> i64 {
    DEFAULT_EXP_TIME
}

fn non_empty(v: Option<String>) -> Option<String> {
    v.filter(|s| !s.trim().is_empty())
}

/// Host configs often carry numbers as strings (`"3600"`).
fn int_or_string<'de, D: Deserializer<'de>>(d: D) -> Result<i64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum IntOrString {
        Int(i64),
        Str(String),
    }

    match IntOrString::deserialize(d)? {
        IntOrString::Int(n) => Ok(n),
        IntOrString::Str(s) => s
            .trim()
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("expected an integer, got {s:?}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn from_value_reads_host_keys() {
        let cfg = JwtConfig::from_value(json!({
            "alg": "HS256",
            "iss": "app",
            "aud": "admin",
            "sub": "user",
            "jti": "1",
            "exptime": "3600",
            "notbeforetime": 0,
            "signer_type": "symmetric",
            "secrect": "s3cr3t",
            "private_key": "",
            "public_key": "",
        }))
        .unwrap();

        assert_eq!(cfg.alg, Algorithm::HS256);
        assert_eq!(cfg.iss, "app");
        assert_eq!(cfg.exp_time, 3600);
        assert_eq!(cfg.signer_type, SignerType::Symmetric);
        assert_eq!(cfg.secret.as_deref(), Some("s3cr3t"));
        assert!(cfg.private_key.is_none());
        assert!(cfg.public_key.is_none());
    }

    #[test]
    fn secret_alias_accepted() {
        let cfg = JwtConfig::from_value(json!({ "secret": "abc" })).unwrap();
        assert_eq!(cfg.secret.as_deref(), Some("abc"));
        assert_eq!(cfg.exp_time, DEFAULT_EXP_TIME);
    }

    #[test]
    fn signer_type_derived_from_alg() {
        let cfg = JwtConfig::from_value(json!({ "alg": "es256" })).unwrap();
        assert_eq!(cfg.alg, Algorithm::ES256);
        assert_eq!(cfg.signer_type, SignerType::Asymmetric);
    }

    #[test]
    fn unknown_alg_rejected() {
        let err = JwtConfig::from_value(json!({ "alg": "none" })).unwrap_err();
        assert!(matches!(err, JwtError::ConfigError(_)));
        assert!(parse_algorithm("EdDSA").is_err());
    }

    #[test]
    fn non_numeric_exptime_rejected() {
        let err = JwtConfig::from_value(json!({ "exptime": "soon" })).unwrap_err();
        assert!(matches!(err, JwtError::ConfigError(_)));
    }

    #[test]
    fn signer_mismatch_rejected() {
        let cfg = JwtConfig::new("s").alg(Algorithm::RS256);
        assert!(matches!(cfg.encoding_key(), Err(JwtError::ConfigError(_))));
        assert!(matches!(cfg.decoding_key(), Err(JwtError::ConfigError(_))));
    }

    #[test]
    fn empty_secret_rejected() {
        let cfg = JwtConfig::new("");
        assert!(matches!(cfg.encoding_key(), Err(JwtError::ConfigError(_))));
    }

    #[test]
    fn garbage_pem_rejected() {
        let cfg = JwtConfig::asymmetric(
            Algorithm::RS256,
            Some("not a key".into()),
            Some("not a key".into()),
        );
        assert!(matches!(cfg.encoding_key(), Err(JwtError::ConfigError(_))));
        assert!(matches!(cfg.decoding_key(), Err(JwtError::ConfigError(_))));
    }

    #[test]
    fn debug_redacts_secrets() {
        let cfg = JwtConfig::new("super-secret-value");
        let out = format!("{cfg:?}");
        assert!(!out.contains("super-secret-value"));
        assert!(out.contains("<redacted>"));
    }

    #[test]
    fn issuance_checks() {
        assert!(JwtConfig::new("s").check_issuance().is_ok());
        assert!(JwtConfig::new("s").exp_time(0).check_issuance().is_err());
        assert!(JwtConfig::new("s").exp_time(-1).check_issuance().is_err());
        assert!(JwtConfig::new("s").not_before_time(-5).check_issuance().is_err());
    }

    // The only test that touches `JWT_*` variables.
    #[test]
    fn from_env_reads_jwt_vars() {
        let vars = [
            ("JWT_ALG", "HS384"),
            ("JWT_ISS", "env-app"),
            ("JWT_AUD", "env-admin"),
            ("JWT_JTI", ""),
            ("JWT_EXPTIME", "900"),
            ("JWT_NOTBEFORETIME", "5"),
            ("JWT_SECRET", "env-secret"),
        ];
        for (k, v) in vars {
            std::env::set_var(k, v);
        }

        let cfg = JwtConfig::from_env();

        for (k, _) in vars {
            std::env::remove_var(k);
        }

        let cfg = cfg.unwrap();
        assert_eq!(cfg.alg, Algorithm::HS384);
        assert_eq!(cfg.iss, "env-app");
        assert_eq!(cfg.aud, "env-admin");
        assert_eq!(cfg.jti, "");
        assert_eq!(cfg.exp_time, 900);
        assert_eq!(cfg.not_before_time, 5);
        assert_eq!(cfg.signer_type, SignerType::Symmetric);
        assert_eq!(cfg.secret.as_deref(), Some("env-secret"));
    }
}
