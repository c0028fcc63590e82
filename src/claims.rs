use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Free-form custom claims, keyed by claim name.
pub type ClaimMap = Map<String, Value>;

/// Registered claim names.  Custom claims never override these.
pub const RESERVED_CLAIMS: [&str; 7] = ["iss", "aud", "sub", "jti", "iat", "exp", "nbf"];

/// Admin token claims with an extensible custom-claims slot.
///
/// The registered fields are set from [`JwtConfig`](crate::JwtConfig) on
/// issuance.  Everything else in the payload lands in `extra`, which is a
/// [`ClaimMap`] by default.
///
/// ## Typed custom claims
///
/// ```rust
/// use serde::{Deserialize, Serialize};
/// use larke_admin::Claims;
///
/// #[derive(Debug, Clone, Serialize, Deserialize)]
/// struct AdminExtra {
///     adminid: String,
///     #[serde(default)]
///     is_root: bool,
/// }
///
/// fn handle(claims: Claims<AdminExtra>) {
///     println!("admin {} root={}", claims.extra.adminid, claims.extra.is_root);
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims<E = ClaimMap> {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,

    pub iat: i64,
    pub exp: i64,
    pub nbf: i64,

    /// Custom claims, flattened into the JWT payload.
    #[serde(flatten)]
    pub extra: E,
}

impl<E> Claims<E> {
    /// The raw subject string, if any.
    pub fn subject(&self) -> Option<&str> {
        self.sub.as_deref()
    }
}

impl Claims<ClaimMap> {
    /// A custom claim by name.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.extra.get(key)
    }

    /// All claims, registered and custom, as one mapping.
    pub fn into_map(self) -> ClaimMap {
        let mut map = self.extra;
        let strings = [
            ("iss", self.iss),
            ("aud", self.aud),
            ("sub", self.sub),
            ("jti", self.jti),
        ];
        for (key, value) in strings {
            if let Some(v) = value {
                map.insert(key.into(), Value::String(v));
            }
        }
        map.insert("iat".into(), self.iat.into());
        map.insert("exp".into(), self.exp.into());
        map.insert("nbf".into(), self.nbf.into());
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unknown_fields_land_in_extra() {
        let claims: Claims = serde_json::from_value(json!({
            "iss": "app",
            "iat": 10,
            "exp": 20,
            "nbf": 10,
            "uid": 42,
        }))
        .unwrap();
        assert_eq!(claims.iss.as_deref(), Some("app"));
        assert_eq!(claims.get("uid"), Some(&json!(42)));
        assert!(claims.get("iss").is_none());
    }

    #[test]
    fn into_map_merges_registered_claims() {
        let mut extra = ClaimMap::new();
        extra.insert("uid".into(), json!(42));
        let claims = Claims {
            iss: Some("app".into()),
            aud: None,
            sub: Some("user".into()),
            jti: Some("1".into()),
            iat: 100,
            exp: 3700,
            nbf: 100,
            extra,
        };

        let map = claims.into_map();
        assert_eq!(
            Value::Object(map),
            json!({
                "iss": "app",
                "sub": "user",
                "jti": "1",
                "uid": 42,
                "iat": 100,
                "exp": 3700,
                "nbf": 100,
            })
        );
    }

    #[test]
    fn missing_optional_claims_not_serialized() {
        let claims = Claims {
            iss: None,
            aud: None,
            sub: None,
            jti: None,
            iat: 1,
            exp: 2,
            nbf: 1,
            extra: ClaimMap::new(),
        };
        let v = serde_json::to_value(&claims).unwrap();
        assert_eq!(v, json!({ "iat": 1, "exp": 2, "nbf": 1 }));
    }
}
