use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};

/// Claims carried by the backend's session token.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Claims {
    pub sub: String, // Subject (user id)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>, // Expiration time (as UTC timestamp)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>, // Issued at (as UTC timestamp)
}

impl Claims {
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.exp.and_then(|exp| DateTime::from_timestamp(exp, 0))
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at() {
            Some(expiry) => now >= expiry,
            None => false,
        }
    }
}

/// Reads the claims of a backend-issued token.
///
/// The signature is not checked here: the token is opaque proof for the
/// backend, which verifies it on every request. The client only needs the
/// identity and expiry to decide what to show.
pub fn read_claims(token: &str) -> Result<Claims> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.required_spec_claims.clear();

    let token_data = decode::<Claims>(token, &DecodingKey::from_secret(&[]), &validation)
        .context("Failed to decode session token")?;

    Ok(token_data.claims)
}

#[cfg(test)]
pub(crate) fn mint_token(sub: &str, exp: Option<i64>) -> String {
    use jsonwebtoken::{EncodingKey, Header, encode};

    let claims = Claims {
        sub: sub.to_string(),
        email: Some(format!("{}@example.com", sub)),
        name: Some(sub.to_string()),
        exp,
        iat: Some(Utc::now().timestamp()),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(b"backend-secret"),
    )
    .expect("token encodes")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_claims_without_the_signing_secret() {
        let exp = Utc::now().timestamp() + 3600;
        let token = mint_token("user-1", Some(exp));

        let claims = read_claims(&token).expect("claims decode");
        assert_eq!(claims.sub, "user-1");
        assert_eq!(claims.email.as_deref(), Some("user-1@example.com"));
        assert!(!claims.is_expired(Utc::now()));
    }

    #[test]
    fn expired_claims_are_reported() {
        let token = mint_token("user-1", Some(Utc::now().timestamp() - 10));
        let claims = read_claims(&token).expect("claims decode");
        assert!(claims.is_expired(Utc::now()));
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(read_claims("not-a-token").is_err());
    }
}
