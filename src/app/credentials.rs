use anyhow::{anyhow, Result};
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use pasetors::claims::{Claims, ClaimsValidationRules};
use pasetors::keys::SymmetricKey;
use pasetors::token::UntrustedToken;
use pasetors::{local, version4::V4, Local};
use time::format_description::well_known::Rfc3339;
use time::{Duration, OffsetDateTime};

use crate::app::error::{ServiceError, ServiceResult};

const TOKEN_ISSUER: &str = "murmur";

#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: OffsetDateTime,
}

/// Issues and checks session tokens. Tokens are PASETO v4.local, keyed with the
/// server secret, and carry the username as `sub`.
#[derive(Clone)]
pub struct CredentialVerifier {
    key: [u8; 32],
    ttl_minutes: u64,
}

impl CredentialVerifier {
    pub fn new(key: [u8; 32], ttl_minutes: u64) -> Self {
        Self { key, ttl_minutes }
    }

    pub fn issue_token(&self, subject: &str) -> Result<IssuedToken> {
        let ttl = i64::try_from(self.ttl_minutes)
            .ok()
            .and_then(|minutes| minutes.checked_mul(60))
            .map(Duration::seconds)
            .ok_or_else(|| {
                anyhow!("token lifetime of {} minutes is out of range", self.ttl_minutes)
            })?;
        self.issue_token_with_ttl(subject, ttl)
    }

    pub fn issue_token_with_ttl(&self, subject: &str, ttl: Duration) -> Result<IssuedToken> {
        let expires_at = OffsetDateTime::now_utc()
            .checked_add(ttl)
            .ok_or_else(|| anyhow!("token lifetime is out of range"))?;

        let mut claims = Claims::new()?;
        claims.issuer(TOKEN_ISSUER)?;
        claims.audience(TOKEN_ISSUER)?;
        claims.subject(subject)?;
        claims.expiration(&expires_at.format(&Rfc3339)?)?;

        let key = SymmetricKey::<V4>::from(&self.key)?;
        let token = local::encrypt(&key, &claims, None, None)?;
        Ok(IssuedToken { token, expires_at })
    }

    /// Returns the token's subject. Any failure, including expiry, is reported
    /// as `InvalidCredentials`.
    pub fn verify_token(&self, token: &str) -> ServiceResult<String> {
        let claims = self
            .decrypt_claims(token)?
            .ok_or(ServiceError::InvalidCredentials)?;

        let subject = claims
            .get_claim("sub")
            .and_then(|value| value.as_str())
            .filter(|value| !value.is_empty())
            .ok_or(ServiceError::InvalidCredentials)?;

        Ok(subject.to_string())
    }

    fn decrypt_claims(&self, token: &str) -> Result<Option<Claims>> {
        let key = SymmetricKey::<V4>::from(&self.key)?;
        let mut rules = ClaimsValidationRules::new();
        rules.validate_issuer_with(TOKEN_ISSUER);
        rules.validate_audience_with(TOKEN_ISSUER);

        let untrusted = match UntrustedToken::<Local, V4>::try_from(token) {
            Ok(token) => token,
            Err(_) => return Ok(None),
        };
        // Checks authenticity, then exp/nbf/iat, iss and aud.
        let trusted = match local::decrypt(&key, &untrusted, &rules, None, None) {
            Ok(token) => token,
            Err(_) => return Ok(None),
        };
        Ok(trusted.payload_claims().cloned())
    }
}

pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut argon2::password_hash::rand_core::OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|err| anyhow!("failed to hash password: {}", err))?;
    Ok(hash.to_string())
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let parsed = PasswordHash::new(hash)
        .map_err(|err| anyhow!("failed to parse password hash: {}", err))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}
