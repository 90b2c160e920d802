//! C1 — Identity & Token Verifier.
//!
//! Validates a bearer token presented at connect time (`?token=…` or
//! `Authorization: Bearer …`) and yields a stable `user_id`. Tokens are
//! HMAC-signed `{user_id, exp}` claims, verified in constant time; this
//! fabric only consumes tokens minted elsewhere (the account/session
//! service), so there is no issuance path here, only verification.

use crate::error::{FabricError, FabricResult};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Claims {
    user_id: Uuid,
    exp: i64,
}

/// `jwt.secret` / `jwt.expiration` from configuration back this verifier;
/// `expiration` is only consulted by an issuer, not here, since verification
/// trusts the `exp` claim embedded in the token itself.
pub struct TokenVerifier {
    secret: Vec<u8>,
}

impl TokenVerifier {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self { secret: secret.into() }
    }

    /// Verifies `token` and returns the authenticated `user_id`. The wire
    /// format is `base64url(claims-json).base64url(hmac-sha256)`, kept
    /// deliberately simpler than a full JWT since this fabric never issues
    /// tokens, only checks them.
    pub fn verify(&self, token: &str) -> FabricResult<Uuid> {
        let (payload_b64, sig_b64) = token
            .split_once('.')
            .ok_or_else(|| FabricError::Unauthenticated("malformed token".into()))?;

        let payload = base64_decode(payload_b64)
            .ok_or_else(|| FabricError::Unauthenticated("malformed token payload".into()))?;
        let sig = base64_decode(sig_b64)
            .ok_or_else(|| FabricError::Unauthenticated("malformed token signature".into()))?;

        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| FabricError::Internal(format!("hmac key error: {e}")))?;
        mac.update(&payload);
        mac.verify_slice(&sig)
            .map_err(|_| FabricError::Unauthenticated("token signature mismatch".into()))?;

        let claims: Claims = serde_json::from_slice(&payload)
            .map_err(|_| FabricError::Unauthenticated("malformed token claims".into()))?;

        if claims.exp < chrono::Utc::now().timestamp() {
            return Err(FabricError::Unauthenticated("token expired".into()));
        }
        Ok(claims.user_id)
    }

    /// Convenience used by tests and by any admin tooling that needs to mint
    /// a token without a live issuer.
    #[cfg(any(test, feature = "test-support"))]
    pub fn mint(&self, user_id: Uuid, ttl: std::time::Duration) -> String {
        let claims = Claims {
            user_id,
            exp: (chrono::Utc::now() + chrono::Duration::from_std(ttl).unwrap_or_default()).timestamp(),
        };
        let payload = serde_json::to_vec(&claims).expect("claims always serialize");
        let mut mac = HmacSha256::new_from_slice(&self.secret).expect("valid hmac key");
        mac.update(&payload);
        let sig = mac.finalize().into_bytes();
        format!("{}.{}", base64_encode(&payload), base64_encode(&sig))
    }
}

/// Pulls a bearer token out of either `?token=…` or an `Authorization:
/// Bearer …` header, per §6's "connect URL may carry either" wording.
pub fn extract_token<'a>(query_token: Option<&'a str>, auth_header: Option<&'a str>) -> Option<&'a str> {
    if let Some(t) = query_token.filter(|t| !t.is_empty()) {
        return Some(t);
    }
    auth_header.and_then(|h| h.strip_prefix("Bearer "))
}

fn base64_decode(s: &str) -> Option<Vec<u8>> {
    use base64::Engine;
    base64::engine::general_purpose::URL_SAFE_NO_PAD.decode(s).ok()
}

fn base64_encode(bytes: &[u8]) -> String {
    use base64::Engine;
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}
