//! Signed session tokens.
//!
//! Format: `base64url(json claims) "." hex(hmac_sha256(secret, base64 part))`.

use agentquest_core::AgentId;
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("session token is malformed")]
    Malformed,
    #[error("session token signature does not match")]
    BadSignature,
    #[error("session token expired")]
    Expired,
    #[error("session secret is unusable")]
    InvalidKey,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    pub agent_id: AgentId,
    pub wallet_address: String,
    pub issued_at_ms: u64,
    pub expires_at_ms: u64,
}

impl SessionClaims {
    #[must_use]
    pub fn new(
        agent_id: AgentId,
        wallet_address: impl Into<String>,
        issued_at_ms: u64,
        ttl_ms: u64,
    ) -> Self {
        Self {
            agent_id,
            wallet_address: wallet_address.into(),
            issued_at_ms,
            expires_at_ms: issued_at_ms.saturating_add(ttl_ms),
        }
    }

    pub fn sign(&self, secret: &[u8]) -> Result<String, TokenError> {
        let payload = serde_json::to_vec(self).map_err(|_| TokenError::Malformed)?;
        let encoded = URL_SAFE_NO_PAD.encode(payload);
        let tag = mac_for(secret, encoded.as_bytes())?.finalize().into_bytes();
        Ok(format!("{encoded}.{}", hex::encode(tag)))
    }

    pub fn verify(token: &str, secret: &[u8], now_ms: u64) -> Result<Self, TokenError> {
        let (encoded, tag_hex) = token.trim().split_once('.').ok_or(TokenError::Malformed)?;
        let tag = hex::decode(tag_hex).map_err(|_| TokenError::Malformed)?;
        mac_for(secret, encoded.as_bytes())?
            .verify_slice(&tag)
            .map_err(|_| TokenError::BadSignature)?;

        let claims = Self::decode_payload(encoded)?;
        if now_ms >= claims.expires_at_ms {
            return Err(TokenError::Expired);
        }
        Ok(claims)
    }

    fn decode_payload(encoded: &str) -> Result<Self, TokenError> {
        let raw = URL_SAFE_NO_PAD.decode(encoded).map_err(|_| TokenError::Malformed)?;
        serde_json::from_slice(&raw).map_err(|_| TokenError::Malformed)
    }
}

fn mac_for(secret: &[u8], payload: &[u8]) -> Result<HmacSha256, TokenError> {
    let mut mac = HmacSha256::new_from_slice(secret).map_err(|_| TokenError::InvalidKey)?;
    mac.update(payload);
    Ok(mac)
}
