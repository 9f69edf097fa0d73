//! Service-to-service authentication for ledger calls.
//!
//! Tokens are compact JWTs signed with RSA PKCS#1 v1.5 over SHA-256 (`RS256`):
//! `base64url(header).base64url(claims).base64url(signature)`.
//! A fresh token is minted for every ledger call and scoped to the payer
//! account. The key pair is loaded once and never rotated while running.

use std::fmt;
use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rsa::pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey, EncodeRsaPublicKey};
use rsa::pkcs1v15::{Signature, SigningKey, VerifyingKey};
use rsa::pkcs8::{
    DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey, LineEnding,
};
use rsa::signature::{SignatureEncoding, Signer, Verifier};
use rsa::{RsaPrivateKey, RsaPublicKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use tracing::{debug, instrument};

use charge_types::{AuthError, CredentialIssuer, ServiceClaims};

const ALGORITHM: &str = "RS256";
const GENERATED_KEY_BITS: usize = 2048;

#[derive(Debug, Serialize, Deserialize)]
struct TokenHeader {
    alg: String,
    #[serde(default)]
    typ: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    kid: Option<String>,
}

/// A freshly generated key pair, PEM encoded.
pub struct GeneratedKeyPair {
    /// PKCS#8 private key
    pub private_pem: String,
    /// SubjectPublicKeyInfo public key
    pub public_pem: String,
}

/// Mints and verifies ledger service tokens.
///
/// Key material is immutable after construction, so a shared reference can
/// sign and verify from any number of tasks without locking.
pub struct ServiceAuthenticator {
    signing_key: SigningKey<Sha256>,
    verifying_key: VerifyingKey<Sha256>,
    key_id: String,
    ttl: Duration,
}

impl fmt::Debug for ServiceAuthenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAuthenticator")
            .field("key_id", &self.key_id)
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl ServiceAuthenticator {
    /// Loads the key pair from disk.
    ///
    /// # Errors
    ///
    /// [`AuthError::KeyLoad`] if either file cannot be read,
    /// [`AuthError::KeyParse`] if the contents are not a matching RSA pair.
    pub fn from_files(
        private_key_path: impl AsRef<Path>,
        public_key_path: impl AsRef<Path>,
        ttl: Duration,
    ) -> Result<Self, AuthError> {
        let private_data = read_key(private_key_path.as_ref())?;
        let public_data = read_key(public_key_path.as_ref())?;
        Self::from_key_data(&private_data, &public_data, ttl)
    }

    /// Builds an authenticator from encoded key material.
    ///
    /// The private key is tried as PKCS#1, then PKCS#8; the public key as
    /// SubjectPublicKeyInfo, then PKCS#1. PEM is tried before DER.
    pub fn from_key_data(
        private_data: &[u8],
        public_data: &[u8],
        ttl: Duration,
    ) -> Result<Self, AuthError> {
        let private_key = parse_private_key(private_data)?;
        let public_key = parse_public_key(public_data)?;

        let derived = public_key_der(&private_key.to_public_key())?;
        let loaded = public_key_der(&public_key)?;
        let matches: bool = derived.ct_eq(&loaded).into();
        if !matches {
            return Err(AuthError::KeyParse(
                "public key does not belong to the private key".into(),
            ));
        }

        Ok(Self::with_keys(private_key, public_key, &loaded, ttl))
    }

    /// Builds an authenticator whose public key is derived from the private key.
    pub fn from_private_key(private_key: RsaPrivateKey, ttl: Duration) -> Result<Self, AuthError> {
        let public_key = private_key.to_public_key();
        let der = public_key_der(&public_key)?;
        Ok(Self::with_keys(private_key, public_key, &der, ttl))
    }

    fn with_keys(
        private_key: RsaPrivateKey,
        public_key: RsaPublicKey,
        public_der: &[u8],
        ttl: Duration,
    ) -> Self {
        let digest = Sha256::digest(public_der);
        let key_id = hex::encode(&digest[..8]);

        Self {
            signing_key: SigningKey::new(private_key),
            verifying_key: VerifyingKey::new(public_key),
            key_id,
            ttl,
        }
    }

    /// Short fingerprint of the public key, sent as the `kid` header.
    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issues a token for `payer_account`, valid from now for the configured TTL.
    #[instrument(skip(self), level = "debug")]
    pub fn mint(&self, payer_account: &str) -> Result<String, AuthError> {
        let claims = ServiceClaims::new(payer_account, unix_now(), self.ttl.as_secs());

        let header = TokenHeader {
            alg: ALGORITHM.to_string(),
            typ: Some("JWT".to_string()),
            kid: Some(self.key_id.clone()),
        };
        let header_json = serde_json::to_vec(&header)
            .map_err(|e| AuthError::Signing(format!("header encoding failed: {e}")))?;
        let claims_json = serde_json::to_vec(&claims)
            .map_err(|e| AuthError::Signing(format!("claims encoding failed: {e}")))?;

        let signing_input = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(header_json),
            URL_SAFE_NO_PAD.encode(claims_json)
        );
        let signature = self
            .signing_key
            .try_sign(signing_input.as_bytes())
            .map_err(|e| AuthError::Signing(e.to_string()))?;

        debug!(exp = claims.exp, "Minted service token");
        Ok(format!(
            "{signing_input}.{}",
            URL_SAFE_NO_PAD.encode(signature.to_bytes())
        ))
    }

    /// Verifies a token against this authenticator's public key.
    ///
    /// # Errors
    ///
    /// - [`AuthError::MalformedToken`] if the token cannot be decoded
    /// - [`AuthError::SignatureInvalid`] if the signature does not verify
    /// - [`AuthError::Expired`] if the current time is past `exp`
    pub fn verify(&self, token: &str) -> Result<ServiceClaims, AuthError> {
        let mut parts = token.split('.');
        let (Some(header_b64), Some(claims_b64), Some(signature_b64), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(AuthError::MalformedToken(
                "expected three dot-separated segments".into(),
            ));
        };

        let header: TokenHeader = decode_segment(header_b64, "header")?;
        if header.alg != ALGORITHM {
            return Err(AuthError::MalformedToken(format!(
                "unexpected signing method: {}",
                header.alg
            )));
        }

        let signature_bytes = URL_SAFE_NO_PAD
            .decode(signature_b64)
            .map_err(|e| AuthError::MalformedToken(format!("signature encoding: {e}")))?;
        let signature = Signature::try_from(signature_bytes.as_slice())
            .map_err(|e| AuthError::MalformedToken(format!("signature: {e}")))?;

        let signing_input_len = header_b64.len() + 1 + claims_b64.len();
        self.verifying_key
            .verify(token[..signing_input_len].as_bytes(), &signature)
            .map_err(|_| AuthError::SignatureInvalid)?;

        let claims: ServiceClaims = decode_segment(claims_b64, "claims")?;
        if claims.is_expired_at(unix_now()) {
            return Err(AuthError::Expired {
                expired_at: claims.exp,
            });
        }

        Ok(claims)
    }

    /// `Authorization` header value for a ledger call.
    pub fn auth_header(&self, payer_account: &str) -> Result<String, AuthError> {
        Ok(format!("Bearer {}", self.mint(payer_account)?))
    }

    /// Generates a new 2048-bit RSA key pair for provisioning.
    pub fn generate_key_pair() -> Result<GeneratedKeyPair, AuthError> {
        let private_key = RsaPrivateKey::new(&mut rsa::rand_core::OsRng, GENERATED_KEY_BITS)
            .map_err(|e| AuthError::KeyParse(format!("key generation failed: {e}")))?;

        let private_pem = private_key
            .to_pkcs8_pem(LineEnding::LF)
            .map_err(|e| AuthError::KeyParse(format!("private key encoding failed: {e}")))?;
        let public_pem = private_key
            .to_public_key()
            .to_public_key_pem(LineEnding::LF)
            .map_err(|e| AuthError::KeyParse(format!("public key encoding failed: {e}")))?;

        Ok(GeneratedKeyPair {
            private_pem: private_pem.to_string(),
            public_pem,
        })
    }
}

impl CredentialIssuer for ServiceAuthenticator {
    fn issue_credential(&self, payer_account: &str) -> Result<String, AuthError> {
        self.mint(payer_account)
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

fn read_key(path: &Path) -> Result<Vec<u8>, AuthError> {
    std::fs::read(path).map_err(|source| AuthError::KeyLoad {
        path: path.to_path_buf(),
        source,
    })
}

fn decode_segment<T: serde::de::DeserializeOwned>(
    segment: &str,
    what: &str,
) -> Result<T, AuthError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|e| AuthError::MalformedToken(format!("{what} encoding: {e}")))?;
    serde_json::from_slice(&bytes).map_err(|e| AuthError::MalformedToken(format!("{what}: {e}")))
}

fn public_key_der(key: &RsaPublicKey) -> Result<Vec<u8>, AuthError> {
    key.to_pkcs1_der()
        .map(|doc| doc.as_bytes().to_vec())
        .map_err(|e| AuthError::KeyParse(format!("public key encoding failed: {e}")))
}

fn parse_private_key(data: &[u8]) -> Result<RsaPrivateKey, AuthError> {
    if let Ok(pem) = std::str::from_utf8(data) {
        if let Ok(key) = RsaPrivateKey::from_pkcs1_pem(pem) {
            return Ok(key);
        }
        if let Ok(key) = RsaPrivateKey::from_pkcs8_pem(pem) {
            return Ok(key);
        }
    }
    if let Ok(key) = RsaPrivateKey::from_pkcs1_der(data) {
        return Ok(key);
    }
    if let Ok(key) = RsaPrivateKey::from_pkcs8_der(data) {
        return Ok(key);
    }
    Err(AuthError::KeyParse(
        "private key is not an RSA key in PKCS#1 or PKCS#8 form".into(),
    ))
}

fn parse_public_key(data: &[u8]) -> Result<RsaPublicKey, AuthError> {
    if let Ok(pem) = std::str::from_utf8(data) {
        if let Ok(key) = RsaPublicKey::from_public_key_pem(pem) {
            return Ok(key);
        }
        if let Ok(key) = RsaPublicKey::from_pkcs1_pem(pem) {
            return Ok(key);
        }
    }
    if let Ok(key) = RsaPublicKey::from_public_key_der(data) {
        return Ok(key);
    }
    if let Ok(key) = RsaPublicKey::from_pkcs1_der(data) {
        return Ok(key);
    }
    Err(AuthError::KeyParse(
        "public key is not an RSA key in SubjectPublicKeyInfo or PKCS#1 form".into(),
    ))
}
