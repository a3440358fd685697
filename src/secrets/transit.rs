//! Transit encryption for remote vault payloads.
//!
//! The vault service never returns plaintext. For every request the client
//! sends its RSA public key; the service encrypts the secret value with a
//! fresh AES-GCM key and wraps that key with RSA-OAEP (SHA-256 for both the
//! hash and MGF1, empty label). The response carries:
//!
//! - `value`: base64 AES-GCM ciphertext without the tag
//! - `encryption.encryptedAES`: base64 RSA-OAEP wrapped AES key
//! - `encryption.authTag`: base64 16-byte GCM tag
//! - `encryption.iv`: base64 of 12 random bytes
//!
//! The GCM nonce is not the `iv` itself but its lowercase hex rendering,
//! 24 ASCII bytes. Non-96-bit nonces go through GHASH, so the AEAD is
//! `AesGcm<_, U24>` from the `aes-gcm` crate. Decryption uses empty
//! associated data and a tag mismatch is always fatal.

use aes_gcm::aead::consts::{U16, U24};
use aes_gcm::aead::{AeadCore, AeadInPlace, KeyInit};
use aes_gcm::aes::{Aes128, Aes256};
use aes_gcm::{AesGcm, Nonce, Tag};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use ring::rand::{SecureRandom, SystemRandom};
use rsa::pkcs8::{DecodePublicKey, EncodePublicKey};
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::fmt;
use tracing::{debug, error, instrument};
use zeroize::Zeroizing;

use super::error::{Result, VaultError};

/// Encryption scheme requested from, and expected back from, the service.
pub const ENCRYPTION_SCHEME: &str = "robocloud-vault-transit-v2";

/// Size of the session RSA modulus in bits
const RSA_KEY_BITS: usize = 2048;

/// Size of the decoded `iv` field in bytes
const IV_SIZE: usize = 12;

/// Size of AES-GCM tag in bytes
const TAG_SIZE: usize = 16;

/// AES-128-GCM keyed for the hex-encoded 24-byte nonce
type Aes128GcmHex = AesGcm<Aes128, U24>;

/// AES-256-GCM keyed for the hex-encoded 24-byte nonce
type Aes256GcmHex = AesGcm<Aes256, U24>;

/// Encryption metadata attached to a secret response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptionInfo {
    pub encryption_scheme: String,
    #[serde(rename = "encryptedAES")]
    pub encrypted_aes: String,
    pub auth_tag: String,
    pub iv: String,
}

/// Secret response body returned by the vault service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecretPayload {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Base64 ciphertext of the JSON-encoded field mapping.
    pub value: String,
    pub encryption: EncryptionInfo,
}

fn decode_field(field: &str, value: &str) -> Result<Vec<u8>> {
    STANDARD
        .decode(value)
        .map_err(|e| VaultError::vault_access(format!("Invalid base64 in '{}': {}", field, e)))
}

fn check_key_len(key_len: usize) -> Result<()> {
    match key_len {
        16 | 32 => Ok(()),
        n => Err(VaultError::vault_access(format!(
            "Unsupported AES key length: {} bytes (expected 16 or 32)",
            n
        ))),
    }
}

/// GCM nonce for a decoded `iv`: its lowercase hex digits as ASCII bytes.
fn gcm_nonce(iv: &[u8]) -> Result<[u8; IV_SIZE * 2]> {
    if iv.len() != IV_SIZE {
        return Err(VaultError::vault_access(format!(
            "Invalid IV length: expected {} bytes, got {} bytes",
            IV_SIZE,
            iv.len()
        )));
    }

    let mut nonce = [0u8; IV_SIZE * 2];
    nonce.copy_from_slice(hex::encode(iv).as_bytes());
    Ok(nonce)
}

fn oaep() -> Oaep {
    Oaep::new::<Sha256>()
}

/// Per-adapter RSA keypair used to receive transit-encrypted payloads.
///
/// Generated once and held in memory only. The public half is exported as
/// base64 SubjectPublicKeyInfo DER and reused for every request.
pub struct TransitKeypair {
    private_key: RsaPrivateKey,
    public_key_b64: String,
}

impl fmt::Debug for TransitKeypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransitKeypair")
            .field("bits", &RSA_KEY_BITS)
            .field("private_key", &"[REDACTED]")
            .finish()
    }
}

impl TransitKeypair {
    /// Generate a fresh keypair (public exponent 65537).
    pub fn generate() -> Result<Self> {
        let mut rng = rand::thread_rng();
        let private_key = RsaPrivateKey::new(&mut rng, RSA_KEY_BITS).map_err(|e| {
            error!(error = %e, "Failed to generate transit keypair");
            VaultError::vault_access(format!("Failed to generate transit keypair: {}", e))
        })?;

        let der = private_key.to_public_key().to_public_key_der().map_err(|e| {
            VaultError::vault_access(format!("Failed to encode transit public key: {}", e))
        })?;
        let public_key_b64 = STANDARD.encode(der.as_bytes());

        debug!(bits = RSA_KEY_BITS, "Generated transit keypair");

        Ok(Self { private_key, public_key_b64 })
    }

    /// Base64 DER (SPKI) encoding of the public key.
    pub fn public_key_base64(&self) -> &str {
        &self.public_key_b64
    }

    /// Decrypt the `value` of a payload, returning the raw plaintext bytes.
    ///
    /// # Errors
    ///
    /// - [`VaultError::VaultAccess`] on an unexpected scheme, malformed
    ///   fields, key unwrap failure or GCM authentication failure
    #[instrument(skip(self, payload), fields(secret = %payload.name))]
    pub fn decrypt(&self, payload: &SecretPayload) -> Result<Zeroizing<Vec<u8>>> {
        let encryption = &payload.encryption;

        if encryption.encryption_scheme != ENCRYPTION_SCHEME {
            return Err(VaultError::vault_access(format!(
                "Unexpected encryption scheme '{}' (expected '{}')",
                encryption.encryption_scheme, ENCRYPTION_SCHEME
            )));
        }

        let wrapped_key = decode_field("encryptedAES", &encryption.encrypted_aes)?;
        let auth_tag = decode_field("authTag", &encryption.auth_tag)?;
        let iv = decode_field("iv", &encryption.iv)?;
        let ciphertext = decode_field("value", &payload.value)?;

        if auth_tag.len() != TAG_SIZE {
            return Err(VaultError::vault_access(format!(
                "Invalid auth tag length: expected {} bytes, got {} bytes",
                TAG_SIZE,
                auth_tag.len()
            )));
        }

        let aes_key = Zeroizing::new(self.private_key.decrypt(oaep(), &wrapped_key).map_err(
            |e| {
                error!("Failed to unwrap AES key");
                VaultError::vault_access(format!("Failed to decrypt AES key: {}", e))
            },
        )?);

        let mut buffer = Zeroizing::new(ciphertext);
        open_in_place(&aes_key, &iv, &auth_tag, &mut buffer)?;

        debug!(plaintext_len = buffer.len(), "Decrypted transit payload");

        Ok(buffer)
    }
}

/// Opens `buffer` (ciphertext without the tag) in place.
fn open_in_place(key: &[u8], iv: &[u8], tag: &[u8], buffer: &mut [u8]) -> Result<()> {
    check_key_len(key.len())?;
    let nonce = gcm_nonce(iv)?;

    let opened = match key.len() {
        16 => open_with::<Aes128GcmHex>(key, &nonce, tag, buffer),
        _ => open_with::<Aes256GcmHex>(key, &nonce, tag, buffer),
    };

    opened.map_err(|_| {
        error!("Decryption failed - possible tampering or wrong key");
        VaultError::vault_access("Failed to decrypt secret payload - authentication failed")
    })
}

fn open_with<C>(key: &[u8], nonce: &[u8], tag: &[u8], buffer: &mut [u8]) -> Result<()>
where
    C: KeyInit + AeadInPlace + AeadCore<NonceSize = U24, TagSize = U16>,
{
    let cipher = C::new_from_slice(key)
        .map_err(|_| VaultError::vault_access("Failed to create decryption key"))?;

    cipher
        .decrypt_in_place_detached(
            Nonce::<U24>::from_slice(nonce),
            b"",
            buffer,
            Tag::<U16>::from_slice(tag),
        )
        .map_err(|_| VaultError::vault_access("Failed to decrypt secret payload"))
}

fn seal_with<C>(key: &[u8], nonce: &[u8], buffer: &mut [u8]) -> Result<Tag<U16>>
where
    C: KeyInit + AeadInPlace + AeadCore<NonceSize = U24, TagSize = U16>,
{
    let cipher = C::new_from_slice(key)
        .map_err(|_| VaultError::vault_access("Failed to create encryption key"))?;

    cipher
        .encrypt_in_place_detached(Nonce::<U24>::from_slice(nonce), b"", buffer)
        .map_err(|_| VaultError::vault_access("Failed to encrypt secret payload"))
}

/// Encrypt `plaintext` for the holder of `public_key_b64`, the way the vault
/// service does. Used to build fixtures and by test doubles of the service.
///
/// `aes_key_len` is 16 or 32 bytes.
pub fn seal_payload(
    public_key_b64: &str,
    name: &str,
    description: Option<&str>,
    plaintext: &[u8],
    aes_key_len: usize,
) -> Result<SecretPayload> {
    check_key_len(aes_key_len)?;
    let rng = SystemRandom::new();

    let mut aes_key = Zeroizing::new(vec![0u8; aes_key_len]);
    let mut iv = [0u8; IV_SIZE];
    rng.fill(&mut aes_key)
        .and_then(|_| rng.fill(&mut iv))
        .map_err(|_| VaultError::vault_access("Failed to generate random key material"))?;
    let nonce = gcm_nonce(&iv)?;

    let mut ciphertext = plaintext.to_vec();
    let tag = match aes_key_len {
        16 => seal_with::<Aes128GcmHex>(&aes_key, &nonce, &mut ciphertext)?,
        _ => seal_with::<Aes256GcmHex>(&aes_key, &nonce, &mut ciphertext)?,
    };

    let der = STANDARD
        .decode(public_key_b64)
        .map_err(|e| VaultError::vault_access(format!("Invalid base64 public key: {}", e)))?;
    let public_key = RsaPublicKey::from_public_key_der(&der)
        .map_err(|e| VaultError::vault_access(format!("Invalid public key: {}", e)))?;
    let wrapped_key = public_key
        .encrypt(&mut rand::thread_rng(), oaep(), &aes_key)
        .map_err(|e| VaultError::vault_access(format!("Failed to wrap AES key: {}", e)))?;

    Ok(SecretPayload {
        name: name.to_string(),
        description: description.map(str::to_string),
        value: STANDARD.encode(&ciphertext),
        encryption: EncryptionInfo {
            encryption_scheme: ENCRYPTION_SCHEME.to_string(),
            encrypted_aes: STANDARD.encode(wrapped_key),
            auth_tag: STANDARD.encode(tag.as_slice()),
            iv: STANDARD.encode(iv),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use once_cell::sync::Lazy;

    // Key generation is slow in debug builds; share one keypair across tests.
    static KEYPAIR: Lazy<TransitKeypair> = Lazy::new(|| TransitKeypair::generate().unwrap());

    #[test]
    fn test_public_key_is_spki_der() {
        let der = STANDARD.decode(KEYPAIR.public_key_base64()).unwrap();
        let public_key = RsaPublicKey::from_public_key_der(&der).unwrap();

        use rsa::traits::PublicKeyParts;
        assert_eq!(public_key.size() * 8, RSA_KEY_BITS);
        assert_eq!(public_key.e(), &rsa::BigUint::from(65537u32));
    }

    #[test]
    fn test_roundtrip_aes_128_and_256() {
        for key_len in [16, 32] {
            let payload = seal_payload(
                KEYPAIR.public_key_base64(),
                "mock-name",
                Some("mock-desc"),
                br#"{"mock-key":"mock-value"}"#,
                key_len,
            )
            .unwrap();

            let plaintext = KEYPAIR.decrypt(&payload).unwrap();
            assert_eq!(plaintext.as_slice(), br#"{"mock-key":"mock-value"}"#);
        }
    }

    /// Encrypts the way the vault service does: AES-128-GCM over the hex
    /// digits of a random 12-byte iv, key wrapped with RSA-OAEP-SHA256.
    fn service_payload(public_key: &RsaPublicKey, plaintext: &[u8]) -> SecretPayload {
        use aes_gcm::aead::Aead;

        let key = [7u8; 16];
        let iv: [u8; 12] = rand::random();
        let nonce = hex::encode(iv);
        let sealed = Aes128GcmHex::new_from_slice(&key)
            .unwrap()
            .encrypt(Nonce::<U24>::from_slice(nonce.as_bytes()), plaintext)
            .unwrap();
        let (ciphertext, tag) = sealed.split_at(sealed.len() - TAG_SIZE);
        let wrapped = public_key.encrypt(&mut rand::thread_rng(), oaep(), &key).unwrap();

        SecretPayload {
            name: "mock-name".to_string(),
            description: Some("mock-desc".to_string()),
            value: STANDARD.encode(ciphertext),
            encryption: EncryptionInfo {
                encryption_scheme: ENCRYPTION_SCHEME.to_string(),
                encrypted_aes: STANDARD.encode(wrapped),
                auth_tag: STANDARD.encode(tag),
                iv: STANDARD.encode(iv),
            },
        }
    }

    #[test]
    fn test_decrypts_service_encrypted_payload() {
        let der = STANDARD.decode(KEYPAIR.public_key_base64()).unwrap();
        let public_key = RsaPublicKey::from_public_key_der(&der).unwrap();
        let payload = service_payload(&public_key, br#"{"mock-key":"mock-value"}"#);

        let plaintext = KEYPAIR.decrypt(&payload).unwrap();
        assert_eq!(plaintext.as_slice(), br#"{"mock-key":"mock-value"}"#);
    }

    #[test]
    fn test_raw_iv_as_nonce_does_not_authenticate() {
        use aes_gcm::aead::Aead;
        use aes_gcm::Aes128Gcm;

        let der = STANDARD.decode(KEYPAIR.public_key_base64()).unwrap();
        let public_key = RsaPublicKey::from_public_key_der(&der).unwrap();
        let mut payload = service_payload(&public_key, b"{}");

        // Re-encrypt with the 12 iv bytes used directly as a 96-bit nonce
        let iv = STANDARD.decode(&payload.encryption.iv).unwrap();
        let sealed = Aes128Gcm::new_from_slice(&[7u8; 16])
            .unwrap()
            .encrypt(aes_gcm::Nonce::from_slice(&iv), b"{}".as_slice())
            .unwrap();
        let (ciphertext, tag) = sealed.split_at(sealed.len() - TAG_SIZE);
        payload.value = STANDARD.encode(ciphertext);
        payload.encryption.auth_tag = STANDARD.encode(tag);

        let err = KEYPAIR.decrypt(&payload).unwrap_err();
        assert!(err.to_string().contains("authentication failed"));
    }

    #[test]
    fn test_nonce_is_lowercase_hex_of_iv() {
        let nonce = gcm_nonce(&[0xab, 0x01, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0xff]).unwrap();
        assert_eq!(&nonce, b"ab01000000000000000000ff");
        assert!(gcm_nonce(&[0u8; 24]).is_err());
    }

    #[test]
    fn test_tampered_tag_is_fatal() {
        let mut payload =
            seal_payload(KEYPAIR.public_key_base64(), "s", None, b"{}", 16).unwrap();

        let mut tag = STANDARD.decode(&payload.encryption.auth_tag).unwrap();
        tag[0] ^= 0x01;
        payload.encryption.auth_tag = STANDARD.encode(tag);

        let err = KEYPAIR.decrypt(&payload).unwrap_err();
        assert!(matches!(err, VaultError::VaultAccess { .. }));
    }

    #[test]
    fn test_tampered_ciphertext_is_fatal() {
        let mut payload =
            seal_payload(KEYPAIR.public_key_base64(), "s", None, b"{\"a\":\"b\"}", 32).unwrap();

        let mut value = STANDARD.decode(&payload.value).unwrap();
        value[0] ^= 0xff;
        payload.value = STANDARD.encode(value);

        assert!(KEYPAIR.decrypt(&payload).is_err());
    }

    #[test]
    fn test_unexpected_scheme_is_rejected() {
        let mut payload = seal_payload(KEYPAIR.public_key_base64(), "s", None, b"{}", 16).unwrap();
        payload.encryption.encryption_scheme = "robocloud-vault-transit-v1".to_string();

        let err = KEYPAIR.decrypt(&payload).unwrap_err();
        assert!(err.to_string().contains("robocloud-vault-transit-v1"));
    }

    #[test]
    fn test_wrong_keypair_cannot_unwrap() {
        let other = TransitKeypair::generate().unwrap();
        let payload = seal_payload(other.public_key_base64(), "s", None, b"{}", 16).unwrap();

        let err = KEYPAIR.decrypt(&payload).unwrap_err();
        assert!(matches!(err, VaultError::VaultAccess { .. }));
    }

    #[test]
    fn test_invalid_iv_and_tag_lengths() {
        let mut payload = seal_payload(KEYPAIR.public_key_base64(), "s", None, b"{}", 16).unwrap();
        payload.encryption.iv = STANDARD.encode([0u8; 16]);
        assert!(KEYPAIR.decrypt(&payload).unwrap_err().to_string().contains("IV length"));

        let mut payload = seal_payload(KEYPAIR.public_key_base64(), "s", None, b"{}", 16).unwrap();
        payload.encryption.auth_tag = STANDARD.encode([0u8; 8]);
        assert!(KEYPAIR.decrypt(&payload).unwrap_err().to_string().contains("auth tag"));
    }

    #[test]
    fn test_payload_wire_names() {
        let payload = seal_payload(KEYPAIR.public_key_base64(), "s", None, b"{}", 16).unwrap();
        let json = serde_json::to_value(&payload).unwrap();

        let encryption = json["encryption"].as_object().unwrap();
        for key in ["encryptionScheme", "encryptedAES", "authTag", "iv"] {
            assert!(encryption.contains_key(key), "missing {key}");
        }
    }

    #[test]
    fn test_debug_hides_private_key() {
        let rendered = format!("{:?}", *KEYPAIR);
        assert!(rendered.contains("[REDACTED]"));
        assert!(!rendered.contains("BEGIN"));
    }
}
