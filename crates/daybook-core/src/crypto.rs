//! Cryptographic primitives for the sealed journal store.
//!
//! Key derivation: PBKDF2-SHA256 with a fixed iteration count.
//! AEAD: AES-256-GCM, 12-byte IV, 16-byte tag stored detached.
//! Signatures: Ed25519, keypair regenerated per save, PEM-encoded
//! (PKCS#8 private, SPKI public).

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use ed25519_dalek::pkcs8::{
    DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey,
};
use pkcs8::LineEnding;
use ed25519_dalek::{Signature, Signer, SigningKey, VerifyingKey};
use pbkdf2::pbkdf2_hmac;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use crate::error::StoreError;

/// PBKDF2 cost parameter. Files sealed by different processes must remain
/// mutually decryptable, so this is a module constant, never a call-site
/// knob. Do not lower without a design review.
pub const PBKDF2_ITERATIONS: u32 = 100_000;
pub const DERIVED_KEY_LEN: usize = 32;
pub const SALT_LEN: usize = 16;
pub const IV_LEN: usize = 12;
pub const TAG_LEN: usize = 16;

/// Derive the 32-byte file key from a password + stored salt.
/// Same password + salt always yields the same key.
pub fn derive_key(password: &str, salt: &[u8]) -> Zeroizing<Vec<u8>> {
    let mut key = Zeroizing::new(vec![0u8; DERIVED_KEY_LEN]);
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, PBKDF2_ITERATIONS, &mut key);
    key
}

pub fn generate_salt() -> [u8; SALT_LEN] {
    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);
    salt
}

pub fn generate_iv() -> [u8; IV_LEN] {
    let mut iv = [0u8; IV_LEN];
    OsRng.fill_bytes(&mut iv);
    iv
}

/// Encrypt `plaintext`, returning (ciphertext, tag) separately — the wire
/// format stores the tag in its own field and hashes/signs the bare
/// ciphertext only.
pub fn encrypt(
    key: &[u8],
    iv: &[u8; IV_LEN],
    plaintext: &[u8],
) -> Result<(Vec<u8>, Vec<u8>), StoreError> {
    let cipher = Aes256Gcm::new_from_slice(key)
        .map_err(|_| StoreError::Crypto("invalid key length".into()))?;
    let mut ciphertext = cipher
        .encrypt(Nonce::from_slice(iv), plaintext)
        .map_err(|_| StoreError::Crypto("encryption failed".into()))?;
    let tag = ciphertext.split_off(ciphertext.len() - TAG_LEN);
    Ok((ciphertext, tag))
}

/// Decrypt detached-tag ciphertext. Every failure path — wrong password,
/// flipped ciphertext bit, mangled tag — reports the same generic error so
/// callers cannot be used as a password oracle.
pub fn decrypt(
    key: &[u8],
    iv: &[u8],
    ciphertext: &[u8],
    tag: &[u8],
) -> Result<Zeroizing<Vec<u8>>, StoreError> {
    if iv.len() != IV_LEN || tag.len() != TAG_LEN {
        return Err(StoreError::Crypto("decryption failed".into()));
    }
    let cipher = Aes256Gcm::new_from_slice(key)
        .map_err(|_| StoreError::Crypto("decryption failed".into()))?;
    let mut buf = Vec::with_capacity(ciphertext.len() + TAG_LEN);
    buf.extend_from_slice(ciphertext);
    buf.extend_from_slice(tag);
    let plaintext = cipher
        .decrypt(Nonce::from_slice(iv), buf.as_slice())
        .map_err(|_| StoreError::Crypto("decryption failed".into()))?;
    Ok(Zeroizing::new(plaintext))
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

pub fn generate_signing_key() -> SigningKey {
    SigningKey::generate(&mut OsRng)
}

pub fn signing_key_to_pem(key: &SigningKey) -> Result<Zeroizing<String>, StoreError> {
    key.to_pkcs8_pem(LineEnding::LF)
        .map_err(|e| StoreError::Crypto(format!("private key encode: {e}")))
}

pub fn signing_key_from_pem(pem: &str) -> Result<SigningKey, StoreError> {
    SigningKey::from_pkcs8_pem(pem)
        .map_err(|e| StoreError::Crypto(format!("private key decode: {e}")))
}

pub fn verifying_key_to_pem(key: &VerifyingKey) -> Result<String, StoreError> {
    key.to_public_key_pem(LineEnding::LF)
        .map_err(|e| StoreError::Crypto(format!("public key encode: {e}")))
}

pub fn verifying_key_from_pem(pem: &str) -> Result<VerifyingKey, StoreError> {
    VerifyingKey::from_public_key_pem(pem)
        .map_err(|e| StoreError::Crypto(format!("public key decode: {e}")))
}

pub fn sign_bytes(key: &SigningKey, bytes: &[u8]) -> Signature {
    key.sign(bytes)
}

pub fn verify_signature(
    public: &VerifyingKey,
    bytes: &[u8],
    sig_bytes: &[u8],
) -> Result<(), StoreError> {
    let sig = Signature::from_slice(sig_bytes)
        .map_err(|_| StoreError::Integrity("signature verification failed".into()))?;
    public
        .verify_strict(bytes, &sig)
        .map_err(|_| StoreError::Integrity("signature verification failed".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_derivation_deterministic() {
        let salt = generate_salt();
        let k1 = derive_key("hunter2", &salt);
        let k2 = derive_key("hunter2", &salt);
        assert_eq!(*k1, *k2);
        let k3 = derive_key("hunter3", &salt);
        assert_ne!(*k1, *k3);
    }

    #[test]
    fn different_salt_different_key() {
        let k1 = derive_key("hunter2", &generate_salt());
        let k2 = derive_key("hunter2", &generate_salt());
        assert_ne!(*k1, *k2);
    }

    #[test]
    fn aead_round_trip_with_detached_tag() {
        let key = derive_key("pw", &generate_salt());
        let iv = generate_iv();
        let (ct, tag) = encrypt(&key, &iv, b"journal bytes").unwrap();
        assert_eq!(tag.len(), TAG_LEN);
        assert_ne!(ct.as_slice(), b"journal bytes");
        let pt = decrypt(&key, &iv, &ct, &tag).unwrap();
        assert_eq!(&*pt, b"journal bytes");
    }

    #[test]
    fn wrong_key_fails_decryption() {
        let salt = generate_salt();
        let iv = generate_iv();
        let (ct, tag) = encrypt(&derive_key("right", &salt), &iv, b"secret").unwrap();
        let err = decrypt(&derive_key("wrong", &salt), &iv, &ct, &tag).unwrap_err();
        assert!(matches!(err, StoreError::Crypto(_)));
    }

    #[test]
    fn tampered_tag_fails_decryption() {
        let key = derive_key("pw", &generate_salt());
        let iv = generate_iv();
        let (ct, mut tag) = encrypt(&key, &iv, b"secret").unwrap();
        tag[0] ^= 0xff;
        assert!(matches!(
            decrypt(&key, &iv, &ct, &tag),
            Err(StoreError::Crypto(_))
        ));
    }

    #[test]
    fn pem_round_trip_and_signature() {
        let signing = generate_signing_key();
        let priv_pem = signing_key_to_pem(&signing).unwrap();
        let pub_pem = verifying_key_to_pem(&signing.verifying_key()).unwrap();
        assert!(priv_pem.contains("BEGIN PRIVATE KEY"));
        assert!(pub_pem.contains("BEGIN PUBLIC KEY"));

        let restored = signing_key_from_pem(&priv_pem).unwrap();
        let sig = sign_bytes(&restored, b"payload");
        let verifying = verifying_key_from_pem(&pub_pem).unwrap();
        verify_signature(&verifying, b"payload", &sig.to_bytes()).unwrap();

        let err = verify_signature(&verifying, b"other payload", &sig.to_bytes()).unwrap_err();
        assert!(err.to_string().contains("signature verification failed"));
    }
}
