//! SealedStore: password-sealed, tamper-evident persistence of one opaque
//! payload as a ciphertext file + public-key file pair.
//!
//! Ciphertext file layout (JSON):
//!   timestamp — save time, RFC 3339
//!   hash      — hex SHA-256 of the ciphertext bytes
//!   salt/iv/tag/data/signature — base64
//!
//! The Ed25519 signature covers the ciphertext bytes (not plaintext, not
//! tag) and verifies under the paired public-key file. The hash is checked
//! as well: redundant for tamper detection given the signature, but a cheap
//! pre-check before the expensive key derivation.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use zeroize::Zeroizing;

use crate::crypto;
use crate::error::StoreError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SealedFile {
    pub timestamp: DateTime<Utc>,
    pub hash: String,
    pub salt: String,
    pub iv: String,
    pub tag: String,
    pub data: String,
    pub signature: String,
}

#[derive(Serialize)]
struct PlaintextRef<'a, T: Serialize> {
    payload: &'a T,
    #[serde(rename = "privateKey")]
    private_key: &'a str,
}

#[derive(Deserialize)]
struct Plaintext<T> {
    payload: T,
    #[serde(rename = "privateKey")]
    private_key: String,
}

/// Result of a successful unseal: the decoded payload plus the PEM private
/// key that produced the file's signature.
#[derive(Debug, Clone, Serialize)]
pub struct Unsealed<T> {
    pub payload: T,
    #[serde(rename = "privateKey")]
    pub private_key: String,
}

#[derive(Debug, Clone)]
pub struct SealedStore {
    data_path: PathBuf,
    public_key_path: PathBuf,
}

impl SealedStore {
    pub fn new(data_path: impl Into<PathBuf>, public_key_path: impl Into<PathBuf>) -> Self {
        Self {
            data_path: data_path.into(),
            public_key_path: public_key_path.into(),
        }
    }

    pub fn data_path(&self) -> &Path {
        &self.data_path
    }

    pub fn public_key_path(&self) -> &Path {
        &self.public_key_path
    }

    pub fn exists(&self) -> bool {
        self.data_path.exists()
    }

    /// Seal `payload` under `password`, replacing both files. A fresh
    /// signing keypair is generated for this save only; the private half is
    /// embedded in the plaintext, the public half replaces the key file.
    pub fn seal<T: Serialize>(&self, password: &str, payload: &T) -> Result<(), StoreError> {
        let salt = crypto::generate_salt();
        let iv = crypto::generate_iv();
        let key = crypto::derive_key(password, &salt);

        let signing_key = crypto::generate_signing_key();
        let private_pem = crypto::signing_key_to_pem(&signing_key)?;
        let public_pem = crypto::verifying_key_to_pem(&signing_key.verifying_key())?;

        let plaintext = Zeroizing::new(serde_json::to_vec(&PlaintextRef {
            payload,
            private_key: private_pem.as_str(),
        })?);

        let (ciphertext, tag) = crypto::encrypt(&key, &iv, &plaintext)?;
        let hash = crypto::sha256_hex(&ciphertext);
        let signature = crypto::sign_bytes(&signing_key, &ciphertext);

        let file = SealedFile {
            timestamp: Utc::now(),
            hash,
            salt: STANDARD.encode(salt),
            iv: STANDARD.encode(iv),
            tag: STANDARD.encode(&tag),
            data: STANDARD.encode(&ciphertext),
            signature: STANDARD.encode(signature.to_bytes()),
        };

        // Each file goes through temp-then-rename so a crash never exposes
        // a half-written file. The pair itself is not atomically coupled; a
        // crash between the two renames leaves a mismatch the next unseal
        // rejects as an integrity failure.
        write_atomic(&self.data_path, &serde_json::to_vec_pretty(&file)?)?;
        write_atomic(&self.public_key_path, public_pem.as_bytes())?;
        Ok(())
    }

    /// Verify and decrypt the current file pair. Verification order is
    /// fixed: signature, then hash, then key derivation + decryption.
    pub fn unseal<T: DeserializeOwned>(&self, password: &str) -> Result<Unsealed<T>, StoreError> {
        let file_bytes = fs::read(&self.data_path)?;
        let public_pem = fs::read_to_string(&self.public_key_path)?;
        let file: SealedFile = serde_json::from_slice(&file_bytes)?;

        let ciphertext = STANDARD.decode(&file.data)?;
        let signature = STANDARD.decode(&file.signature)?;
        let verifying_key = crypto::verifying_key_from_pem(&public_pem)?;
        crypto::verify_signature(&verifying_key, &ciphertext, &signature)?;

        if crypto::sha256_hex(&ciphertext) != file.hash {
            return Err(StoreError::Integrity("hash mismatch".into()));
        }

        let salt = STANDARD.decode(&file.salt)?;
        let iv = STANDARD.decode(&file.iv)?;
        let tag = STANDARD.decode(&file.tag)?;
        let key = crypto::derive_key(password, &salt);
        let plaintext = crypto::decrypt(&key, &iv, &ciphertext, &tag)?;

        let parsed: Plaintext<T> = serde_json::from_slice(&plaintext)?;
        Ok(Unsealed {
            payload: parsed.payload,
            private_key: parsed.private_key,
        })
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| StoreError::Io(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    fn store_in(dir: &Path) -> SealedStore {
        SealedStore::new(dir.join("data.json"), dir.join("data.pub"))
    }

    #[test]
    fn seal_unseal_round_trip() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path());
        let payload = json!({
            "title": "Test",
            "days": {
                "2024-01-01": {
                    "summary": "New Year",
                    "entries": [
                        {"id": "1", "timestamp": "2024-01-01T00:00:00.000Z", "content": "Hello"}
                    ]
                }
            }
        });

        store.seal("supersecret", &payload).unwrap();
        let result: Unsealed<serde_json::Value> = store.unseal("supersecret").unwrap();
        assert_eq!(result.payload, payload);
        assert!(result.private_key.contains("BEGIN PRIVATE KEY"));
    }

    #[test]
    fn signing_keypair_rotates_every_save() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path());
        store.seal("pw", &json!({"v": 1})).unwrap();
        let pub1 = fs::read_to_string(store.public_key_path()).unwrap();
        let key1 = store
            .unseal::<serde_json::Value>("pw")
            .unwrap()
            .private_key;
        store.seal("pw", &json!({"v": 2})).unwrap();
        let pub2 = fs::read_to_string(store.public_key_path()).unwrap();
        let key2 = store
            .unseal::<serde_json::Value>("pw")
            .unwrap()
            .private_key;
        assert_ne!(pub1, pub2);
        assert_ne!(key1, key2);
    }

    #[test]
    fn tampered_ciphertext_fails_signature_check() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path());
        store.seal("pw", &json!({"x": 1})).unwrap();

        let mut file: SealedFile =
            serde_json::from_slice(&fs::read(store.data_path()).unwrap()).unwrap();
        let mut data = STANDARD.decode(&file.data).unwrap();
        data[0] ^= 0xff;
        file.data = STANDARD.encode(&data);
        fs::write(store.data_path(), serde_json::to_vec(&file).unwrap()).unwrap();

        let err = store.unseal::<serde_json::Value>("pw").unwrap_err();
        assert!(err.to_string().contains("signature verification failed"));
    }

    #[test]
    fn stale_hash_reported_as_mismatch() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path());
        store.seal("pw", &json!({"x": 1})).unwrap();

        // Signature intact, hash field rewritten: the hash pre-check fires.
        let mut file: SealedFile =
            serde_json::from_slice(&fs::read(store.data_path()).unwrap()).unwrap();
        file.hash = crypto::sha256_hex(b"somebody else's bytes");
        fs::write(store.data_path(), serde_json::to_vec(&file).unwrap()).unwrap();

        let err = store.unseal::<serde_json::Value>("pw").unwrap_err();
        assert!(err.to_string().contains("hash mismatch"));
    }

    #[test]
    fn wrong_password_same_class_as_corrupt_tag() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path());
        store.seal("right", &json!({"x": 1})).unwrap();

        let wrong_pw = store.unseal::<serde_json::Value>("wrong").unwrap_err();

        // Corrupt only the tag: signature and hash still verify, so the
        // failure comes from decryption, exactly like a wrong password.
        let mut file: SealedFile =
            serde_json::from_slice(&fs::read(store.data_path()).unwrap()).unwrap();
        let mut tag = STANDARD.decode(&file.tag).unwrap();
        tag[0] ^= 0xff;
        file.tag = STANDARD.encode(&tag);
        fs::write(store.data_path(), serde_json::to_vec(&file).unwrap()).unwrap();
        let corrupt = store.unseal::<serde_json::Value>("right").unwrap_err();

        assert!(matches!(wrong_pw, StoreError::Crypto(_)));
        assert!(matches!(corrupt, StoreError::Crypto(_)));
        assert_eq!(wrong_pw.to_string(), corrupt.to_string());
    }

    #[test]
    fn wire_format_fields_present() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path());
        store.seal("pw", &json!({"x": 1})).unwrap();

        let file: SealedFile =
            serde_json::from_slice(&fs::read(store.data_path()).unwrap()).unwrap();
        assert_eq!(STANDARD.decode(&file.salt).unwrap().len(), 16);
        assert_eq!(STANDARD.decode(&file.iv).unwrap().len(), 12);
        assert_eq!(STANDARD.decode(&file.tag).unwrap().len(), 16);
        assert_eq!(STANDARD.decode(&file.signature).unwrap().len(), 64);
        assert_eq!(file.hash.len(), 64);
        assert_eq!(
            file.hash,
            crypto::sha256_hex(&STANDARD.decode(&file.data).unwrap())
        );
        let pub_pem = fs::read_to_string(store.public_key_path()).unwrap();
        assert!(pub_pem.contains("BEGIN PUBLIC KEY"));
    }
}
