//! daybook-core — encrypted persistence for a personal journal
//!
//! # Storage strategy
//! The whole document is sealed into a single tamper-evident file pair:
//! - a JSON ciphertext file: AES-256-GCM under a PBKDF2-derived key, plus a
//!   SHA-256 digest and an Ed25519 signature over the ciphertext bytes.
//! - a plaintext SPKI PEM public key, replaced together with the ciphertext
//!   on every save.
//!
//! The signing keypair is regenerated on every save; the private half rides
//! inside the encrypted payload so whoever can decrypt can also prove
//! authorship of the most recent save.
//!
//! # Module layout
//! - `crypto`     — KDF / AEAD / digest / Ed25519 primitives
//! - `sealed`     — SealedStore: seal/unseal the file pair
//! - `journal`    — typed document model and mutation operations
//! - `transactor` — FIFO-serialized read/update over one store
//! - `error`      — unified error type

pub mod crypto;
pub mod error;
pub mod journal;
pub mod sealed;
pub mod transactor;

pub use error::StoreError;
pub use journal::{Day, Entry, Journal};
pub use sealed::{SealedFile, SealedStore, Unsealed};
pub use transactor::JournalTransactor;
