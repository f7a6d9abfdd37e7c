//! Gateway checksum codec.
//!
//! The payment gateway authenticates both directions of the integration
//! with a signature field (`CHECKSUMHASH`) computed over the transaction
//! parameters: the parameter values are canonicalized, salted, hashed
//! with SHA-256, and the hash-plus-salt is encrypted with AES-128-CBC
//! under the shared merchant key, then base64 encoded. The salt makes
//! repeated signatures over identical parameters distinct; encryption
//! keeps the salt out of the clear.
//!
//! Verification is a pure function of (params, key, signature) and never
//! fails loudly: malformed base64, bad padding, a wrong key, or a
//! truncated plaintext all resolve to `false`.
//!
//! The initialization vector is fixed and public - required for wire
//! compatibility with the gateway's own signer.

use std::collections::BTreeMap;

use aes::Aes128;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use cbc::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use rand::Rng;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::error::{AppError, Result};

type Aes128CbcEnc = cbc::Encryptor<Aes128>;
type Aes128CbcDec = cbc::Decryptor<Aes128>;

/// Name of the signature field; always excluded from canonicalization.
pub const SIGNATURE_FIELD: &str = "CHECKSUMHASH";

/// Fixed IV shared with the gateway's signer.
const IV: &[u8; 16] = b"@@@@&&&&####$$$$";

/// Length of the random salt appended to the canonical string.
const SALT_LEN: usize = 4;

/// Build the canonical string: values of all parameters except the
/// signature field, sorted by key name (BTreeMap order is byte-wise
/// ascending), skipping empty or whitespace-only values, joined by `|`.
///
/// Absent optional fields and empty-valued fields canonicalize
/// identically, matching the gateway's signer.
fn canonical_string(params: &BTreeMap<String, String>) -> String {
    params
        .iter()
        .filter(|(k, _)| k.as_str() != SIGNATURE_FIELD)
        .map(|(_, v)| v.as_str())
        .filter(|v| !v.trim().is_empty())
        .collect::<Vec<_>>()
        .join("|")
}

fn random_salt() -> String {
    rand::thread_rng()
        .sample_iter(&rand::distributions::Alphanumeric)
        .take(SALT_LEN)
        .map(char::from)
        .collect()
}

fn encrypt(plaintext: &str, key: &str) -> Result<String> {
    let cipher = Aes128CbcEnc::new_from_slices(key.as_bytes(), IV).map_err(|_| {
        AppError::Internal(format!(
            "Merchant key must be 16 bytes, got {}",
            key.len()
        ))
    })?;
    let ciphertext = cipher.encrypt_padded_vec_mut::<Pkcs7>(plaintext.as_bytes());
    Ok(BASE64.encode(ciphertext))
}

fn decrypt(signature: &str, key: &str) -> Option<String> {
    let ciphertext = BASE64.decode(signature.trim()).ok()?;
    let cipher = Aes128CbcDec::new_from_slices(key.as_bytes(), IV).ok()?;
    let plaintext = cipher.decrypt_padded_vec_mut::<Pkcs7>(&ciphertext).ok()?;
    String::from_utf8(plaintext).ok()
}

fn salted_hash(params: &BTreeMap<String, String>, salt: &str) -> String {
    let data = format!("{}|{}", canonical_string(params), salt);
    hex::encode(Sha256::digest(data.as_bytes()))
}

/// Sign a parameter bag with the merchant key.
///
/// A fresh salt is generated per call, so signing identical parameters
/// twice produces different signatures that both verify.
pub fn sign(params: &BTreeMap<String, String>, key: &str) -> Result<String> {
    let salt = random_salt();
    let hash = salted_hash(params, &salt);
    encrypt(&format!("{}{}", hash, salt), key)
}

/// Verify a signature against a parameter bag and the merchant key.
///
/// Any decode, decrypt, or format failure is a verification failure,
/// never an error.
pub fn verify(params: &BTreeMap<String, String>, key: &str, signature: &str) -> bool {
    let Some(decrypted) = decrypt(signature, key) else {
        return false;
    };
    if decrypted.len() <= SALT_LEN || !decrypted.is_char_boundary(decrypted.len() - SALT_LEN) {
        return false;
    }
    let (received_hash, salt) = decrypted.split_at(decrypted.len() - SALT_LEN);
    let calculated = salted_hash(params, salt);
    calculated.as_bytes().ct_eq(received_hash.as_bytes()).into()
}

/// Hash a secret for database lookups (API keys).
/// Uses SHA-256 with application salt, returns lowercase hex string.
pub fn hash_secret(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(b"cardbase-v1:");
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}
