/// RFC 4880 string-to-key protection for secret key material: iterated and
/// salted S2K (specifier 3) with SHA-256, then AES-256 in CFB mode.
///
/// This is orthogonal to phrase-level encryption. The salt and IV are drawn
/// fresh from the injected CSPRNG on every serialization, so two exports of
/// the same key differ in their secret areas while their fingerprints (which
/// cover only the public portion) stay identical.
use aes::Aes256;
use cfb_mode::cipher::{AsyncStreamCipher, KeyIvInit};
use cfb_mode::{Decryptor, Encryptor};
use rand::{CryptoRng, RngCore};
use sha1::Sha1;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use zeroize::Zeroize;

use crate::error::{MnemonikeyError, Result};

/// S2K specifier octet: iterated and salted.
pub const S2K_SPECIFIER_ITERATED_SALTED: u8 = 3;

/// Coded iteration count; decodes to 65,011,712 hashed octets.
pub const S2K_CODED_COUNT: u8 = 0xFF;

pub const S2K_SALT_LEN: usize = 8;
pub const CFB_IV_LEN: usize = 16;

/// SHA-1 integrity hash appended to the plaintext before encryption
/// (secret-key usage octet 0xFE).
pub const INTEGRITY_HASH_LEN: usize = 20;

/// Expand the one-octet coded count (RFC 4880 section 3.7.1.3).
pub fn decode_iteration_count(coded: u8) -> usize {
    (16 + (coded as usize & 15)) << ((coded as usize >> 4) + 6)
}

/// Derive the AES-256 key by hashing `count` octets of the repeating
/// salt ‖ password stream.
pub fn derive_key(password: &[u8], salt: &[u8; S2K_SALT_LEN], coded_count: u8) -> [u8; 32] {
    let chunk_len = salt.len() + password.len();
    let total = decode_iteration_count(coded_count).max(chunk_len);

    let mut hasher = Sha256::new();
    let mut fed = 0usize;
    while fed + chunk_len <= total {
        hasher.update(salt);
        hasher.update(password);
        fed += chunk_len;
    }
    let remaining = total - fed;
    if remaining > 0 {
        if remaining <= salt.len() {
            hasher.update(&salt[..remaining]);
        } else {
            hasher.update(salt);
            hasher.update(&password[..remaining - salt.len()]);
        }
    }
    hasher.finalize().into()
}

/// Result of protecting one secret area.
pub struct S2kProtection {
    pub salt: [u8; S2K_SALT_LEN],
    pub iv: [u8; CFB_IV_LEN],
    pub ciphertext: Vec<u8>,
}

/// Encrypt `secret` (the serialized secret MPIs) with a fresh salt and IV,
/// appending the SHA-1 of the plaintext before encryption.
pub fn encrypt_secret_material<R: RngCore + CryptoRng>(
    secret: &[u8],
    password: &[u8],
    rng: &mut R,
) -> Result<S2kProtection> {
    let mut salt = [0u8; S2K_SALT_LEN];
    rng.try_fill_bytes(&mut salt)
        .map_err(|e| MnemonikeyError::Entropy(e.to_string()))?;
    let mut iv = [0u8; CFB_IV_LEN];
    rng.try_fill_bytes(&mut iv)
        .map_err(|e| MnemonikeyError::Entropy(e.to_string()))?;

    let mut key = derive_key(password, &salt, S2K_CODED_COUNT);
    let mut buf = Vec::with_capacity(secret.len() + INTEGRITY_HASH_LEN);
    buf.extend_from_slice(secret);
    buf.extend_from_slice(&Sha1::digest(secret));

    let cipher = Encryptor::<Aes256>::new_from_slices(&key, &iv)
        .map_err(|e| MnemonikeyError::Serialization(e.to_string()))?;
    cipher.encrypt(&mut buf);
    key.zeroize();

    Ok(S2kProtection {
        salt,
        iv,
        ciphertext: buf,
    })
}

/// Decrypt a protected secret area and verify its SHA-1 trailer. Used by the
/// round-trip tests; a wrong password fails the constant-time hash check.
pub fn decrypt_secret_material(
    ciphertext: &[u8],
    password: &[u8],
    salt: &[u8; S2K_SALT_LEN],
    iv: &[u8; CFB_IV_LEN],
) -> Result<Vec<u8>> {
    if ciphertext.len() < INTEGRITY_HASH_LEN {
        return Err(MnemonikeyError::Serialization(
            "secret area shorter than its integrity hash".into(),
        ));
    }
    let mut key = derive_key(password, salt, S2K_CODED_COUNT);
    let mut buf = ciphertext.to_vec();
    let cipher = Decryptor::<Aes256>::new_from_slices(&key, iv)
        .map_err(|e| MnemonikeyError::Serialization(e.to_string()))?;
    cipher.decrypt(&mut buf);
    key.zeroize();

    let (secret, digest) = buf.split_at(buf.len() - INTEGRITY_HASH_LEN);
    if !bool::from(Sha1::digest(secret).as_slice().ct_eq(digest)) {
        buf.zeroize();
        return Err(MnemonikeyError::PasswordIncorrect);
    }
    let secret = secret.to_vec();
    buf.zeroize();
    Ok(secret)
}
