/// Derived PGP key material: an Ed25519 certify+sign primary key and a
/// Curve25519 encryption subkey, both deterministic functions of
/// (seed, creation offset).
use ed25519_dalek::{Signature, Signer, SigningKey};
use x25519_dalek::{PublicKey as X25519PublicKey, StaticSecret};
use zeroize::Zeroize;

use crate::crypto::kdf::{expand_role, stretch_seed, KeyRole};
use crate::crypto::sensitive::{Seed, SensitiveBytes32};
use crate::error::Result;
use crate::mnemonic::unix_from_creation_offset;

/// Ed25519 primary key material.
pub struct SigningKeyMaterial {
    signing_key: SigningKey,
}

impl SigningKeyMaterial {
    /// RFC 8032 public key, 32 bytes.
    pub fn public_bytes(&self) -> [u8; 32] {
        self.signing_key.verifying_key().to_bytes()
    }

    /// The 32-byte RFC 8032 private key.
    pub fn secret_bytes(&self) -> &[u8; 32] {
        self.signing_key.as_bytes()
    }

    /// Deterministic EdDSA signature over `message` (for OpenPGP, the
    /// message is the already-computed SHA-256 digest).
    pub fn sign(&self, message: &[u8]) -> Signature {
        self.signing_key.sign(message)
    }
}

/// Curve25519 encryption subkey material. The scalar is stored clamped.
pub struct EncryptionKeyMaterial {
    scalar: SensitiveBytes32,
    public: [u8; 32],
}

impl EncryptionKeyMaterial {
    pub fn public_bytes(&self) -> [u8; 32] {
        self.public
    }

    /// The clamped scalar in native (little-endian) byte order.
    pub fn secret_bytes(&self) -> &[u8; 32] {
        self.scalar.as_bytes()
    }
}

/// Everything the PGP serializer needs for one identity.
pub struct PgpKeyMaterial {
    pub primary: SigningKeyMaterial,
    pub subkey: EncryptionKeyMaterial,
    /// Key creation time, seconds since the Unix epoch.
    pub created_at: u64,
}

/// Clamp a Curve25519 scalar per RFC 7748.
pub fn clamp_scalar(mut scalar: [u8; 32]) -> [u8; 32] {
    scalar[0] &= 0xF8;
    scalar[31] &= 0x7F;
    scalar[31] |= 0x40;
    scalar
}

/// Derive both keys from the seed. Pure: same inputs always yield the same
/// key pairs, and therefore the same fingerprints.
pub fn derive_key_material(seed: &Seed, creation_offset: u16) -> Result<PgpKeyMaterial> {
    let root = stretch_seed(seed)?;

    let sign_material = expand_role(&root, KeyRole::Sign, creation_offset)?;
    let primary = SigningKeyMaterial {
        signing_key: SigningKey::from_bytes(sign_material.as_bytes()),
    };

    let encrypt_material = expand_role(&root, KeyRole::Encrypt, creation_offset)?;
    let mut clamped = clamp_scalar(*encrypt_material.as_bytes());
    let public = X25519PublicKey::from(&StaticSecret::from(clamped)).to_bytes();
    let subkey = EncryptionKeyMaterial {
        scalar: SensitiveBytes32::new(clamped),
        public,
    };
    clamped.zeroize();

    Ok(PgpKeyMaterial {
        primary,
        subkey,
        created_at: unix_from_creation_offset(creation_offset),
    })
}
