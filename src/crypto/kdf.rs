/// Key derivation: Argon2id stretching plus HKDF-SHA256 per-role expansion.
///
/// Two domains share the Argon2id parameters but can never mix:
/// the seed stretch (fixed salt, feeds the PGP key hierarchy) and the phrase
/// password KDF (header-derived salt, feeds the phrase cipher mask). Every
/// output is a pure function of its inputs; no clock or RNG is consulted.
use argon2::{Algorithm, Argon2, Params, Version};
use hkdf::Hkdf;
use sha2::Sha256;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::crypto::sensitive::{Seed, SensitiveBytes32};
use crate::error::{MnemonikeyError, Result};

/// Argon2id memory cost: 64 MiB.
const ARGON2_MEMORY_KIB: u32 = 65_536;
/// Argon2id iterations.
const ARGON2_ITERATIONS: u32 = 8;
/// Argon2id lanes.
const ARGON2_PARALLELISM: u32 = 4;

/// Fixed salt for the seed stretch.
const SEED_STRETCH_SALT: &[u8] = b"mnemonikey";

/// HKDF info prefix; the role label and creation offset are appended.
const EXPAND_DOMAIN: &[u8] = b"mnemonikey/";

/// Byte length of the phrase-password KDF output: a 16-byte entropy mask plus
/// one verification byte.
const PHRASE_KDF_OUTPUT: usize = 17;

/// Which subkey a derived scalar is for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyRole {
    Sign,
    Encrypt,
}

impl KeyRole {
    pub fn label(self) -> &'static str {
        match self {
            KeyRole::Sign => "sign",
            KeyRole::Encrypt => "encrypt",
        }
    }
}

fn argon2id(output_len: usize) -> Result<Argon2<'static>> {
    let params = Params::new(
        ARGON2_MEMORY_KIB,
        ARGON2_ITERATIONS,
        ARGON2_PARALLELISM,
        Some(output_len),
    )
    .map_err(|e| MnemonikeyError::Derivation(e.to_string()))?;
    Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
}

/// Stretch the 128-bit seed into the 32-byte root key.
pub fn stretch_seed(seed: &Seed) -> Result<SensitiveBytes32> {
    let mut root = [0u8; 32];
    argon2id(32)?
        .hash_password_into(seed.as_bytes(), SEED_STRETCH_SALT, &mut root)
        .map_err(|e| MnemonikeyError::Derivation(e.to_string()))?;
    Ok(SensitiveBytes32::new(root))
}

/// Expand the root key into the 32-byte scalar for one role.
///
/// The HKDF info string binds both the role label and the creation offset, so
/// keys of different roles or creation dates are unrelated.
pub fn expand_role(
    root: &SensitiveBytes32,
    role: KeyRole,
    creation_offset: u16,
) -> Result<SensitiveBytes32> {
    let mut info = Vec::with_capacity(EXPAND_DOMAIN.len() + 8 + 8);
    info.extend_from_slice(EXPAND_DOMAIN);
    info.extend_from_slice(role.label().as_bytes());
    info.push(b'/');
    info.extend_from_slice(&u64::from(creation_offset).to_be_bytes());

    let hk = Hkdf::<Sha256>::new(None, root.as_bytes());
    let mut okm = [0u8; 32];
    hk.expand(&info, &mut okm)
        .map_err(|e| MnemonikeyError::Derivation(e.to_string()))?;
    Ok(SensitiveBytes32::new(okm))
}

/// Password-derived cipher mask for an encrypted recovery phrase.
///
/// `mask` XORs the 128-bit entropy; the low 4 bits of `verify` fold into the
/// checksum so a wrong password is rejected before any PGP work happens.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct PhraseMask {
    pub mask: [u8; 16],
    pub verify: u8,
}

/// Run the phrase password KDF.
pub fn derive_phrase_mask(password: &[u8], salt: &[u8; 16]) -> Result<PhraseMask> {
    let mut okm = [0u8; PHRASE_KDF_OUTPUT];
    argon2id(PHRASE_KDF_OUTPUT)?
        .hash_password_into(password, salt, &mut okm)
        .map_err(|e| MnemonikeyError::Derivation(e.to_string()))?;

    let mut mask = [0u8; 16];
    mask.copy_from_slice(&okm[..16]);
    let verify = okm[16] & 0x0F;
    okm.zeroize();
    Ok(PhraseMask { mask, verify })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stretch_deterministic() {
        let seed = Seed::new([0x42; 16]);
        let a = stretch_seed(&seed).unwrap();
        let b = stretch_seed(&seed).unwrap();
        assert_eq!(a.as_bytes(), b.as_bytes());
    }

    #[test]
    fn test_roles_and_offsets_separate() {
        let seed = Seed::new([0x01; 16]);
        let root = stretch_seed(&seed).unwrap();

        let sign = expand_role(&root, KeyRole::Sign, 100).unwrap();
        let sign_again = expand_role(&root, KeyRole::Sign, 100).unwrap();
        let encrypt = expand_role(&root, KeyRole::Encrypt, 100).unwrap();
        let sign_later = expand_role(&root, KeyRole::Sign, 101).unwrap();

        assert_eq!(sign.as_bytes(), sign_again.as_bytes());
        assert_ne!(sign.as_bytes(), encrypt.as_bytes());
        assert_ne!(sign.as_bytes(), sign_later.as_bytes());
    }

    #[test]
    fn test_phrase_mask_depends_on_password_and_salt() {
        let salt = [0x07; 16];
        let a = derive_phrase_mask(b"hunter2", &salt).unwrap();
        let b = derive_phrase_mask(b"hunter2", &salt).unwrap();
        assert_eq!(a.mask, b.mask);
        assert_eq!(a.verify, b.verify);
        assert!(a.verify <= 0x0F);

        let c = derive_phrase_mask(b"hunter3", &salt).unwrap();
        assert_ne!(a.mask, c.mask);

        let d = derive_phrase_mask(b"hunter2", &[0x08; 16]).unwrap();
        assert_ne!(a.mask, d.mask);
    }
}
