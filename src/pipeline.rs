/// One-shot facade operations.
///
/// Coordinates the full backup and recovery flows:
/// 1. generate: derive keys from a seed, serialize the armored PGP block,
///    and encode the recovery phrase
/// 2. recover: decode a phrase and rebuild the identical PGP block
/// 3. convert: re-encode a phrase between plaintext and encrypted form
///
/// Every operation is stateless and single-shot; the only non-determinism is
/// the injected CSPRNG (fresh seeds, S2K salts and IVs). Nothing here logs
/// or returns secret material beyond the phrase and key the caller asked for.
use std::time::{SystemTime, UNIX_EPOCH};

use rand::{CryptoRng, RngCore};
use tracing::info;

use crate::crypto::keys::derive_key_material;
use crate::crypto::sensitive::Seed;
use crate::error::Result;
use crate::mnemonic::{
    self, creation_offset_from_unix, PhraseVersion, EPOCH_UNIX, MAX_CREATION_OFFSET,
    SECONDS_PER_DAY,
};
use crate::pgp::{self, UserId};

/// Inputs to `generate`. Only the user ID is mandatory.
pub struct GenerateOptions<'a> {
    /// Explicit seed; defaults to fresh CSPRNG output.
    pub seed: Option<Seed>,
    /// Key creation time as a Unix timestamp; defaults to now.
    pub creation_time: Option<u64>,
    pub user_id: UserId,
    /// Key lifetime in seconds, emitted as the expiration subpackets.
    pub ttl_seconds: Option<u32>,
    /// Encrypt the recovery phrase (version 1) under this password.
    pub phrase_password: Option<&'a [u8]>,
    /// Wrap the PGP secret material with S2K under this password.
    pub key_password: Option<&'a [u8]>,
}

impl GenerateOptions<'_> {
    pub fn new(user_id: UserId) -> Self {
        GenerateOptions {
            seed: None,
            creation_time: None,
            user_id,
            ttl_seconds: None,
            phrase_password: None,
            key_password: None,
        }
    }
}

/// Result of `generate`: the phrase to write down and the key to import.
pub struct GeneratedIdentity {
    pub phrase: String,
    pub armored_key: String,
    pub fingerprint: [u8; 20],
}

/// Result of `recover`.
pub struct RecoveredIdentity {
    pub armored_key: String,
    pub fingerprint: [u8; 20],
}

/// Create a new identity: derive the key pair, serialize the armored PGP
/// block, and encode the recovery phrase.
pub fn generate<R: RngCore + CryptoRng>(
    options: GenerateOptions<'_>,
    rng: &mut R,
) -> Result<GeneratedIdentity> {
    let seed = match options.seed {
        Some(seed) => seed,
        None => Seed::generate(rng)?,
    };
    let creation_time = options.creation_time.unwrap_or_else(now_unix);
    let creation_offset = creation_offset_from_unix(creation_time)?;

    let phrase = match options.phrase_password {
        Some(password) => mnemonic::encode_encrypted(&seed, creation_offset, password)?,
        None => mnemonic::encode(&seed, creation_offset)?,
    };

    let material = derive_key_material(&seed, creation_offset)?;
    let armored_key = pgp::serialize_private_key(
        &material,
        &options.user_id,
        options.ttl_seconds,
        options.key_password,
        rng,
    )?;
    let fingerprint = pgp::primary_fingerprint(&material)?;

    info!(
        fingerprint = %hex::encode(fingerprint),
        creation_offset,
        encrypted_phrase = options.phrase_password.is_some(),
        "Generated identity"
    );

    Ok(GeneratedIdentity {
        phrase,
        armored_key,
        fingerprint,
    })
}

/// Rebuild the identical PGP key from a recovery phrase.
pub fn recover<R: RngCore + CryptoRng>(
    phrase: &str,
    phrase_password: Option<&[u8]>,
    user_id: &UserId,
    ttl_seconds: Option<u32>,
    key_password: Option<&[u8]>,
    rng: &mut R,
) -> Result<RecoveredIdentity> {
    let decoded = mnemonic::decode(phrase, phrase_password, now_offset())?;
    let material = derive_key_material(&decoded.seed, decoded.creation_offset)?;
    let armored_key =
        pgp::serialize_private_key(&material, user_id, ttl_seconds, key_password, rng)?;
    let fingerprint = pgp::primary_fingerprint(&material)?;

    info!(
        fingerprint = %hex::encode(fingerprint),
        creation_offset = decoded.creation_offset,
        "Recovered identity"
    );

    Ok(RecoveredIdentity {
        armored_key,
        fingerprint,
    })
}

/// Re-encode a phrase: decode with `old_password` (if it is encrypted), then
/// encode encrypted under `new_password`, or plaintext when `new_password`
/// is `None`.
pub fn convert(
    phrase: &str,
    old_password: Option<&[u8]>,
    new_password: Option<&[u8]>,
) -> Result<String> {
    let decoded = mnemonic::decode(phrase, old_password, now_offset())?;
    let converted = match new_password {
        Some(password) => {
            mnemonic::encode_encrypted(&decoded.seed, decoded.creation_offset, password)?
        }
        None => mnemonic::encode(&decoded.seed, decoded.creation_offset)?,
    };

    info!(
        from_encrypted = decoded.version == PhraseVersion::Encrypted,
        to_encrypted = new_password.is_some(),
        "Converted recovery phrase"
    );

    Ok(converted)
}

fn now_unix() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Current day offset, clamped into the encodable range so decode-time
/// future checks stay meaningful on badly skewed clocks.
fn now_offset() -> u16 {
    let days = now_unix().saturating_sub(EPOCH_UNIX) / SECONDS_PER_DAY;
    days.min(u64::from(MAX_CREATION_OFFSET)) as u16
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_id() -> UserId {
        UserId::new("Alice", "alice@example.com", None).unwrap()
    }

    fn options(seed_byte: u8) -> GenerateOptions<'static> {
        let mut options = GenerateOptions::new(user_id());
        options.seed = Some(Seed::new([seed_byte; 16]));
        options.creation_time = Some(EPOCH_UNIX + 365 * SECONDS_PER_DAY);
        options
    }

    #[test]
    fn test_generate_is_deterministic() {
        let mut rng = rand::rngs::OsRng;
        let a = generate(options(0x10), &mut rng).unwrap();
        let b = generate(options(0x10), &mut rng).unwrap();
        assert_eq!(a.phrase, b.phrase);
        assert_eq!(a.armored_key, b.armored_key);
        assert_eq!(a.fingerprint, b.fingerprint);
    }

    #[test]
    fn test_recover_matches_generate() {
        let mut rng = rand::rngs::OsRng;
        let generated = generate(options(0x20), &mut rng).unwrap();
        let recovered =
            recover(&generated.phrase, None, &user_id(), None, None, &mut rng).unwrap();
        assert_eq!(recovered.armored_key, generated.armored_key);
        assert_eq!(recovered.fingerprint, generated.fingerprint);
    }

    #[test]
    fn test_fresh_seeds_differ() {
        let mut rng = rand::rngs::OsRng;
        let mut first = GenerateOptions::new(user_id());
        first.creation_time = Some(EPOCH_UNIX);
        let mut second = GenerateOptions::new(user_id());
        second.creation_time = Some(EPOCH_UNIX);
        let a = generate(first, &mut rng).unwrap();
        let b = generate(second, &mut rng).unwrap();
        assert_ne!(a.phrase, b.phrase);
        assert_ne!(a.fingerprint, b.fingerprint);
    }

    #[test]
    fn test_creation_time_before_epoch_rejected() {
        let mut rng = rand::rngs::OsRng;
        let mut options = options(0x30);
        options.creation_time = Some(EPOCH_UNIX - 1);
        assert!(generate(options, &mut rng).is_err());
    }

    #[test]
    fn test_encrypted_phrase_end_to_end() {
        let mut rng = rand::rngs::OsRng;
        let password = b"correct horse battery staple";
        let mut options = options(0x40);
        options.phrase_password = Some(password);
        let generated = generate(options, &mut rng).unwrap();

        let recovered = recover(
            &generated.phrase,
            Some(password),
            &user_id(),
            None,
            None,
            &mut rng,
        )
        .unwrap();
        assert_eq!(recovered.fingerprint, generated.fingerprint);

        assert!(recover(&generated.phrase, None, &user_id(), None, None, &mut rng).is_err());
    }

    #[test]
    fn test_convert_roundtrip() {
        let mut rng = rand::rngs::OsRng;
        let generated = generate(options(0x50), &mut rng).unwrap();
        let password = b"passphrase";

        let encrypted = convert(&generated.phrase, None, Some(password)).unwrap();
        assert_ne!(encrypted, generated.phrase);

        let back = convert(&encrypted, Some(password), None).unwrap();
        assert_eq!(back, generated.phrase);
    }
}
