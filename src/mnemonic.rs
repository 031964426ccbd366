/// Recovery phrase codec: (seed, creation offset) ↔ 14 English words.
///
/// Wire layout, MSB-first:
///
/// | field           | bits |
/// |-----------------|------|
/// | version         | 3    |
/// | creation_offset | 15   |
/// | entropy         | 128  |
/// | reserved        | 8    |
/// | checksum        | 14   |
///
/// The 154 payload bits are protected by the low 14 bits of CRC-32 (IEEE)
/// computed over the payload packed into 20 zero-padded bytes; the full
/// 168-bit stream maps onto 14 words of 12 bits each. Version 0 phrases are
/// plaintext; version 1 phrases carry the entropy XORed with a
/// password-derived mask and fold a 4-bit password verifier into the top of
/// the checksum, so a wrong password is indistinguishable from corruption.
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use zeroize::Zeroize;

use crate::bits::BitBuffer;
use crate::crypto::kdf::derive_phrase_mask;
use crate::crypto::sensitive::{Seed, SEED_LEN};
use crate::error::{MnemonikeyError, Result};
use crate::words;

/// Words in a recovery phrase.
pub const PHRASE_WORD_COUNT: usize = 14;

/// Payload bits ahead of the checksum.
pub const PAYLOAD_BITS: usize = 154;

const VERSION_BITS: u32 = 3;
const OFFSET_BITS: u32 = 15;
const RESERVED_BITS: u32 = 8;

/// Checksum width; together with the payload this fills all 14 words.
pub const CHECKSUM_BITS: u32 = 14;
const CHECKSUM_MASK: u32 = (1 << CHECKSUM_BITS) - 1;

/// The password verifier nibble occupies the top 4 checksum bits.
const VERIFY_SHIFT: u32 = CHECKSUM_BITS - 4;

/// Largest encodable creation offset (15 bits of days).
pub const MAX_CREATION_OFFSET: u16 = (1 << OFFSET_BITS) - 1;

/// The mnemonikey epoch: 2022-01-01T00:00:00Z as a Unix timestamp.
pub const EPOCH_UNIX: u64 = 1_640_995_200;

pub const SECONDS_PER_DAY: u64 = 86_400;

/// Payload length when packed to whole bytes for the CRC.
const PAYLOAD_PACKED_LEN: usize = 20;

/// Domain separator for the phrase-encryption salt.
const SALT_DOMAIN: &[u8] = b"mnemonikey-s2k";

/// Parsed phrase version. Readers reject everything else.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PhraseVersion {
    Plaintext,
    Encrypted,
}

impl PhraseVersion {
    fn from_field(field: u8) -> Result<Self> {
        match field {
            0 => Ok(PhraseVersion::Plaintext),
            1 => Ok(PhraseVersion::Encrypted),
            other => Err(MnemonikeyError::UnknownVersion(other)),
        }
    }

    fn as_field(self) -> u64 {
        match self {
            PhraseVersion::Plaintext => 0,
            PhraseVersion::Encrypted => 1,
        }
    }
}

/// Result of a successful decode.
#[derive(Debug)]
pub struct DecodedPhrase {
    pub seed: Seed,
    pub creation_offset: u16,
    /// The version the phrase was stored under, so callers can re-encode in
    /// the same or the opposite mode.
    pub version: PhraseVersion,
}

/// Days since the mnemonikey epoch for a wall-clock Unix timestamp.
pub fn creation_offset_from_unix(unix_seconds: u64) -> Result<u16> {
    if unix_seconds < EPOCH_UNIX {
        return Err(MnemonikeyError::CreationOutOfRange);
    }
    let days = (unix_seconds - EPOCH_UNIX) / SECONDS_PER_DAY;
    if days > u64::from(MAX_CREATION_OFFSET) {
        return Err(MnemonikeyError::CreationOutOfRange);
    }
    Ok(days as u16)
}

/// Unix timestamp of midnight UTC on the day `offset` days after the epoch.
pub fn unix_from_creation_offset(offset: u16) -> u64 {
    EPOCH_UNIX + u64::from(offset) * SECONDS_PER_DAY
}

/// Encode a plaintext (version 0) recovery phrase.
pub fn encode(seed: &Seed, creation_offset: u16) -> Result<String> {
    if creation_offset > MAX_CREATION_OFFSET {
        return Err(MnemonikeyError::CreationOutOfRange);
    }
    let mut payload = pack_payload(PhraseVersion::Plaintext, creation_offset, seed.as_bytes(), 0)?;
    let checksum = checksum14(&payload);
    payload.push(u64::from(checksum), CHECKSUM_BITS)?;
    phrase_from_bits(&mut payload)
}

/// Encode an encrypted (version 1) recovery phrase.
///
/// The salt is derived from the public header bits, so the same
/// (seed, offset, password) triple always produces the same phrase.
pub fn encode_encrypted(seed: &Seed, creation_offset: u16, password: &[u8]) -> Result<String> {
    if creation_offset > MAX_CREATION_OFFSET {
        return Err(MnemonikeyError::CreationOutOfRange);
    }
    let salt = phrase_salt(creation_offset);
    let mask = derive_phrase_mask(password, &salt)?;

    let mut ciphertext = *seed.as_bytes();
    for (c, m) in ciphertext.iter_mut().zip(mask.mask.iter()) {
        *c ^= m;
    }

    let mut payload = pack_payload(PhraseVersion::Encrypted, creation_offset, &ciphertext, 0)?;
    ciphertext.zeroize();

    let checksum = checksum14(&payload) ^ (u32::from(mask.verify) << VERIFY_SHIFT);
    payload.push(u64::from(checksum), CHECKSUM_BITS)?;
    phrase_from_bits(&mut payload)
}

/// Decode a recovery phrase of either version.
///
/// `now_offset` is the current day offset, used to reject phrases claiming a
/// creation date in the future (one day of clock skew is tolerated).
/// `password` is required for version 1 phrases and ignored for version 0.
pub fn decode(phrase: &str, password: Option<&[u8]>, now_offset: u16) -> Result<DecodedPhrase> {
    let word_list: Vec<&str> = phrase.split_whitespace().collect();
    if word_list.len() != PHRASE_WORD_COUNT {
        return Err(MnemonikeyError::WordCount(word_list.len()));
    }

    let mut bits = BitBuffer::new();
    for word in &word_list {
        let index = words::index_of(word)
            .ok_or_else(|| MnemonikeyError::UnknownWord((*word).to_string()))?;
        bits.push(u64::from(index), words::BITS_PER_WORD)?;
    }

    let version_field = bits.read(VERSION_BITS)? as u8;
    let version = PhraseVersion::from_field(version_field)?;
    let creation_offset = bits.read(OFFSET_BITS)? as u16;
    let mut body_hi = bits.read(64)?;
    let mut body_lo = bits.read(64)?;
    let reserved = bits.read(RESERVED_BITS)?;
    let stored_checksum = bits.read(CHECKSUM_BITS)? as u32;

    let mut body = [0u8; SEED_LEN];
    body[..8].copy_from_slice(&body_hi.to_be_bytes());
    body[8..].copy_from_slice(&body_lo.to_be_bytes());
    body_hi.zeroize();
    body_lo.zeroize();

    let payload = pack_payload(version, creation_offset, &body, reserved)?;
    let computed = checksum14(&payload);

    let result = match version {
        PhraseVersion::Plaintext => {
            if !bool::from(computed.ct_eq(&stored_checksum)) {
                Err(MnemonikeyError::ChecksumMismatch)
            } else {
                validate_fields(reserved, creation_offset, now_offset).map(|()| DecodedPhrase {
                    seed: Seed::new(body),
                    creation_offset,
                    version,
                })
            }
        }
        PhraseVersion::Encrypted => {
            let password = match password {
                Some(p) => p,
                None => {
                    body.zeroize();
                    return Err(MnemonikeyError::PasswordRequired);
                }
            };
            let salt = phrase_salt(creation_offset);
            let mask = derive_phrase_mask(password, &salt)?;
            let expected = computed ^ (u32::from(mask.verify) << VERIFY_SHIFT);
            if !bool::from(expected.ct_eq(&stored_checksum)) {
                Err(MnemonikeyError::PasswordIncorrect)
            } else {
                validate_fields(reserved, creation_offset, now_offset).map(|()| {
                    let mut entropy = body;
                    for (e, m) in entropy.iter_mut().zip(mask.mask.iter()) {
                        *e ^= m;
                    }
                    let seed = Seed::new(entropy);
                    entropy.zeroize();
                    DecodedPhrase {
                        seed,
                        creation_offset,
                        version,
                    }
                })
            }
        }
    };

    body.zeroize();
    result
}

fn validate_fields(reserved: u64, creation_offset: u16, now_offset: u16) -> Result<()> {
    if reserved != 0 {
        return Err(MnemonikeyError::ReservedNonZero);
    }
    if creation_offset > now_offset.saturating_add(1) {
        return Err(MnemonikeyError::CreationOutOfRange);
    }
    Ok(())
}

/// Pack the fixed fields into the 154-bit payload. Decoding passes the
/// reserved bits as received so the checksum is computed over the actual
/// wire content.
fn pack_payload(
    version: PhraseVersion,
    creation_offset: u16,
    body: &[u8; SEED_LEN],
    reserved: u64,
) -> Result<BitBuffer> {
    let mut payload = BitBuffer::new();
    payload.push(version.as_field(), VERSION_BITS)?;
    payload.push(u64::from(creation_offset), OFFSET_BITS)?;
    payload.push(u64::from_be_bytes(body[..8].try_into().expect("8 bytes")), 64)?;
    payload.push(u64::from_be_bytes(body[8..].try_into().expect("8 bytes")), 64)?;
    payload.push(reserved, RESERVED_BITS)?;
    debug_assert_eq!(payload.len(), PAYLOAD_BITS);
    Ok(payload)
}

/// Low 14 bits of CRC-32 (IEEE) over the zero-padded payload bytes.
fn checksum14(payload: &BitBuffer) -> u32 {
    let mut packed = payload.to_bytes(false);
    debug_assert_eq!(packed.len(), PAYLOAD_PACKED_LEN);
    let checksum = crc32fast::hash(&packed) & CHECKSUM_MASK;
    packed.zeroize();
    checksum
}

/// Salt for the phrase password KDF, derived from the public header bits so
/// the phrase stays a fixed length.
fn phrase_salt(creation_offset: u16) -> [u8; 16] {
    let mut hasher = Sha256::new();
    hasher.update(SALT_DOMAIN);
    hasher.update([PhraseVersion::Encrypted.as_field() as u8]);
    hasher.update(creation_offset.to_be_bytes());
    let digest = hasher.finalize();
    let mut salt = [0u8; 16];
    salt.copy_from_slice(&digest[..16]);
    salt
}

/// Map the completed 168-bit stream onto 14 words.
fn phrase_from_bits(bits: &mut BitBuffer) -> Result<String> {
    let mut phrase = String::new();
    for i in 0..PHRASE_WORD_COUNT {
        let index = bits.read(words::BITS_PER_WORD)? as u16;
        if i > 0 {
            phrase.push(' ');
        }
        phrase.push_str(words::word_of(index));
    }
    Ok(phrase)
}
