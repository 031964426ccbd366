/// Self-signatures: the positive certification binding the user ID to the
/// primary key, and the subkey binding signature.
///
/// EdDSA is deterministic, so the whole signature path is free of randomness;
/// two serializations of the same key carry byte-identical signatures. The
/// hash input follows RFC 4880 section 5.2.4: the key (and user ID or subkey)
/// material, the hashed portion of the signature, and the v4 trailer.
use sha2::{Digest, Sha256};

use crate::crypto::keys::PgpKeyMaterial;
use crate::error::Result;
use crate::pgp::key::{fingerprint, key_id};
use crate::pgp::packet::{
    write_subpacket, ALGO_EDDSA, COMPRESSION_UNCOMPRESSED, HASH_SHA256, SUBPACKET_CREATION_TIME,
    SUBPACKET_FEATURES, SUBPACKET_ISSUER, SUBPACKET_KEY_EXPIRY, SUBPACKET_KEY_FLAGS,
    SUBPACKET_PREF_COMPRESSION, SUBPACKET_PREF_HASH, SUBPACKET_PREF_SYMMETRIC, SYM_AES256,
};

/// Positive certification of a user ID (RFC 4880 type 0x13).
const SIG_TYPE_POSITIVE_CERT: u8 = 0x13;

/// Subkey binding (type 0x18).
const SIG_TYPE_SUBKEY_BINDING: u8 = 0x18;

/// Key flag bits.
const FLAG_CERTIFY: u8 = 0x01;
const FLAG_SIGN: u8 = 0x02;
const FLAG_ENCRYPT_COMMS: u8 = 0x04;
const FLAG_ENCRYPT_STORAGE: u8 = 0x08;

/// MDC support feature bit.
const FEATURE_MDC: u8 = 0x01;

/// Build the certification signature packet body over primary key + user ID.
pub fn certification(
    material: &PgpKeyMaterial,
    primary_public_body: &[u8],
    user_id: &str,
    ttl_seconds: Option<u32>,
) -> Result<Vec<u8>> {
    let creation_be = u32::try_from(material.created_at)
        .map_err(|_| {
            crate::error::MnemonikeyError::Serialization(
                "key creation time exceeds the v4 timestamp range".into(),
            )
        })?
        .to_be_bytes();

    let mut hashed = Vec::new();
    write_subpacket(&mut hashed, SUBPACKET_CREATION_TIME, &creation_be)?;
    write_subpacket(&mut hashed, SUBPACKET_KEY_FLAGS, &[FLAG_CERTIFY | FLAG_SIGN])?;
    write_subpacket(&mut hashed, SUBPACKET_PREF_HASH, &[HASH_SHA256])?;
    write_subpacket(&mut hashed, SUBPACKET_PREF_SYMMETRIC, &[SYM_AES256])?;
    write_subpacket(&mut hashed, SUBPACKET_PREF_COMPRESSION, &[COMPRESSION_UNCOMPRESSED])?;
    write_subpacket(&mut hashed, SUBPACKET_FEATURES, &[FEATURE_MDC])?;
    if let Some(ttl) = ttl_seconds {
        write_subpacket(&mut hashed, SUBPACKET_KEY_EXPIRY, &ttl.to_be_bytes())?;
    }

    let uid = user_id.as_bytes();
    let mut message = Vec::new();
    push_key_blob(&mut message, primary_public_body);
    message.push(0xB4);
    message.extend_from_slice(&(uid.len() as u32).to_be_bytes());
    message.extend_from_slice(uid);

    build(material, primary_public_body, SIG_TYPE_POSITIVE_CERT, hashed, &message)
}

/// Build the subkey binding signature packet body.
pub fn subkey_binding(
    material: &PgpKeyMaterial,
    primary_public_body: &[u8],
    subkey_public_body: &[u8],
    ttl_seconds: Option<u32>,
) -> Result<Vec<u8>> {
    let creation_be = u32::try_from(material.created_at)
        .map_err(|_| {
            crate::error::MnemonikeyError::Serialization(
                "key creation time exceeds the v4 timestamp range".into(),
            )
        })?
        .to_be_bytes();

    let mut hashed = Vec::new();
    write_subpacket(&mut hashed, SUBPACKET_CREATION_TIME, &creation_be)?;
    write_subpacket(
        &mut hashed,
        SUBPACKET_KEY_FLAGS,
        &[FLAG_ENCRYPT_COMMS | FLAG_ENCRYPT_STORAGE],
    )?;
    if let Some(ttl) = ttl_seconds {
        write_subpacket(&mut hashed, SUBPACKET_KEY_EXPIRY, &ttl.to_be_bytes())?;
    }

    let mut message = Vec::new();
    push_key_blob(&mut message, primary_public_body);
    push_key_blob(&mut message, subkey_public_body);

    build(material, primary_public_body, SIG_TYPE_SUBKEY_BINDING, hashed, &message)
}

/// 0x99 ‖ two-octet length ‖ key body, as hashed for signatures and
/// fingerprints alike.
fn push_key_blob(out: &mut Vec<u8>, public_body: &[u8]) {
    out.push(0x99);
    out.extend_from_slice(&(public_body.len() as u16).to_be_bytes());
    out.extend_from_slice(public_body);
}

fn build(
    material: &PgpKeyMaterial,
    primary_public_body: &[u8],
    sig_type: u8,
    hashed_subpackets: Vec<u8>,
    message: &[u8],
) -> Result<Vec<u8>> {
    let mut hashed_portion = Vec::with_capacity(6 + hashed_subpackets.len());
    hashed_portion.push(4);
    hashed_portion.push(sig_type);
    hashed_portion.push(ALGO_EDDSA);
    hashed_portion.push(HASH_SHA256);
    hashed_portion.extend_from_slice(&(hashed_subpackets.len() as u16).to_be_bytes());
    hashed_portion.extend_from_slice(&hashed_subpackets);

    let mut hasher = Sha256::new();
    hasher.update(message);
    hasher.update(&hashed_portion);
    hasher.update([0x04, 0xFF]);
    hasher.update((hashed_portion.len() as u32).to_be_bytes());
    let digest = hasher.finalize();

    // OpenPGP EdDSA signs the digest itself.
    let signature = material.primary.sign(&digest);

    let issuer = key_id(&fingerprint(primary_public_body)?);
    let mut unhashed = Vec::new();
    write_subpacket(&mut unhashed, SUBPACKET_ISSUER, &issuer)?;

    let mut body = hashed_portion;
    body.extend_from_slice(&(unhashed.len() as u16).to_be_bytes());
    body.extend_from_slice(&unhashed);
    body.extend_from_slice(&digest[..2]);
    body.extend_from_slice(&crate::pgp::packet::encode_mpi(signature.r_bytes()));
    body.extend_from_slice(&crate::pgp::packet::encode_mpi(signature.s_bytes()));
    Ok(body)
}
