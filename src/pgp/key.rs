/// Key packet bodies (tags 5 and 7), fingerprints, and key IDs.
///
/// The public portion of each packet is the fingerprint input, so its byte
/// layout is fixed forever: v4 ‖ creation time ‖ algorithm ‖ curve OID ‖
/// point MPI (‖ KDF parameters for ECDH).
use rand::{CryptoRng, RngCore};
use sha1::{Digest, Sha1};
use zeroize::Zeroize;

use crate::crypto::keys::PgpKeyMaterial;
use crate::error::{MnemonikeyError, Result};
use crate::pgp::packet::{
    encode_mpi, ALGO_ECDH, ALGO_EDDSA, HASH_SHA256, OID_CURVE25519, OID_ED25519, SYM_AES128,
    SYM_AES256,
};
use crate::pgp::s2k;

/// Prefix octet marking an EC point in native (compressed Edwards /
/// Montgomery u) form.
const NATIVE_POINT_PREFIX: u8 = 0x40;

/// Secret-key usage octets.
const USAGE_PLAINTEXT: u8 = 0x00;
const USAGE_S2K_SHA1: u8 = 0xFE;

fn creation_time_be(material: &PgpKeyMaterial) -> Result<[u8; 4]> {
    let seconds = u32::try_from(material.created_at).map_err(|_| {
        MnemonikeyError::Serialization("key creation time exceeds the v4 timestamp range".into())
    })?;
    Ok(seconds.to_be_bytes())
}

fn native_point_mpi(public: &[u8; 32]) -> Vec<u8> {
    let mut point = Vec::with_capacity(33);
    point.push(NATIVE_POINT_PREFIX);
    point.extend_from_slice(public);
    encode_mpi(&point)
}

/// Public portion of the primary EdDSA key packet.
pub fn primary_public_body(material: &PgpKeyMaterial) -> Result<Vec<u8>> {
    let mut body = Vec::new();
    body.push(4);
    body.extend_from_slice(&creation_time_be(material)?);
    body.push(ALGO_EDDSA);
    body.push(OID_ED25519.len() as u8);
    body.extend_from_slice(OID_ED25519);
    body.extend_from_slice(&native_point_mpi(&material.primary.public_bytes()));
    Ok(body)
}

/// Public portion of the ECDH subkey packet, including the KDF parameter
/// field {reserved=1, SHA-256, AES-128}.
pub fn subkey_public_body(material: &PgpKeyMaterial) -> Result<Vec<u8>> {
    let mut body = Vec::new();
    body.push(4);
    body.extend_from_slice(&creation_time_be(material)?);
    body.push(ALGO_ECDH);
    body.push(OID_CURVE25519.len() as u8);
    body.extend_from_slice(OID_CURVE25519);
    body.extend_from_slice(&native_point_mpi(&material.subkey.public_bytes()));
    body.extend_from_slice(&[0x03, 0x01, HASH_SHA256, SYM_AES128]);
    Ok(body)
}

/// SHA-1 v4 fingerprint: 0x99 ‖ two-octet length ‖ public body.
pub fn fingerprint(public_body: &[u8]) -> Result<[u8; 20]> {
    let len = u16::try_from(public_body.len())
        .map_err(|_| MnemonikeyError::Serialization("oversized public key body".into()))?;
    let mut hasher = Sha1::new();
    hasher.update([0x99]);
    hasher.update(len.to_be_bytes());
    hasher.update(public_body);
    Ok(hasher.finalize().into())
}

/// Key ID: the low (trailing) 8 bytes of the fingerprint.
pub fn key_id(fingerprint: &[u8; 20]) -> [u8; 8] {
    fingerprint[12..].try_into().expect("8 bytes")
}

/// The Curve25519 secret scalar as stored on the wire: a big-endian integer,
/// which is the native little-endian scalar byte-reversed (GnuPG convention).
pub fn x25519_secret_be(scalar: &[u8; 32]) -> [u8; 32] {
    let mut be = *scalar;
    be.reverse();
    be
}

/// Assemble a complete secret-key or secret-subkey packet body: the public
/// portion followed by the (optionally S2K-protected) secret scalar.
pub fn secret_packet_body<R: RngCore + CryptoRng>(
    public_body: &[u8],
    secret_be: &[u8; 32],
    password: Option<&[u8]>,
    rng: &mut R,
) -> Result<Vec<u8>> {
    let mut secret_mpi = encode_mpi(secret_be);
    let mut body = public_body.to_vec();
    match password {
        None => {
            body.push(USAGE_PLAINTEXT);
            body.extend_from_slice(&secret_mpi);
            let sum: u16 = secret_mpi
                .iter()
                .fold(0u16, |acc, &b| acc.wrapping_add(u16::from(b)));
            body.extend_from_slice(&sum.to_be_bytes());
        }
        Some(password) => {
            let protection = s2k::encrypt_secret_material(&secret_mpi, password, rng)?;
            body.push(USAGE_S2K_SHA1);
            body.push(SYM_AES256);
            body.push(s2k::S2K_SPECIFIER_ITERATED_SALTED);
            body.push(HASH_SHA256);
            body.extend_from_slice(&protection.salt);
            body.push(s2k::S2K_CODED_COUNT);
            body.extend_from_slice(&protection.iv);
            body.extend_from_slice(&protection.ciphertext);
        }
    }
    secret_mpi.zeroize();
    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::keys::derive_key_material;
    use crate::crypto::sensitive::Seed;

    fn material() -> PgpKeyMaterial {
        derive_key_material(&Seed::new([0x0F; 16]), 200).unwrap()
    }

    #[test]
    fn test_primary_body_layout() {
        let m = material();
        let body = primary_public_body(&m).unwrap();
        assert_eq!(body[0], 4);
        assert_eq!(body[5], ALGO_EDDSA);
        assert_eq!(body[6] as usize, OID_ED25519.len());
        // version + time + algo + oid_len + oid + mpi(2 + 33)
        assert_eq!(body.len(), 1 + 4 + 1 + 1 + OID_ED25519.len() + 35);
    }

    #[test]
    fn test_subkey_body_layout() {
        let m = material();
        let body = subkey_public_body(&m).unwrap();
        assert_eq!(body[0], 4);
        assert_eq!(body[5], ALGO_ECDH);
        assert_eq!(&body[body.len() - 4..], &[0x03, 0x01, HASH_SHA256, SYM_AES128]);
    }

    #[test]
    fn test_fingerprint_stability() {
        let m = material();
        let body = primary_public_body(&m).unwrap();
        let fp1 = fingerprint(&body).unwrap();
        let fp2 = fingerprint(&body).unwrap();
        assert_eq!(fp1, fp2);
        assert_eq!(key_id(&fp1), &fp1[12..]);

        // The fingerprint covers the creation time.
        let seed = Seed::new([0x0F; 16]);
        let later = derive_key_material(&seed, 201).unwrap();
        let other = fingerprint(&primary_public_body(&later).unwrap()).unwrap();
        assert_ne!(fp1, other);
    }

    #[test]
    fn test_x25519_secret_byte_order() {
        let mut scalar = [0u8; 32];
        scalar[0] = 0xA8;
        scalar[31] = 0x41;
        let be = x25519_secret_be(&scalar);
        assert_eq!(be[0], 0x41);
        assert_eq!(be[31], 0xA8);
    }

    #[test]
    fn test_plaintext_secret_checksum() {
        let m = material();
        let public = primary_public_body(&m).unwrap();
        let mut rng = rand::rngs::OsRng;
        let body = secret_packet_body(&public, m.primary.secret_bytes(), None, &mut rng).unwrap();
        assert_eq!(body[public.len()], USAGE_PLAINTEXT);

        let secret_area = &body[public.len() + 1..];
        let (mpi, checksum) = secret_area.split_at(secret_area.len() - 2);
        let sum: u16 = mpi.iter().fold(0u16, |acc, &b| acc.wrapping_add(u16::from(b)));
        assert_eq!(checksum, sum.to_be_bytes());
    }

    #[test]
    fn test_s2k_secret_area_shape() {
        let m = material();
        let public = subkey_public_body(&m).unwrap();
        let secret_be = x25519_secret_be(m.subkey.secret_bytes());
        let mut rng = rand::rngs::OsRng;
        let body = secret_packet_body(&public, &secret_be, Some(b"pw"), &mut rng).unwrap();
        let area = &body[public.len()..];
        assert_eq!(area[0], USAGE_S2K_SHA1);
        assert_eq!(area[1], SYM_AES256);
        assert_eq!(area[2], s2k::S2K_SPECIFIER_ITERATED_SALTED);
        assert_eq!(area[3], HASH_SHA256);
        assert_eq!(area[12], s2k::S2K_CODED_COUNT);
    }
}
