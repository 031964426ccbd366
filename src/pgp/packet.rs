/// Low-level OpenPGP packet framing: new-format headers, MPIs, and signature
/// subpackets, per RFC 4880.
use crate::error::{MnemonikeyError, Result};

pub const TAG_SIGNATURE: u8 = 2;
pub const TAG_SECRET_KEY: u8 = 5;
pub const TAG_SECRET_SUBKEY: u8 = 7;
pub const TAG_USER_ID: u8 = 13;

/// Public-key algorithm IDs.
pub const ALGO_ECDH: u8 = 18;
pub const ALGO_EDDSA: u8 = 22;

/// Hash algorithm IDs.
pub const HASH_SHA256: u8 = 8;

/// Symmetric algorithm IDs.
pub const SYM_AES128: u8 = 7;
pub const SYM_AES256: u8 = 9;

/// Compression algorithm IDs.
pub const COMPRESSION_UNCOMPRESSED: u8 = 0;

/// Curve OIDs as serialized in key packets (without the length octet).
pub const OID_ED25519: &[u8] = &[0x2B, 0x06, 0x01, 0x04, 0x01, 0xDA, 0x47, 0x0F, 0x01];
pub const OID_CURVE25519: &[u8] = &[0x2B, 0x06, 0x01, 0x04, 0x01, 0x97, 0x55, 0x01, 0x05, 0x01];

/// Signature subpacket types.
pub const SUBPACKET_CREATION_TIME: u8 = 2;
pub const SUBPACKET_KEY_EXPIRY: u8 = 9;
pub const SUBPACKET_PREF_SYMMETRIC: u8 = 11;
pub const SUBPACKET_ISSUER: u8 = 16;
pub const SUBPACKET_PREF_HASH: u8 = 21;
pub const SUBPACKET_PREF_COMPRESSION: u8 = 22;
pub const SUBPACKET_KEY_FLAGS: u8 = 27;
pub const SUBPACKET_FEATURES: u8 = 30;

/// Frame `body` as a new-format packet with the given tag.
pub fn write_packet(out: &mut Vec<u8>, tag: u8, body: &[u8]) -> Result<()> {
    out.push(0xC0 | tag);
    write_new_format_length(out, body.len())?;
    out.extend_from_slice(body);
    Ok(())
}

/// New-format packet length encoding (RFC 4880 section 4.2.2, definite
/// lengths only).
fn write_new_format_length(out: &mut Vec<u8>, len: usize) -> Result<()> {
    if len < 192 {
        out.push(len as u8);
    } else if len < 8384 {
        let adjusted = len - 192;
        out.push((adjusted >> 8) as u8 + 192);
        out.push(adjusted as u8);
    } else {
        let len = u32::try_from(len)
            .map_err(|_| MnemonikeyError::Serialization("packet too large".into()))?;
        out.push(0xFF);
        out.extend_from_slice(&len.to_be_bytes());
    }
    Ok(())
}

/// Encode bytes as a multiprecision integer: a two-octet big-endian bit count
/// followed by the value with leading zero octets stripped.
pub fn encode_mpi(value: &[u8]) -> Vec<u8> {
    let start = value.iter().position(|&b| b != 0).unwrap_or(value.len());
    let stripped = &value[start..];
    let bit_len = match stripped.first() {
        Some(&first) => (stripped.len() - 1) * 8 + (8 - first.leading_zeros() as usize),
        None => 0,
    };
    let mut out = Vec::with_capacity(2 + stripped.len());
    out.extend_from_slice(&(bit_len as u16).to_be_bytes());
    out.extend_from_slice(stripped);
    out
}

/// Append one signature subpacket (length ‖ type ‖ body).
pub fn write_subpacket(out: &mut Vec<u8>, subpacket_type: u8, body: &[u8]) -> Result<()> {
    let len = body.len() + 1;
    if len < 192 {
        out.push(len as u8);
    } else if len < 16320 {
        let adjusted = len - 192;
        out.push((adjusted >> 8) as u8 + 192);
        out.push(adjusted as u8);
    } else {
        return Err(MnemonikeyError::Serialization(
            "oversized signature subpacket".into(),
        ));
    }
    out.push(subpacket_type);
    out.extend_from_slice(body);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packet_framing_short() {
        let mut out = Vec::new();
        write_packet(&mut out, TAG_USER_ID, b"alice").unwrap();
        assert_eq!(out, [0xCD, 5, b'a', b'l', b'i', b'c', b'e']);
    }

    #[test]
    fn test_packet_framing_two_octet() {
        let body = vec![0u8; 300];
        let mut out = Vec::new();
        write_packet(&mut out, TAG_SECRET_KEY, &body).unwrap();
        assert_eq!(out[0], 0xC5);
        // 300 - 192 = 108 = 0x6C
        assert_eq!(&out[1..3], &[192, 0x6C]);
        assert_eq!(out.len(), 3 + 300);
    }

    #[test]
    fn test_packet_framing_five_octet() {
        let body = vec![0u8; 9000];
        let mut out = Vec::new();
        write_packet(&mut out, TAG_SIGNATURE, &body).unwrap();
        assert_eq!(out[1], 0xFF);
        assert_eq!(&out[2..6], &9000u32.to_be_bytes());
    }

    #[test]
    fn test_mpi_encoding() {
        assert_eq!(encode_mpi(&[0x01]), vec![0x00, 0x01, 0x01]);
        assert_eq!(encode_mpi(&[0xFF]), vec![0x00, 0x08, 0xFF]);
        // Leading zeros are stripped and the bit count reflects the top bit.
        assert_eq!(encode_mpi(&[0x00, 0x40, 0x00]), vec![0x00, 0x0F, 0x40, 0x00]);
        // The zero integer has a zero bit count and no value octets.
        assert_eq!(encode_mpi(&[0x00, 0x00]), vec![0x00, 0x00]);
        // A native-form EC point (0x40 prefix + 32 bytes) is 263 bits.
        let mut point = vec![0x40];
        point.extend_from_slice(&[0x11; 32]);
        let mpi = encode_mpi(&point);
        assert_eq!(&mpi[..2], &[0x01, 0x07]);
        assert_eq!(mpi.len(), 2 + 33);
    }

    #[test]
    fn test_subpacket_framing() {
        let mut out = Vec::new();
        write_subpacket(&mut out, SUBPACKET_KEY_FLAGS, &[0x03]).unwrap();
        assert_eq!(out, [0x02, SUBPACKET_KEY_FLAGS, 0x03]);
    }
}
