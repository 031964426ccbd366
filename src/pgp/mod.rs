/// OpenPGP serialization: canonical packets for the transferable secret key
/// and the ASCII armor around them.
///
/// Emission order is fixed: secret key, user ID, certification, secret
/// subkey, binding signature. Everything except the S2K salt and IV is a
/// deterministic function of the key material and user ID, so the
/// unprotected serialization is byte-stable across runs.
use rand::{CryptoRng, RngCore};

use crate::crypto::keys::PgpKeyMaterial;
use crate::error::{MnemonikeyError, Result};

pub mod armor;
pub mod key;
pub mod packet;
pub mod s2k;
pub mod signature;

/// An OpenPGP user ID: `Name <email>` or `Name (Comment) <email>`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserId {
    name: String,
    email: String,
    comment: Option<String>,
}

impl UserId {
    pub fn new(name: &str, email: &str, comment: Option<&str>) -> Result<Self> {
        validate_field("name", name)?;
        validate_field("email", email)?;
        if !email.contains('@') || email.contains(char::is_whitespace) {
            return Err(MnemonikeyError::InputValidation(format!(
                "'{email}' is not an email address"
            )));
        }
        if let Some(comment) = comment {
            validate_field("comment", comment)?;
        }
        Ok(Self {
            name: name.trim().to_string(),
            email: email.to_string(),
            comment: comment.map(|c| c.trim().to_string()),
        })
    }

    /// Render the canonical user ID string.
    pub fn format(&self) -> String {
        match &self.comment {
            Some(comment) => format!("{} ({comment}) <{}>", self.name, self.email),
            None => format!("{} <{}>", self.name, self.email),
        }
    }
}

fn validate_field(label: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(MnemonikeyError::InputValidation(format!("{label} is empty")));
    }
    if value.chars().any(|c| c.is_control() || "<>()".contains(c)) {
        return Err(MnemonikeyError::InputValidation(format!(
            "{label} contains a control character or bracket"
        )));
    }
    Ok(())
}

/// Serialize a complete armored private key block.
///
/// `key_password`, when present, wraps both secret areas with S2K
/// protection; the fingerprint is unaffected. `ttl_seconds` sets the key
/// expiration subpackets.
pub fn serialize_private_key<R: RngCore + CryptoRng>(
    material: &PgpKeyMaterial,
    user_id: &UserId,
    ttl_seconds: Option<u32>,
    key_password: Option<&[u8]>,
    rng: &mut R,
) -> Result<String> {
    let primary_public = key::primary_public_body(material)?;
    let subkey_public = key::subkey_public_body(material)?;

    let mut packets = Vec::new();

    let primary_secret = key::secret_packet_body(
        &primary_public,
        material.primary.secret_bytes(),
        key_password,
        rng,
    )?;
    packet::write_packet(&mut packets, packet::TAG_SECRET_KEY, &primary_secret)?;

    let uid = user_id.format();
    packet::write_packet(&mut packets, packet::TAG_USER_ID, uid.as_bytes())?;

    let cert = signature::certification(material, &primary_public, &uid, ttl_seconds)?;
    packet::write_packet(&mut packets, packet::TAG_SIGNATURE, &cert)?;

    let subkey_secret_be = key::x25519_secret_be(material.subkey.secret_bytes());
    let subkey_secret =
        key::secret_packet_body(&subkey_public, &subkey_secret_be, key_password, rng)?;
    packet::write_packet(&mut packets, packet::TAG_SECRET_SUBKEY, &subkey_secret)?;

    let binding =
        signature::subkey_binding(material, &primary_public, &subkey_public, ttl_seconds)?;
    packet::write_packet(&mut packets, packet::TAG_SIGNATURE, &binding)?;

    Ok(armor::enarmor(&packets))
}

/// The primary key fingerprint for a set of key material.
pub fn primary_fingerprint(material: &PgpKeyMaterial) -> Result<[u8; 20]> {
    key::fingerprint(&key::primary_public_body(material)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::keys::derive_key_material;
    use crate::crypto::sensitive::Seed;

    fn material() -> PgpKeyMaterial {
        derive_key_material(&Seed::new([0x37; 16]), 100).unwrap()
    }

    fn user_id() -> UserId {
        UserId::new("Alice", "alice@example.com", None).unwrap()
    }

    #[test]
    fn test_user_id_formatting() {
        assert_eq!(user_id().format(), "Alice <alice@example.com>");
        let full = UserId::new("Alice", "alice@example.com", Some("work")).unwrap();
        assert_eq!(full.format(), "Alice (work) <alice@example.com>");
    }

    #[test]
    fn test_user_id_validation() {
        assert!(UserId::new("", "a@b.c", None).is_err());
        assert!(UserId::new("Alice", "not-an-email", None).is_err());
        assert!(UserId::new("Alice", "a @b.c", None).is_err());
        assert!(UserId::new("Al<ice", "a@b.c", None).is_err());
        assert!(UserId::new("Alice", "a@b.c", Some("x)x")).is_err());
    }

    /// Walk the packet stream and return (tag, body) pairs.
    fn parse_packets(mut data: &[u8]) -> Vec<(u8, Vec<u8>)> {
        let mut packets = Vec::new();
        while !data.is_empty() {
            let tag = data[0] & 0x3F;
            assert_eq!(data[0] & 0xC0, 0xC0, "new-format header expected");
            let (len, header) = match data[1] {
                n if n < 192 => (n as usize, 2),
                n if n < 224 => (((n as usize - 192) << 8) + data[2] as usize + 192, 3),
                0xFF => (
                    u32::from_be_bytes(data[2..6].try_into().unwrap()) as usize,
                    6,
                ),
                _ => panic!("partial lengths are never emitted"),
            };
            packets.push((tag, data[header..header + len].to_vec()));
            data = &data[header + len..];
        }
        packets
    }

    #[test]
    fn test_packet_sequence() {
        let mut rng = rand::rngs::OsRng;
        let armored =
            serialize_private_key(&material(), &user_id(), None, None, &mut rng).unwrap();
        let data = armor::dearmor(&armored).unwrap();
        let packets = parse_packets(&data);
        let tags: Vec<u8> = packets.iter().map(|(t, _)| *t).collect();
        assert_eq!(
            tags,
            [
                packet::TAG_SECRET_KEY,
                packet::TAG_USER_ID,
                packet::TAG_SIGNATURE,
                packet::TAG_SECRET_SUBKEY,
                packet::TAG_SIGNATURE,
            ]
        );
        assert_eq!(packets[1].1, b"Alice <alice@example.com>");
    }

    #[test]
    fn test_unprotected_output_is_byte_stable() {
        let mut rng = rand::rngs::OsRng;
        let a = serialize_private_key(&material(), &user_id(), None, None, &mut rng).unwrap();
        let b = serialize_private_key(&material(), &user_id(), None, None, &mut rng).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_s2k_protection_changes_secret_area_only() {
        let mut rng = rand::rngs::OsRng;
        let m = material();
        let uid = user_id();
        let plain = serialize_private_key(&m, &uid, None, None, &mut rng).unwrap();
        let locked = serialize_private_key(&m, &uid, None, Some(b"pw"), &mut rng).unwrap();
        assert_ne!(plain, locked);

        // The public portion, which the fingerprint covers, is unchanged.
        let data = armor::dearmor(&locked).unwrap();
        let packets = parse_packets(&data);
        let primary_public = key::primary_public_body(&m).unwrap();
        let plain_packets = parse_packets(&armor::dearmor(&plain).unwrap());
        assert_eq!(
            &plain_packets[0].1[..primary_public.len()],
            &packets[0].1[..primary_public.len()]
        );
        let area = &packets[0].1[primary_public.len()..];
        assert_eq!(area[0], 0xFE);
        let salt: [u8; 8] = area[4..12].try_into().unwrap();
        let iv: [u8; 16] = area[13..29].try_into().unwrap();
        let secret = s2k::decrypt_secret_material(&area[29..], b"pw", &salt, &iv).unwrap();
        assert_eq!(secret, packet::encode_mpi(m.primary.secret_bytes()));
    }

    #[test]
    fn test_ttl_adds_expiration() {
        let mut rng = rand::rngs::OsRng;
        let with_ttl =
            serialize_private_key(&material(), &user_id(), Some(86_400), None, &mut rng).unwrap();
        let without =
            serialize_private_key(&material(), &user_id(), None, None, &mut rng).unwrap();
        assert_ne!(with_ttl, without);
    }
}
