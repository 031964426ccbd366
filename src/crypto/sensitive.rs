/// Wrappers for secret material that is automatically zeroized on drop.
///
/// The seed and every scalar derived from it live in these types from
/// creation until they are serialized into the output stream; nothing secret
/// is held in a plain array or `Vec`.
use rand::{CryptoRng, RngCore};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{MnemonikeyError, Result};

/// Byte length of the root seed.
pub const SEED_LEN: usize = 16;

/// The 128-bit root entropy a recovery phrase backs up.
///
/// Zeroized on drop. `Debug` never prints the contents.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct Seed([u8; SEED_LEN]);

impl Seed {
    pub fn new(bytes: [u8; SEED_LEN]) -> Self {
        Self(bytes)
    }

    /// Draw a fresh seed from the injected CSPRNG.
    pub fn generate<R: RngCore + CryptoRng>(rng: &mut R) -> Result<Self> {
        let mut bytes = [0u8; SEED_LEN];
        rng.try_fill_bytes(&mut bytes)
            .map_err(|e| MnemonikeyError::Entropy(e.to_string()))?;
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; SEED_LEN] {
        &self.0
    }
}

impl std::fmt::Debug for Seed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Seed").field("bytes", &"[REDACTED]").finish()
    }
}

/// A 32-byte secret value (stretched root key or derived scalar), zeroized
/// when dropped.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SensitiveBytes32([u8; 32]);

impl SensitiveBytes32 {
    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl std::fmt::Debug for SensitiveBytes32 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SensitiveBytes32")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}
