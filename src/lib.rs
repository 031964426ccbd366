pub mod bits;
pub mod crypto;
pub mod error;
pub mod mnemonic;
pub mod pgp;
pub mod pipeline;
pub mod words;

pub use error::{MnemonikeyError, Result};
pub use pipeline::{
    convert, generate, recover, GenerateOptions, GeneratedIdentity, RecoveredIdentity,
};
