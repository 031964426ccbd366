use thiserror::Error;

#[derive(Error, Debug)]
pub enum MnemonikeyError {
    #[error("invalid input: {0}")]
    InputValidation(String),

    #[error("expecting {expected} words but got {0}", expected = crate::mnemonic::PHRASE_WORD_COUNT)]
    WordCount(usize),

    #[error("word '{0}' is not in the wordlist")]
    UnknownWord(String),

    #[error("recovery phrase checksum mismatch")]
    ChecksumMismatch,

    #[error("unrecognized recovery phrase version {0}")]
    UnknownVersion(u8),

    #[error("reserved bits are set in the recovery phrase")]
    ReservedNonZero,

    #[error("key creation time is out of range")]
    CreationOutOfRange,

    #[error("recovery phrase is password-protected but no password was given")]
    PasswordRequired,

    #[error("wrong password or corrupt recovery phrase")]
    PasswordIncorrect,

    #[error("value {value} does not fit in {width} bits")]
    BitOverflow { value: u64, width: u32 },

    #[error("requested {requested} bits but only {remaining} remain")]
    BitUnderflow { requested: u32, remaining: usize },

    #[error("key derivation failed: {0}")]
    Derivation(String),

    #[error("packet serialization failed: {0}")]
    Serialization(String),

    #[error("system entropy source failed: {0}")]
    Entropy(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, MnemonikeyError>;
