/// The embedded 4096-entry English wordlist used by the recovery phrase codec.
///
/// Each word is lowercase ASCII, 3 to 8 characters long, and distinct from
/// every other word in its first four characters. The list is a compatibility
/// contract: phrases only decode against this exact table, in this exact
/// order. Lookup accepts any prefix of four or more characters, so users may
/// transcribe truncated words.
use std::collections::HashMap;
use std::sync::LazyLock;

const WORDLIST_RAW: &str = include_str!("wordlist.txt");

/// Number of entries in the wordlist.
pub const WORD_COUNT: usize = 4096;

/// Bits of payload carried by a single word (log2 of `WORD_COUNT`).
pub const BITS_PER_WORD: u32 = 12;

/// Shortest prefix accepted in place of a full word.
pub const MIN_PREFIX_LEN: usize = 4;

static WORDS: LazyLock<Vec<&'static str>> = LazyLock::new(|| {
    let words: Vec<&'static str> = WORDLIST_RAW.split_whitespace().collect();
    assert_eq!(words.len(), WORD_COUNT, "embedded wordlist is malformed");
    words
});

static EXACT_INDEX: LazyLock<HashMap<&'static str, u16>> = LazyLock::new(|| {
    WORDS
        .iter()
        .enumerate()
        .map(|(i, w)| (*w, i as u16))
        .collect()
});

static PREFIX_INDEX: LazyLock<HashMap<&'static str, u16>> = LazyLock::new(|| {
    let mut map = HashMap::with_capacity(WORD_COUNT);
    for (i, word) in WORDS.iter().enumerate() {
        let word: &'static str = *word;
        if word.len() >= MIN_PREFIX_LEN {
            map.insert(&word[..MIN_PREFIX_LEN], i as u16);
        }
    }
    map
});

/// Look up the word at `index`.
///
/// # Panics
/// Panics if `index >= 4096`; callers obtain indices from 12-bit reads, which
/// cannot exceed the table.
pub fn word_of(index: u16) -> &'static str {
    WORDS[index as usize]
}

/// Resolve a word (or a unique prefix of at least four characters) to its
/// index. Case-insensitive. Returns `None` for anything else.
pub fn index_of(word: &str) -> Option<u16> {
    let lowered = word.to_lowercase();
    if !lowered.is_ascii() {
        return None;
    }
    if let Some(&index) = EXACT_INDEX.get(lowered.as_str()) {
        return Some(index);
    }
    if lowered.len() >= MIN_PREFIX_LEN {
        if let Some(&index) = PREFIX_INDEX.get(&lowered[..MIN_PREFIX_LEN]) {
            if WORDS[index as usize].starts_with(lowered.as_str()) {
                return Some(index);
            }
        }
    }
    None
}
