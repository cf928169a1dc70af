use lazy_static::lazy_static;
use ndarray::Array2;
use regex::Regex;

use super::vocabulary::{Vocabulary, UNKNOWN_TOKEN_ID};

/// Sequence length the bundled models are exported with.
pub const MAX_SEQUENCE_LENGTH: usize = 128;

lazy_static! {
    static ref NON_WORD: Regex = Regex::new(r"[^\w\s]").expect("static regex is valid");
}

/// Splits free text into lowercase word tokens.
///
/// Every character that is neither a word character nor whitespace is
/// treated as a separator, so `"Hello, world!"` yields `["hello", "world"]`.
/// Input without word characters yields an empty vector.
pub fn tokenize(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    NON_WORD
        .replace_all(&lowered, " ")
        .split_whitespace()
        .map(str::to_owned)
        .collect()
}

/// Maps tokens to vocabulary IDs and fits them to exactly `max_len` entries.
///
/// Unknown tokens become [`UNKNOWN_TOKEN_ID`]. Longer sequences keep their
/// prefix, shorter ones are padded at the tail with the same ID.
pub fn encode<S: AsRef<str>>(tokens: &[S], vocabulary: &Vocabulary, max_len: usize) -> Vec<i64> {
    let mut ids: Vec<i64> = tokens
        .iter()
        .take(max_len)
        .map(|token| vocabulary.id_of(token.as_ref()))
        .collect();
    ids.resize(max_len, UNKNOWN_TOKEN_ID);
    ids
}

/// Tokenizes and encodes `text` into a `[1, max_len]` batch.
pub fn encode_text(text: &str, vocabulary: &Vocabulary, max_len: usize) -> Array2<i64> {
    let ids = encode(&tokenize(text), vocabulary, max_len);
    Array2::from_shape_vec((1, max_len), ids)
        .unwrap_or_else(|_| Array2::zeros((1, max_len)))
}
