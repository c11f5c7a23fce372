//! Error taxonomy for string and codec primitives that originates below
//! the Value layer: `ConversionRange`, `ConversionFormat`, `DomainValue`,
//! `IndexOutOfBounds`.

#[derive(Debug, thiserror::Error, PartialEq, Eq, Clone)]
pub enum StringError {
    #[error("index {pos} out of bounds for string of length {len}")]
    IndexOutOfBounds { pos: i64, len: usize },

    #[error("negative length {0}")]
    NegativeLength(i64),

    #[error("{0} does not fit in {1} {2}")]
    ConversionRange(String, usize, &'static str),

    #[error("invalid {kind} character {ch:?} at position {pos}")]
    ConversionFormat {
        kind: &'static str,
        ch: char,
        pos: usize,
    },

    #[error("{0}")]
    DomainValue(String),

    #[error("malformed UTF-8 at byte offset {byte_offset} (character {char_index})")]
    MalformedUtf8 {
        byte_offset: usize,
        char_index: usize,
    },

    #[error("regular expression {0:?} failed to compile: {1}")]
    BadRegex(String, String),

    #[error("capture group {group} out of bounds ({available} captured)")]
    GroupOutOfBounds { group: usize, available: usize },
}
