/// Why a user supplied field value was rejected
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("value is empty")]
    Empty,
    #[error("value is {found} bytes, limit is {max}")]
    TooLong { max: usize, found: usize },
    #[error("expected {expected} characters, found {found}")]
    BadLength { expected: usize, found: usize },
    #[error("missing ':' at position {pos}")]
    MissingSeparator { pos: usize },
    #[error("invalid hex character at position {pos}")]
    InvalidHex { pos: usize },
    #[error("odd number of hex digits")]
    OddLength,
}
