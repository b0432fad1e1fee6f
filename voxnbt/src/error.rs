//! The error type returned by every fallible operation in this crate.

use std::fmt;

/// One of the twelve NBT payload tags, plus the end-of-compound marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum Tag {
    End,
    Byte,
    Short,
    Int,
    Long,
    Float,
    Double,
    ByteArray,
    String,
    List,
    Compound,
    IntArray,
    LongArray,
}

impl Tag {
    pub(crate) fn from_byte(b: u8) -> Option<Tag> {
        Some(match b {
            0 => Tag::End,
            1 => Tag::Byte,
            2 => Tag::Short,
            3 => Tag::Int,
            4 => Tag::Long,
            5 => Tag::Float,
            6 => Tag::Double,
            7 => Tag::ByteArray,
            8 => Tag::String,
            9 => Tag::List,
            10 => Tag::Compound,
            11 => Tag::IntArray,
            12 => Tag::LongArray,
            _ => return None,
        })
    }
}

/// Everything that can go wrong decoding a byte stream into a [`crate::Value`]
/// tree, or pulling a typed value back out of one once decoded.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum Error {
    /// A tag byte outside the 0..=12 range NBT defines.
    UnknownTag(u8),
    /// A list or array length prefix that can't be a real element count
    /// (negative, or larger than this platform's `usize`).
    LengthOutOfRange(i32),
    /// The top-level value wasn't a compound; every well-formed blob starts
    /// with one.
    RootNotCompound,
    /// A string's bytes didn't decode as UTF-8.
    InvalidString(Vec<u8>),
    /// A caller asked a [`crate::Value`] for a shape it isn't.
    TypeMismatch { found: Tag, wanted: &'static str },
    /// The stream ended before a complete value could be read.
    Truncated,
    Io(std::sync::Arc<std::io::Error>),
    Other(String),
}

/// Convenience alias for this crate's `Result`.
pub type Result<T> = std::result::Result<T, Error>;

impl std::error::Error for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::UnknownTag(b) => write!(f, "byte {b} is not a valid nbt tag"),
            Error::LengthOutOfRange(n) => write!(f, "list/array length {n} does not fit in memory"),
            Error::RootNotCompound => write!(f, "nbt data does not start with a compound"),
            Error::InvalidString(bytes) => {
                write!(f, "nbt string is not valid utf-8: {}", String::from_utf8_lossy(bytes))
            }
            Error::TypeMismatch { found, wanted } => write!(f, "wanted a {wanted}, found {found:?}"),
            Error::Truncated => write!(f, "ran out of bytes mid-value"),
            Error::Io(e) => write!(f, "{e}"),
            Error::Other(msg) => f.write_str(msg),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        match e.kind() {
            std::io::ErrorKind::UnexpectedEof => Error::Truncated,
            _ => Error::Io(std::sync::Arc::new(e)),
        }
    }
}

impl Error {
    pub(crate) fn type_mismatch(found: Tag, wanted: &'static str) -> Error {
        Error::TypeMismatch { found, wanted }
    }
}
