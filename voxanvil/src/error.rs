//! Error type shared by every stage of the pipeline.
//!
//! Per the failure model: most of these are logged by the caller and
//! recovered from (an empty mesh, a skipped archive entry, an air block);
//! `Error` exists so every fallible boundary still returns a typed value
//! instead of reaching for `unwrap`.
use std::fmt::Display;

#[derive(Debug)]
#[non_exhaustive]
pub enum Error {
    Io(std::io::Error),
    Nbt(voxnbt::Error),
    Json { key: String, source: serde_json::Error },
    Zip(zip::result::ZipError),
    Image(image::ImageError),
    MalformedRegion(String),
    UnknownIdentifier(String),
    InvariantViolation(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl std::error::Error for Error {}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Io(e) => write!(f, "io error: {e}"),
            Error::Nbt(e) => write!(f, "nbt error: {e}"),
            Error::Json { key, source } => write!(f, "malformed json at {key}: {source}"),
            Error::Zip(e) => write!(f, "zip error: {e}"),
            Error::Image(e) => write!(f, "image error: {e}"),
            Error::MalformedRegion(msg) => write!(f, "malformed region file: {msg}"),
            Error::UnknownIdentifier(id) => write!(f, "unparseable identifier: {id}"),
            Error::InvariantViolation(msg) => write!(f, "mesh invariant violated (this is a bug): {msg}"),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<voxnbt::Error> for Error {
    fn from(e: voxnbt::Error) -> Self {
        Error::Nbt(e)
    }
}

impl From<zip::result::ZipError> for Error {
    fn from(e: zip::result::ZipError) -> Self {
        Error::Zip(e)
    }
}

impl From<image::ImageError> for Error {
    fn from(e: image::ImageError) -> Self {
        Error::Image(e)
    }
}
