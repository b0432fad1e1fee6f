//! Minimal NBT reader for Minecraft Java Edition region/chunk data.
//!
//! This crate decodes the binary NBT compound that a region file's chunk
//! payload decompresses to, into an owned [`Value`] tree. It deliberately
//! does not attempt a zero-copy `serde` deserializer: `voxanvil` only reads
//! each chunk's compound a handful of times, so the decompression cost
//! dominates and an owned tree keeps the reading code simple and auditable.

pub mod error;
pub mod read;
pub mod value;

pub use error::{Error, Result, Tag};
pub use read::{from_bytes, from_reader};
pub use value::Value;
