//! Reads Java Edition NBT (big-endian, "network" byte order) into an owned
//! [`Value`] tree.
//!
//! This is a plain recursive-descent reader rather than a zero-copy `serde`
//! `Deserializer`: chunk NBT is decompressed once per chunk and then walked a
//! handful of times by `voxanvil`, so the allocation cost of an owned tree is
//! not the bottleneck region decoding usually has (the zlib inflate is).

use std::collections::HashMap;
use std::io::Read;

use byteorder::{BigEndian, ReadBytesExt};

use crate::error::{Error, Result, Tag};
use crate::value::Value;

/// Reads one named root compound from `r` and returns `(name, value)`.
///
/// Per Minecraft's chunk format the root's name is conventionally empty, but
/// it is preserved here rather than discarded since callers occasionally
/// rely on it for debugging malformed saves.
pub fn from_reader<R: Read>(r: &mut R) -> Result<(String, Value)> {
    let tag = read_tag(r)?;
    if tag != Tag::Compound {
        return Err(Error::RootNotCompound);
    }
    let name = read_modified_utf8(r)?;
    let value = read_payload(r, tag)?;
    Ok((name, value))
}

/// Convenience wrapper over an in-memory buffer.
pub fn from_bytes(bytes: &[u8]) -> Result<(String, Value)> {
    let mut cursor = std::io::Cursor::new(bytes);
    from_reader(&mut cursor)
}

fn read_tag<R: Read>(r: &mut R) -> Result<Tag> {
    let byte = r.read_u8()?;
    Tag::from_byte(byte).ok_or(Error::UnknownTag(byte))
}

fn read_modified_utf8<R: Read>(r: &mut R) -> Result<String> {
    let len = r.read_u16::<BigEndian>()? as usize;
    let mut buf = vec![0u8; len];
    r.read_exact(&mut buf)?;
    String::from_utf8(buf).map_err(|e| Error::InvalidString(e.into_bytes()))
}

fn read_len<R: Read>(r: &mut R) -> Result<usize> {
    let len = r.read_i32::<BigEndian>()?;
    usize::try_from(len).map_err(|_| Error::LengthOutOfRange(len))
}

fn read_payload<R: Read>(r: &mut R, tag: Tag) -> Result<Value> {
    Ok(match tag {
        Tag::End => return Err(Error::UnknownTag(0)),
        Tag::Byte => Value::Byte(r.read_i8()?),
        Tag::Short => Value::Short(r.read_i16::<BigEndian>()?),
        Tag::Int => Value::Int(r.read_i32::<BigEndian>()?),
        Tag::Long => Value::Long(r.read_i64::<BigEndian>()?),
        Tag::Float => Value::Float(r.read_f32::<BigEndian>()?),
        Tag::Double => Value::Double(r.read_f64::<BigEndian>()?),
        Tag::ByteArray => {
            let len = read_len(r)?;
            let mut v = Vec::with_capacity(len);
            for _ in 0..len {
                v.push(r.read_i8()?);
            }
            Value::ByteArray(v)
        }
        Tag::String => Value::String(read_modified_utf8(r)?),
        Tag::List => {
            let elem_tag_byte = r.read_u8()?;
            let elem_tag = Tag::from_byte(elem_tag_byte).ok_or(Error::UnknownTag(elem_tag_byte))?;
            let len = read_len(r)?;
            let mut v = Vec::with_capacity(len);
            for _ in 0..len {
                if elem_tag == Tag::End {
                    // A list of TAG_End with nonzero length is malformed, but
                    // an empty list is commonly encoded this way.
                    break;
                }
                v.push(read_payload(r, elem_tag)?);
            }
            Value::List(v)
        }
        Tag::Compound => {
            let mut m = HashMap::new();
            loop {
                let child_tag = read_tag(r)?;
                if child_tag == Tag::End {
                    break;
                }
                let name = read_modified_utf8(r)?;
                let value = read_payload(r, child_tag)?;
                m.insert(name, value);
            }
            Value::Compound(m)
        }
        Tag::IntArray => {
            let len = read_len(r)?;
            let mut v = Vec::with_capacity(len);
            for _ in 0..len {
                v.push(r.read_i32::<BigEndian>()?);
            }
            Value::IntArray(v)
        }
        Tag::LongArray => {
            let len = read_len(r)?;
            let mut v = Vec::with_capacity(len);
            for _ in 0..len {
                v.push(r.read_i64::<BigEndian>()?);
            }
            Value::LongArray(v)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_root(name: &str, body: impl FnOnce(&mut Vec<u8>)) -> Vec<u8> {
        let mut buf = vec![10u8]; // TAG_Compound
        buf.extend((name.len() as u16).to_be_bytes());
        buf.extend(name.as_bytes());
        body(&mut buf);
        buf.push(0); // TAG_End closes the root compound
        buf
    }

    #[test]
    fn reads_empty_root_compound() {
        let bytes = encode_root("", |_| {});
        let (name, value) = from_bytes(&bytes).unwrap();
        assert_eq!(name, "");
        assert_eq!(value.as_compound().unwrap().len(), 0);
    }

    #[test]
    fn reads_int_field() {
        let bytes = encode_root("", |buf| {
            buf.push(3); // TAG_Int
            buf.extend((11u16).to_be_bytes());
            buf.extend(b"DataVersion");
            buf.extend(3955i32.to_be_bytes());
        });
        let (_, value) = from_bytes(&bytes).unwrap();
        let compound = value.as_compound().unwrap();
        assert_eq!(compound["DataVersion"].as_int().unwrap(), 3955);
    }

    #[test]
    fn reads_long_array() {
        let bytes = encode_root("", |buf| {
            buf.push(12); // TAG_Long_Array
            buf.extend((4u16).to_be_bytes());
            buf.extend(b"data");
            buf.extend(2i32.to_be_bytes());
            buf.extend(1i64.to_be_bytes());
            buf.extend((-2i64).to_be_bytes());
        });
        let (_, value) = from_bytes(&bytes).unwrap();
        let arr = value.get("data").unwrap().as_long_array().unwrap();
        assert_eq!(arr, &[1, -2]);
    }

    #[test]
    fn rejects_non_compound_root() {
        let bytes = vec![3u8, 0, 0, 0, 0, 0, 0];
        assert!(matches!(from_bytes(&bytes), Err(Error::RootNotCompound)));
    }
}
