//! Flat binary encoding of [`SvgArtifact`] for both cache tiers.
//!
//! Layout: `b"D2SV"`, format version (`u8`), width (`i32` LE), height
//! (`i32` LE), then viewBox, preserveAspectRatio and body as `u32` LE
//! length-prefixed UTF-8. The body is copied through untouched.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use thiserror::Error;

use crate::domain::artifact::SvgArtifact;

const MAGIC: &[u8; 4] = b"D2SV";
const VERSION: u8 = 1;
const HEADER_LEN: usize = MAGIC.len() + 1 + 4 + 4;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("entry does not start with the artifact signature")]
    BadMagic,
    #[error("unsupported artifact format version {0}")]
    UnsupportedVersion(u8),
    #[error("entry truncated while reading {field}")]
    Truncated { field: &'static str },
    #[error("field {field} is not valid UTF-8")]
    InvalidUtf8 { field: &'static str },
    #[error("{0} unexpected trailing bytes")]
    TrailingBytes(usize),
    #[error("field {field} is too large to encode")]
    TooLarge { field: &'static str },
}

pub fn encode(artifact: &SvgArtifact) -> Result<Bytes, CodecError> {
    let capacity = HEADER_LEN
        + 12
        + artifact.view_box.len()
        + artifact.preserve_aspect_ratio.len()
        + artifact.body.len();
    let mut buf = BytesMut::with_capacity(capacity);
    buf.put_slice(MAGIC);
    buf.put_u8(VERSION);
    buf.put_i32_le(artifact.width);
    buf.put_i32_le(artifact.height);
    put_str(&mut buf, "view_box", &artifact.view_box)?;
    put_str(
        &mut buf,
        "preserve_aspect_ratio",
        &artifact.preserve_aspect_ratio,
    )?;
    put_str(&mut buf, "body", &artifact.body)?;
    Ok(buf.freeze())
}

pub fn decode(bytes: &[u8]) -> Result<SvgArtifact, CodecError> {
    let mut buf = bytes;
    if buf.remaining() < HEADER_LEN {
        if !MAGIC.starts_with(&buf[..buf.len().min(MAGIC.len())]) {
            return Err(CodecError::BadMagic);
        }
        return Err(CodecError::Truncated { field: "header" });
    }

    if &buf[..MAGIC.len()] != MAGIC {
        return Err(CodecError::BadMagic);
    }
    buf.advance(MAGIC.len());

    let version = buf.get_u8();
    if version != VERSION {
        return Err(CodecError::UnsupportedVersion(version));
    }

    let width = buf.get_i32_le();
    let height = buf.get_i32_le();
    let view_box = get_str(&mut buf, "view_box")?;
    let preserve_aspect_ratio = get_str(&mut buf, "preserve_aspect_ratio")?;
    let body = get_str(&mut buf, "body")?;

    if buf.has_remaining() {
        return Err(CodecError::TrailingBytes(buf.remaining()));
    }

    Ok(SvgArtifact {
        body,
        width,
        height,
        view_box,
        preserve_aspect_ratio,
    })
}

fn put_str(buf: &mut BytesMut, field: &'static str, value: &str) -> Result<(), CodecError> {
    let len = u32::try_from(value.len()).map_err(|_| CodecError::TooLarge { field })?;
    buf.put_u32_le(len);
    buf.put_slice(value.as_bytes());
    Ok(())
}

fn get_str(buf: &mut &[u8], field: &'static str) -> Result<String, CodecError> {
    if buf.remaining() < 4 {
        return Err(CodecError::Truncated { field });
    }
    let len = buf.get_u32_le() as usize;
    if buf.remaining() < len {
        return Err(CodecError::Truncated { field });
    }
    let value = std::str::from_utf8(&buf[..len])
        .map_err(|_| CodecError::InvalidUtf8 { field })?
        .to_string();
    buf.advance(len);
    Ok(value)
}
