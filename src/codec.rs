//! Canonical big-endian binary encoding used for persisted artifacts.

use sha2::{Digest, Sha256};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("unexpected end of input")]
    Eof,
    #[error("invalid UTF-8 string")]
    InvalidString,
    /// A length prefix claims more elements than bytes remain.
    #[error("length prefix {0} exceeds remaining input")]
    LengthTooLarge(u64),
    #[error("bad magic header")]
    BadMagic,
    #[error("unsupported artifact version {0}")]
    UnsupportedVersion(u32),
    #[error("checksum mismatch")]
    ChecksumMismatch,
    #[error("{0} trailing bytes after artifact body")]
    TrailingBytes(usize),
    #[error("corrupt artifact: {0}")]
    Corrupt(String),
}

pub trait CanonicalEncode {
    fn encode(&self, out: &mut Vec<u8>);

    fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.encode(&mut out);
        out
    }
}

pub trait CanonicalDecode: Sized {
    fn decode(input: &mut &[u8]) -> Result<Self, CodecError>;
}

/// A SHA-256 digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Hash32(pub [u8; 32]);

impl Hash32 {
    pub fn of(payload: &[u8]) -> Self {
        let digest = Sha256::digest(payload);
        let mut out = [0u8; 32];
        out.copy_from_slice(&digest[..]);
        Hash32(out)
    }
}

impl std::fmt::Display for Hash32 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

fn write_u32(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_be_bytes());
}

fn write_u64(out: &mut Vec<u8>, value: u64) {
    out.extend_from_slice(&value.to_be_bytes());
}

pub(crate) fn read_exact<const N: usize>(input: &mut &[u8]) -> Result<[u8; N], CodecError> {
    if input.len() < N {
        return Err(CodecError::Eof);
    }
    let mut buf = [0u8; N];
    buf.copy_from_slice(&input[..N]);
    *input = &input[N..];
    Ok(buf)
}

fn read_u32(input: &mut &[u8]) -> Result<u32, CodecError> {
    Ok(u32::from_be_bytes(read_exact::<4>(input)?))
}

fn read_u64(input: &mut &[u8]) -> Result<u64, CodecError> {
    Ok(u64::from_be_bytes(read_exact::<8>(input)?))
}

fn read_len(input: &mut &[u8]) -> Result<usize, CodecError> {
    let len = read_u64(input)?;
    // Every element takes at least one byte.
    if len > input.len() as u64 {
        return Err(CodecError::LengthTooLarge(len));
    }
    Ok(len as usize)
}

impl CanonicalEncode for u8 {
    fn encode(&self, out: &mut Vec<u8>) {
        out.push(*self);
    }
}

impl CanonicalDecode for u8 {
    fn decode(input: &mut &[u8]) -> Result<Self, CodecError> {
        Ok(read_exact::<1>(input)?[0])
    }
}

impl CanonicalEncode for u32 {
    fn encode(&self, out: &mut Vec<u8>) {
        write_u32(out, *self);
    }
}

impl CanonicalDecode for u32 {
    fn decode(input: &mut &[u8]) -> Result<Self, CodecError> {
        read_u32(input)
    }
}

impl CanonicalEncode for u64 {
    fn encode(&self, out: &mut Vec<u8>) {
        write_u64(out, *self);
    }
}

impl CanonicalDecode for u64 {
    fn decode(input: &mut &[u8]) -> Result<Self, CodecError> {
        read_u64(input)
    }
}

/// Floats are stored as their IEEE-754 bit pattern, so decoding is exact.
impl CanonicalEncode for f64 {
    fn encode(&self, out: &mut Vec<u8>) {
        write_u64(out, self.to_bits());
    }
}

impl CanonicalDecode for f64 {
    fn decode(input: &mut &[u8]) -> Result<Self, CodecError> {
        Ok(f64::from_bits(read_u64(input)?))
    }
}

impl<T: CanonicalEncode> CanonicalEncode for Vec<T> {
    fn encode(&self, out: &mut Vec<u8>) {
        write_u64(out, self.len() as u64);
        for item in self {
            item.encode(out);
        }
    }
}

impl<T: CanonicalDecode> CanonicalDecode for Vec<T> {
    fn decode(input: &mut &[u8]) -> Result<Self, CodecError> {
        let len = read_len(input)?;
        let mut items = Vec::with_capacity(len);
        for _ in 0..len {
            items.push(T::decode(input)?);
        }
        Ok(items)
    }
}

impl CanonicalEncode for String {
    fn encode(&self, out: &mut Vec<u8>) {
        write_u64(out, self.len() as u64);
        out.extend_from_slice(self.as_bytes());
    }
}

impl CanonicalDecode for String {
    fn decode(input: &mut &[u8]) -> Result<Self, CodecError> {
        let bytes = Vec::<u8>::decode(input)?;
        String::from_utf8(bytes).map_err(|_| CodecError::InvalidString)
    }
}

impl CanonicalEncode for Hash32 {
    fn encode(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.0);
    }
}

impl CanonicalDecode for Hash32 {
    fn decode(input: &mut &[u8]) -> Result<Self, CodecError> {
        Ok(Hash32(read_exact::<32>(input)?))
    }
}

/// Appends the SHA-256 of `body` to it.
pub fn seal(mut body: Vec<u8>) -> Vec<u8> {
    let checksum = Hash32::of(&body);
    checksum.encode(&mut body);
    body
}

/// Verifies and strips the trailing checksum written by [`seal`].
pub fn unseal(bytes: &[u8]) -> Result<&[u8], CodecError> {
    if bytes.len() < 32 {
        return Err(CodecError::Eof);
    }
    let (body, mut tail) = bytes.split_at(bytes.len() - 32);
    let checksum = Hash32::decode(&mut tail)?;
    if Hash32::of(body) != checksum {
        return Err(CodecError::ChecksumMismatch);
    }
    Ok(body)
}
