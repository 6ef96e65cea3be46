//! Self-delimiting type-length-value primitives used by [`crate::codec`].
//!
//! This is this implementation's own concrete realization of the wire
//! protocol contract the specification leaves external (§6): a forwarder
//! speaking a different byte layout can be supported by swapping the
//! `Encode`/`Decode` impls in `codec.rs` without touching the Face engine.

use std::num::NonZeroU32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarintDecodingError {
    BufferTooShort,
    NonMinimalIntegerEncoding,
    InvalidValue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodingError {
    CannotDecodeType { err: VarintDecodingError },
    CannotDecodeLength { typ: NonZeroU32, err: VarintDecodingError },
    CannotDecodeValue { typ: NonZeroU32, len: usize },
}

pub trait Encode {
    fn encoded_length(&self) -> usize;
    fn encode(&self, out: &mut Vec<u8>);
}

#[derive(Debug, Clone, Copy)]
pub struct TLV<'a> {
    pub typ: NonZeroU32,
    pub val: &'a [u8],
}

impl<'a> TLV<'a> {
    pub fn val_as_u64(&self) -> Option<u64> {
        match self.val.len() {
            1 => Some(self.val[0] as u64),
            2 => Some(u16::from_be_bytes(self.val.try_into().ok()?) as u64),
            4 => Some(u32::from_be_bytes(self.val.try_into().ok()?) as u64),
            8 => Some(u64::from_be_bytes(self.val.try_into().ok()?)),
            _ => None,
        }
    }

    pub fn try_decode(bytes: &'a [u8]) -> Result<(TLV<'a>, usize), DecodingError> {
        let mut cursor = 0;
        let typ: u32 = parse_varint(bytes, &mut cursor)
            .map_err(|err| DecodingError::CannotDecodeType { err })?
            .try_into()
            .map_err(|_| DecodingError::CannotDecodeType { err: VarintDecodingError::InvalidValue })?;
        let typ = NonZeroU32::new(typ)
            .ok_or(DecodingError::CannotDecodeType { err: VarintDecodingError::InvalidValue })?;

        let len: usize = parse_varint(bytes, &mut cursor)
            .map_err(|err| DecodingError::CannotDecodeLength { typ, err })?
            .try_into()
            .map_err(|_| DecodingError::CannotDecodeLength { typ, err: VarintDecodingError::InvalidValue })?;

        if cursor + len > bytes.len() {
            return Err(DecodingError::CannotDecodeValue { typ, len });
        }

        let val = &bytes[cursor..(cursor + len)];
        Ok((TLV { typ, val }, cursor + len))
    }
}

fn parse_varint(bytes: &[u8], cursor: &mut usize) -> Result<u64, VarintDecodingError> {
    let first = *bytes.get(*cursor).ok_or(VarintDecodingError::BufferTooShort)?;
    *cursor += 1;
    match first {
        0..=252 => Ok(first as u64),
        253 => {
            let next = bytes
                .get(*cursor..*cursor + 2)
                .ok_or(VarintDecodingError::BufferTooShort)?;
            *cursor += 2;
            let val = u16::from_be_bytes(next.try_into().unwrap());
            if val > 252 {
                Ok(val as u64)
            } else {
                Err(VarintDecodingError::NonMinimalIntegerEncoding)
            }
        }
        254 => {
            let next = bytes
                .get(*cursor..*cursor + 4)
                .ok_or(VarintDecodingError::BufferTooShort)?;
            *cursor += 4;
            let val = u32::from_be_bytes(next.try_into().unwrap());
            if val > u16::MAX as u32 {
                Ok(val as u64)
            } else {
                Err(VarintDecodingError::NonMinimalIntegerEncoding)
            }
        }
        255 => {
            let next = bytes
                .get(*cursor..*cursor + 8)
                .ok_or(VarintDecodingError::BufferTooShort)?;
            *cursor += 8;
            let val = u64::from_be_bytes(next.try_into().unwrap());
            if val > u32::MAX as u64 {
                Ok(val)
            } else {
                Err(VarintDecodingError::NonMinimalIntegerEncoding)
            }
        }
    }
}

impl Encode for u64 {
    fn encoded_length(&self) -> usize {
        if *self <= 252 {
            1
        } else if *self <= u16::MAX as u64 {
            3
        } else if *self <= u32::MAX as u64 {
            5
        } else {
            9
        }
    }

    fn encode(&self, out: &mut Vec<u8>) {
        if *self <= 252 {
            out.push(*self as u8);
        } else if *self <= u16::MAX as u64 {
            out.push(253);
            out.extend_from_slice(&(*self as u16).to_be_bytes());
        } else if *self <= u32::MAX as u64 {
            out.push(254);
            out.extend_from_slice(&(*self as u32).to_be_bytes());
        } else {
            out.push(255);
            out.extend_from_slice(&self.to_be_bytes());
        }
    }
}

impl<'a> Encode for TLV<'a> {
    fn encoded_length(&self) -> usize {
        let l = self.val.len();
        (self.typ.get() as u64).encoded_length() + (l as u64).encoded_length() + l
    }

    fn encode(&self, out: &mut Vec<u8>) {
        (self.typ.get() as u64).encode(out);
        (self.val.len() as u64).encode(out);
        out.extend_from_slice(self.val);
    }
}

/// Writes a single TLV header + value built from `val` into `out`.
pub fn write_tlv(typ: u32, val: &[u8], out: &mut Vec<u8>) {
    let typ = NonZeroU32::new(typ).expect("TLV type must be non-zero");
    TLV { typ, val }.encode(out);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsigned_length() {
        for v in 0u64..252 {
            assert_eq!(v.encoded_length(), 1);
        }
        assert_eq!(253u64.encoded_length(), 3);
        assert_eq!(256u64.encoded_length(), 3);
        assert_eq!(65535u64.encoded_length(), 3);
        assert_eq!(65536u64.encoded_length(), 5);
        assert_eq!(4294967295u64.encoded_length(), 5);
        assert_eq!(4294967296u64.encoded_length(), 9);
    }

    #[test]
    fn test_round_trip_varint() {
        for v in [0u64, 1, 252, 253, 65535, 65536, 4294967295, 4294967296, u64::MAX] {
            let mut buf = Vec::new();
            v.encode(&mut buf);
            assert_eq!(buf.len(), v.encoded_length());
        }
    }

    #[test]
    fn test_tlv_round_trip() {
        let mut buf = Vec::new();
        write_tlv(7, b"hello", &mut buf);
        let (tlv, consumed) = TLV::try_decode(&buf).unwrap();
        assert_eq!(consumed, buf.len());
        assert_eq!(tlv.typ.get(), 7);
        assert_eq!(tlv.val, b"hello");
    }

    #[test]
    fn test_tlv_truncated_is_buffer_too_short() {
        let mut buf = Vec::new();
        write_tlv(7, b"hello", &mut buf);
        buf.truncate(buf.len() - 1);
        let err = TLV::try_decode(&buf).unwrap_err();
        assert!(matches!(err, DecodingError::CannotDecodeValue { .. }));
    }
}
