//! Basic-type wire encoding (`spec.md` §4.2, §6 "Basic encodings").
//!
//! These are pure functions over a byte region (either the growing `body`/
//! `fields` `Vec<u8>` on write, or a received buffer slice on read) rather
//! than methods on `Message`, so the same code serves the body writer, the
//! header-fields writer, the body reader and the header-fields parser. Every
//! read validates that the alignment padding it skipped over is all-zero
//! (`spec.md` §3 invariant 1) and that the requested range lies within the
//! region, failing with `malformed-message` otherwise.

use crate::buffer;
use crate::error::{Error, Result};
use byteorder::{BigEndian, ByteOrder, LittleEndian};
use std::convert::TryFrom;

/// Byte order marker carried in header byte 0 and shared by every multi-byte
/// integer in a message (`spec.md` §3 invariant 2).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Endian {
    Little,
    Big,
}

impl Endian {
    pub(crate) fn marker(self) -> u8 {
        match self {
            Endian::Little => b'l',
            Endian::Big => b'B',
        }
    }

    pub(crate) fn from_marker(b: u8) -> Result<Endian> {
        match b {
            b'l' => Ok(Endian::Little),
            b'B' => Ok(Endian::Big),
            other => Err(Error::malformed(format!(
                "unknown endian marker `{}`",
                other as char
            ))),
        }
    }

    #[cfg(target_endian = "little")]
    pub(crate) fn native() -> Endian {
        Endian::Little
    }

    #[cfg(target_endian = "big")]
    pub(crate) fn native() -> Endian {
        Endian::Big
    }

    pub(crate) fn write_u16(self, dst: &mut [u8], v: u16) {
        match self {
            Endian::Little => LittleEndian::write_u16(dst, v),
            Endian::Big => BigEndian::write_u16(dst, v),
        }
    }
    pub(crate) fn write_i16(self, dst: &mut [u8], v: i16) {
        match self {
            Endian::Little => LittleEndian::write_i16(dst, v),
            Endian::Big => BigEndian::write_i16(dst, v),
        }
    }
    pub(crate) fn write_u32(self, dst: &mut [u8], v: u32) {
        match self {
            Endian::Little => LittleEndian::write_u32(dst, v),
            Endian::Big => BigEndian::write_u32(dst, v),
        }
    }
    pub(crate) fn write_i32(self, dst: &mut [u8], v: i32) {
        match self {
            Endian::Little => LittleEndian::write_i32(dst, v),
            Endian::Big => BigEndian::write_i32(dst, v),
        }
    }
    pub(crate) fn write_u64(self, dst: &mut [u8], v: u64) {
        match self {
            Endian::Little => LittleEndian::write_u64(dst, v),
            Endian::Big => BigEndian::write_u64(dst, v),
        }
    }
    pub(crate) fn write_i64(self, dst: &mut [u8], v: i64) {
        match self {
            Endian::Little => LittleEndian::write_i64(dst, v),
            Endian::Big => BigEndian::write_i64(dst, v),
        }
    }
    pub(crate) fn write_f64(self, dst: &mut [u8], v: f64) {
        match self {
            Endian::Little => LittleEndian::write_f64(dst, v),
            Endian::Big => BigEndian::write_f64(dst, v),
        }
    }

    pub(crate) fn read_u16(self, src: &[u8]) -> u16 {
        match self {
            Endian::Little => LittleEndian::read_u16(src),
            Endian::Big => BigEndian::read_u16(src),
        }
    }
    pub(crate) fn read_i16(self, src: &[u8]) -> i16 {
        match self {
            Endian::Little => LittleEndian::read_i16(src),
            Endian::Big => BigEndian::read_i16(src),
        }
    }
    pub(crate) fn read_u32(self, src: &[u8]) -> u32 {
        match self {
            Endian::Little => LittleEndian::read_u32(src),
            Endian::Big => BigEndian::read_u32(src),
        }
    }
    pub(crate) fn read_i32(self, src: &[u8]) -> i32 {
        match self {
            Endian::Little => LittleEndian::read_i32(src),
            Endian::Big => BigEndian::read_i32(src),
        }
    }
    pub(crate) fn read_u64(self, src: &[u8]) -> u64 {
        match self {
            Endian::Little => LittleEndian::read_u64(src),
            Endian::Big => BigEndian::read_u64(src),
        }
    }
    pub(crate) fn read_i64(self, src: &[u8]) -> i64 {
        match self {
            Endian::Little => LittleEndian::read_i64(src),
            Endian::Big => BigEndian::read_i64(src),
        }
    }
    pub(crate) fn read_f64(self, src: &[u8]) -> f64 {
        match self {
            Endian::Little => LittleEndian::read_f64(src),
            Endian::Big => BigEndian::read_f64(src),
        }
    }
}

// --- write side: append into a growing region ---------------------------

pub(crate) fn write_u8(region: &mut Vec<u8>, v: u8) -> Result<usize> {
    let off = buffer::extend(region, 1, 1)?;
    region[off] = v;
    Ok(off)
}

pub(crate) fn write_bool(region: &mut Vec<u8>, endian: Endian, v: bool) -> Result<usize> {
    let off = buffer::extend(region, 4, 4)?;
    endian.write_u32(&mut region[off..off + 4], if v { 1 } else { 0 });
    Ok(off)
}

macro_rules! write_fixed {
    ($name:ident, $ty:ty, $align:expr, $write:ident) => {
        pub(crate) fn $name(region: &mut Vec<u8>, endian: Endian, v: $ty) -> Result<usize> {
            let off = buffer::extend(region, $align, $align)?;
            endian.$write(&mut region[off..off + $align], v);
            Ok(off)
        }
    };
}

write_fixed!(write_i16, i16, 2, write_i16);
write_fixed!(write_u16, u16, 2, write_u16);
write_fixed!(write_i32, i32, 4, write_i32);
write_fixed!(write_u32, u32, 4, write_u32);
write_fixed!(write_i64, i64, 8, write_i64);
write_fixed!(write_u64, u64, 8, write_u64);
write_fixed!(write_f64, f64, 8, write_f64);

/// STRING/OBJECT_PATH: u32 length prefix (4-byte aligned) + bytes + NUL.
/// Validates UTF-8-compatible input has no embedded NUL and fits in a u32;
/// grammar validation (is this actually a path?) is the caller's concern.
pub(crate) fn write_string(region: &mut Vec<u8>, endian: Endian, s: &str) -> Result<usize> {
    if s.as_bytes().contains(&0) {
        return Err(Error::invalid_argument("string must not contain NUL bytes"));
    }
    let len = u32::try_from(s.len())
        .map_err(|_| Error::invalid_argument("string exceeds u32 length prefix"))?;
    let off = write_u32(region, endian, len)?;
    let body_off = buffer::extend(region, 1, s.len() + 1)?;
    region[body_off..body_off + s.len()].copy_from_slice(s.as_bytes());
    region[body_off + s.len()] = 0;
    Ok(off)
}

/// SIGNATURE: u8 length prefix + bytes + NUL (1-byte aligned throughout).
pub(crate) fn write_signature(region: &mut Vec<u8>, s: &str) -> Result<usize> {
    if s.as_bytes().contains(&0) {
        return Err(Error::invalid_argument(
            "signature must not contain NUL bytes",
        ));
    }
    if s.len() > 255 {
        return Err(Error::invalid_argument(
            "signature exceeds 255-byte u8 length prefix",
        ));
    }
    let off = write_u8(region, s.len() as u8)?;
    let body_off = buffer::extend(region, 1, s.len() + 1)?;
    region[body_off..body_off + s.len()].copy_from_slice(s.as_bytes());
    region[body_off + s.len()] = 0;
    Ok(off)
}

// --- read side: decode from a fixed region at an offset ------------------

fn aligned_range(region: &[u8], offset: usize, align: usize, size: usize) -> Result<(usize, usize)> {
    let start = buffer::align_up(offset, align);
    if start > region.len() {
        return Err(Error::malformed("value extends past end of region"));
    }
    if !buffer::padding_is_zero(region, offset, start) {
        return Err(Error::malformed("non-zero alignment padding"));
    }
    let end = start
        .checked_add(size)
        .ok_or_else(|| Error::malformed("range overflow"))?;
    if end > region.len() {
        return Err(Error::malformed("value extends past end of region"));
    }
    Ok((start, end))
}

pub(crate) fn read_u8(region: &[u8], offset: usize) -> Result<(u8, usize)> {
    let (start, end) = aligned_range(region, offset, 1, 1)?;
    Ok((region[start], end))
}

pub(crate) fn read_bool(region: &[u8], endian: Endian, offset: usize) -> Result<(bool, usize)> {
    let (start, end) = aligned_range(region, offset, 4, 4)?;
    match endian.read_u32(&region[start..end]) {
        0 => Ok((false, end)),
        1 => Ok((true, end)),
        other => Err(Error::malformed(format!("invalid boolean value {}", other))),
    }
}

macro_rules! read_fixed {
    ($name:ident, $ty:ty, $align:expr, $read:ident) => {
        pub(crate) fn $name(region: &[u8], endian: Endian, offset: usize) -> Result<($ty, usize)> {
            let (start, end) = aligned_range(region, offset, $align, $align)?;
            Ok((endian.$read(&region[start..end]), end))
        }
    };
}

read_fixed!(read_i16, i16, 2, read_i16);
read_fixed!(read_u16, u16, 2, read_u16);
read_fixed!(read_i32, i32, 4, read_i32);
read_fixed!(read_u32, u32, 4, read_u32);
read_fixed!(read_i64, i64, 8, read_i64);
read_fixed!(read_u64, u64, 8, read_u64);
read_fixed!(read_f64, f64, 8, read_f64);

/// Skips (aligns+bounds-checks without decoding) a fixed-width value; used by
/// the header-fields skipper for field codes it doesn't recognize.
pub(crate) fn skip_fixed(region: &[u8], offset: usize, align: usize, size: usize) -> Result<usize> {
    aligned_range(region, offset, align, size).map(|(_, end)| end)
}

pub(crate) fn read_string(region: &[u8], endian: Endian, offset: usize) -> Result<(String, usize)> {
    let (len, after_len) = read_u32(region, endian, offset)?;
    let str_start = after_len;
    let str_end = str_start
        .checked_add(len as usize)
        .ok_or_else(|| Error::malformed("string length overflow"))?;
    if str_end >= region.len() {
        return Err(Error::malformed("string extends past end of region"));
    }
    if region[str_end] != 0 {
        return Err(Error::malformed("string missing NUL terminator"));
    }
    let bytes = &region[str_start..str_end];
    if bytes.contains(&0) {
        return Err(Error::malformed("string contains an embedded NUL byte"));
    }
    let s = std::str::from_utf8(bytes)
        .map_err(|_| Error::malformed("string is not valid UTF-8"))?
        .to_string();
    Ok((s, str_end + 1))
}

pub(crate) fn read_signature(region: &[u8], offset: usize) -> Result<(String, usize)> {
    let (len, after_len) = read_u8(region, offset)?;
    let str_start = after_len;
    let str_end = str_start
        .checked_add(len as usize)
        .ok_or_else(|| Error::malformed("signature length overflow"))?;
    if str_end >= region.len() {
        return Err(Error::malformed("signature extends past end of region"));
    }
    if region[str_end] != 0 {
        return Err(Error::malformed("signature missing NUL terminator"));
    }
    let bytes = &region[str_start..str_end];
    let s = std::str::from_utf8(bytes)
        .map_err(|_| Error::malformed("signature is not valid UTF-8"))?
        .to_string();
    Ok((s, str_end + 1))
}

/// Walks past one complete type's bytes at `offset` without materializing a
/// value (`spec.md` §4.5 `skip`), used to skip header fields the parser does
/// not recognize.
pub(crate) fn skip_value(region: &[u8], endian: Endian, offset: usize, sig: &str) -> Result<usize> {
    let bytes = sig.as_bytes();
    let code = *bytes
        .first()
        .ok_or_else(|| Error::invalid_argument("empty signature has nothing to skip"))?;
    match code {
        b'y' => skip_fixed(region, offset, 1, 1),
        b'g' => read_signature(region, offset).map(|(_, o)| o),
        b'n' | b'q' => skip_fixed(region, offset, 2, 2),
        b'b' | b'i' | b'u' | b'h' => skip_fixed(region, offset, 4, 4),
        b'x' | b't' | b'd' => skip_fixed(region, offset, 8, 8),
        b's' | b'o' => read_string(region, endian, offset).map(|(_, o)| o),
        b'v' => {
            let (inner_sig, after) = read_signature(region, offset)?;
            skip_value(region, endian, after, &inner_sig)
        }
        b'a' => {
            let inner = &sig[1..];
            let elem_align = crate::type_system::leading_element_alignment(inner)?;
            let (len, after_len) = read_u32(region, endian, offset)?;
            let start = buffer::align_up(after_len, elem_align);
            if !buffer::padding_is_zero(region, after_len, start) {
                return Err(Error::malformed("non-zero array element padding"));
            }
            let end = start
                .checked_add(len as usize)
                .ok_or_else(|| Error::malformed("array length overflow"))?;
            if end > region.len() {
                return Err(Error::malformed("array extends past end of region"));
            }
            Ok(end)
        }
        b'(' => skip_compound(region, endian, offset, &sig[1..sig.len() - 1]),
        b'{' => skip_compound(region, endian, offset, &sig[1..sig.len() - 1]),
        other => Err(Error::invalid_argument(format!(
            "unknown type code `{}`",
            other as char
        ))),
    }
}

fn skip_compound(region: &[u8], endian: Endian, offset: usize, inner: &str) -> Result<usize> {
    let start = buffer::align_up(offset, 8);
    if !buffer::padding_is_zero(region, offset, start) {
        return Err(Error::malformed("non-zero struct alignment padding"));
    }
    let mut pos = start;
    let mut rest = inner;
    while !rest.is_empty() {
        let elem_len = crate::type_system::leading_element_len(rest)?;
        pos = skip_value(region, endian, pos, &rest[..elem_len])?;
        rest = &rest[elem_len..];
    }
    Ok(pos)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_string() {
        let mut region = Vec::new();
        write_u8(&mut region, 0xAB).unwrap();
        let off = write_string(&mut region, Endian::Little, "hi").unwrap();
        assert_eq!(off, 4); // padded up from offset 1 to 4
        let (s, next) = read_string(&region, Endian::Little, off).unwrap();
        assert_eq!(s, "hi");
        assert_eq!(next, region.len());
    }

    #[test]
    fn rejects_non_zero_padding() {
        let mut region = vec![0u8; 3];
        region[1] = 1; // corrupt a padding byte
        assert!(read_u32(&region, Endian::Little, 0).is_err());
    }

    #[test]
    fn rejects_embedded_nul() {
        let mut region = Vec::new();
        assert!(write_string(&mut region, Endian::Little, "a\0b").is_err());
    }

    #[test]
    fn signature_round_trip() {
        let mut region = Vec::new();
        let off = write_signature(&mut region, "a{sv}").unwrap();
        let (s, next) = read_signature(&region, off).unwrap();
        assert_eq!(s, "a{sv}");
        assert_eq!(next, region.len());
    }
}
