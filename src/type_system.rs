//! The basic-type table and the D-Bus signature grammar (`spec.md` §4.2).
//!
//! Signature-grammar helpers are treated as black-box predicates by the rest
//! of the codec (`spec.md` §1), but something has to implement them for the
//! crate to run, so this module owns that implementation in one place: a
//! small recursive-descent validator over the type-code alphabet, plus a
//! `lazy_static` alignment/size table for the fixed-width basic types,
//! grounded in the teacher's `type_system.rs` (which built an analogous, if
//! higher-level, type-code table for its own `ToTypeCode` trait).

use crate::error::{Error, Result};
use lazy_static::lazy_static;
use std::collections::HashMap;
use std::convert::TryFrom;

/// A single D-Bus type, basic or container.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Type {
    Byte,
    Boolean,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    Double,
    String,
    ObjectPath,
    Signature,
    UnixFd,
    Array,
    Variant,
    Struct,
    DictEntry,
}

impl Type {
    #[inline]
    pub fn code(self) -> u8 {
        match self {
            Type::Byte => b'y',
            Type::Boolean => b'b',
            Type::Int16 => b'n',
            Type::UInt16 => b'q',
            Type::Int32 => b'i',
            Type::UInt32 => b'u',
            Type::Int64 => b'x',
            Type::UInt64 => b't',
            Type::Double => b'd',
            Type::String => b's',
            Type::ObjectPath => b'o',
            Type::Signature => b'g',
            Type::UnixFd => b'h',
            Type::Array => b'a',
            Type::Variant => b'v',
            Type::Struct => b'(',
            Type::DictEntry => b'{',
        }
    }

    pub fn is_basic(self) -> bool {
        !matches!(
            self,
            Type::Array | Type::Variant | Type::Struct | Type::DictEntry
        )
    }

    pub fn is_container(self) -> bool {
        !self.is_basic()
    }

    /// Wire alignment of a value of this type. Containers use the alignment
    /// of their on-wire length prefix or contents, per `spec.md` §4.2/§4.3.
    /// Fixed-width basic types look their alignment up in [`TYPE_TABLE`];
    /// the remaining (variable-width and container) types have no table
    /// entry and fall back to a plain match.
    pub fn alignment(self) -> usize {
        if let Some(info) = TYPE_TABLE.get(&self.code()) {
            return info.alignment as usize;
        }
        match self {
            Type::Signature | Type::Variant => 1,
            Type::String | Type::ObjectPath | Type::Array => 4,
            Type::Struct | Type::DictEntry => 8,
            _ => unreachable!("fixed-width types are all present in TYPE_TABLE"),
        }
    }

    /// Fixed wire size for basic fixed-width types; `None` for string-like
    /// and container types whose size depends on their contents. Every
    /// fixed-width type is a [`TYPE_TABLE`] entry, so absence from the
    /// table doubles as the "variable size" answer.
    pub fn fixed_size(self) -> Option<usize> {
        TYPE_TABLE.get(&self.code()).map(|info| info.fixed_size as usize)
    }
}

impl TryFrom<u8> for Type {
    type Error = Error;

    fn try_from(code: u8) -> Result<Type> {
        Ok(match code {
            b'y' => Type::Byte,
            b'b' => Type::Boolean,
            b'n' => Type::Int16,
            b'q' => Type::UInt16,
            b'i' => Type::Int32,
            b'u' => Type::UInt32,
            b'x' => Type::Int64,
            b't' => Type::UInt64,
            b'd' => Type::Double,
            b's' => Type::String,
            b'o' => Type::ObjectPath,
            b'g' => Type::Signature,
            b'h' => Type::UnixFd,
            b'a' => Type::Array,
            b'v' => Type::Variant,
            b'(' => Type::Struct,
            b'{' => Type::DictEntry,
            other => {
                return Err(Error::invalid_argument(format!(
                    "unknown type code `{}`",
                    other as char
                )))
            }
        })
    }
}

#[derive(Copy, Clone, Debug)]
pub(crate) struct TypeInfo {
    pub alignment: u8,
    pub fixed_size: u8,
}

lazy_static! {
    /// Alignment/size lookup for the fixed-width basic types (`spec.md` §4.2
    /// table). Variable-width types (`s`, `o`, `g`) and containers are
    /// handled by dedicated code paths, not this table.
    pub(crate) static ref TYPE_TABLE: HashMap<u8, TypeInfo> = {
        let mut m = HashMap::new();
        m.insert(b'y', TypeInfo { alignment: 1, fixed_size: 1 });
        m.insert(b'b', TypeInfo { alignment: 4, fixed_size: 4 });
        m.insert(b'n', TypeInfo { alignment: 2, fixed_size: 2 });
        m.insert(b'q', TypeInfo { alignment: 2, fixed_size: 2 });
        m.insert(b'i', TypeInfo { alignment: 4, fixed_size: 4 });
        m.insert(b'u', TypeInfo { alignment: 4, fixed_size: 4 });
        m.insert(b'x', TypeInfo { alignment: 8, fixed_size: 8 });
        m.insert(b't', TypeInfo { alignment: 8, fixed_size: 8 });
        m.insert(b'd', TypeInfo { alignment: 8, fixed_size: 8 });
        m.insert(b'h', TypeInfo { alignment: 4, fixed_size: 4 });
        m
    };
}

/// Length, in bytes, of the first complete type at the start of `sig`, or an
/// error if `sig` does not begin with a well-formed complete type.
pub fn signature_element_length(sig: &str) -> Result<usize> {
    element_length(sig.as_bytes(), false)
        .map(|(len, _)| len)
        .map_err(|_| Error::invalid_argument(format!("ill-formed signature `{}`", sig)))
}

/// Byte length of the complete type at the start of `sig` (crate-internal
/// alias of [`signature_element_length`] used by the container/signature
/// cursor, which needs this on every append/read rather than just at the
/// signature-grammar boundary).
pub(crate) fn leading_element_len(sig: &str) -> Result<usize> {
    signature_element_length(sig)
}

/// Wire alignment of the complete type at the start of `sig` (used to pad an
/// ARRAY's body to its element alignment, `spec.md` §4.3).
pub(crate) fn leading_element_alignment(sig: &str) -> Result<usize> {
    let bytes = sig.as_bytes();
    Ok(match bytes.first() {
        None => return Err(Error::invalid_argument("empty signature has no alignment")),
        Some(b'y') | Some(b'g') => 1,
        Some(b'n') | Some(b'q') => 2,
        Some(b'b') | Some(b'i') | Some(b'u') | Some(b'h') | Some(b's') | Some(b'o')
        | Some(b'a') => 4,
        Some(b'x') | Some(b't') | Some(b'd') | Some(b'(') | Some(b'{') => 8,
        Some(b'v') => 1,
        Some(other) => {
            return Err(Error::invalid_argument(format!(
                "unknown type code `{}`",
                *other as char
            )))
        }
    })
}

/// Whether `sig` is exactly one complete type (used for VARIANT contents
/// validation, `spec.md` §4.3). A freestanding DICT_ENTRY is not itself a
/// complete type — per `spec.md` §3 invariant 5 / §4.3, `{...}` is only
/// legal as an ARRAY's element; use [`is_valid_array_contents`] for that
/// position instead.
pub fn is_single_complete_type(sig: &str) -> bool {
    match element_length(sig.as_bytes(), false) {
        Ok((len, _)) => len == sig.len(),
        Err(_) => false,
    }
}

/// Whether `sig` is exactly one complete type, as it may appear as an
/// ARRAY's element signature — the one position where a bare DICT_ENTRY is
/// legal (`spec.md` §4.3 "Open ARRAY(contents)").
pub(crate) fn is_valid_array_contents(sig: &str) -> bool {
    match element_length(sig.as_bytes(), true) {
        Ok((len, _)) => len == sig.len(),
        Err(_) => false,
    }
}

/// Whether `sig` is a well-formed signature: zero or more complete types
/// back to back, with balanced container brackets and only known type codes.
pub fn signature_is_valid(sig: &str) -> bool {
    let bytes = sig.as_bytes();
    let mut rest = bytes;
    while !rest.is_empty() {
        match element_length(rest, false) {
            Ok((len, _)) => rest = &rest[len..],
            Err(_) => return false,
        }
    }
    true
}

/// Whether `sig` is a valid DICT_ENTRY signature: exactly two complete
/// types, the first a basic type (`spec.md` §3 invariant 5).
pub fn is_valid_dict_entry_signature(sig: &str) -> Result<()> {
    let bytes = sig.as_bytes();
    let (first_len, _) = element_length(bytes, false).map_err(|_| {
        Error::invalid_argument("dict entry signature must begin with a complete type")
    })?;
    let key_code = bytes[0];
    if key_code == b'a' || key_code == b'(' || key_code == b'v' || key_code == b'{' {
        return Err(Error::invalid_argument(
            "dict entry key must be a basic type",
        ));
    }
    let rest = &bytes[first_len..];
    let (second_len, _) = element_length(rest, false)
        .map_err(|_| Error::invalid_argument("dict entry must have exactly two complete types"))?;
    if second_len != rest.len() {
        return Err(Error::invalid_argument(
            "dict entry must have exactly two complete types",
        ));
    }
    Ok(())
}

/// Returns the byte length of the complete type starting at `bytes[0]`, and
/// the maximum container nesting depth encountered while parsing it.
///
/// `allow_dict_entry` is true only when parsing the element directly after
/// an `a` (an ARRAY's own element type) — the one grammar position where a
/// bare `{...}` is a legal complete type (`spec.md` §3 invariant 5: "DICT_ENTRY
/// contents are a *pair*"; DICT_ENTRY itself is only ever an ARRAY element,
/// never a struct member or a freestanding signature element). The flag
/// propagates through nested ARRAYs (`aa{sv}` is array-of-array-of-dict-entry)
/// but not into STRUCT members or a DICT_ENTRY's own key/value, which always
/// parse with it false.
fn element_length(bytes: &[u8], allow_dict_entry: bool) -> std::result::Result<(usize, usize), ()> {
    if bytes.is_empty() {
        return Err(());
    }
    match bytes[0] {
        b'y' | b'b' | b'n' | b'q' | b'i' | b'u' | b'x' | b't' | b'd' | b's' | b'o' | b'g'
        | b'h' | b'v' => Ok((1, 0)),
        b'a' => {
            let (inner_len, inner_depth) = element_length(&bytes[1..], true)?;
            Ok((1 + inner_len, inner_depth + 1))
        }
        b'(' => {
            let mut i = 1;
            let mut max_depth = 0;
            if bytes.len() < 2 || bytes[1] == b')' {
                return Err(());
            }
            while i < bytes.len() && bytes[i] != b')' {
                let (len, depth) = element_length(&bytes[i..], false)?;
                max_depth = max_depth.max(depth);
                i += len;
            }
            if i >= bytes.len() || bytes[i] != b')' {
                return Err(());
            }
            Ok((i + 1, max_depth + 1))
        }
        b'{' => {
            if !allow_dict_entry {
                return Err(());
            }
            let mut i = 1;
            let mut max_depth = 0;
            let mut elements = 0;
            if bytes.len() < 2 || bytes[1] == b'}' {
                return Err(());
            }
            while i < bytes.len() && bytes[i] != b'}' {
                let (len, depth) = element_length(&bytes[i..], false)?;
                max_depth = max_depth.max(depth);
                i += len;
                elements += 1;
            }
            if i >= bytes.len() || bytes[i] != b'}' || elements != 2 {
                return Err(());
            }
            // first element (the key) must be a basic type.
            if matches!(bytes[1], b'a' | b'(' | b'{' | b'v') {
                return Err(());
            }
            Ok((i + 1, max_depth + 1))
        }
        _ => Err(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_type_codes() {
        assert_eq!(Type::Byte.code(), b'y');
        assert_eq!(Type::try_from(b'u').unwrap(), Type::UInt32);
        assert!(Type::try_from(b'?').is_err());
    }

    #[test]
    fn single_complete_types() {
        assert!(is_single_complete_type("s"));
        assert!(is_single_complete_type("a{sv}"));
        assert!(is_single_complete_type("(ii)"));
        assert!(!is_single_complete_type("ii"));
        assert!(!is_single_complete_type(""));
    }

    #[test]
    fn whole_signature_validity() {
        assert!(signature_is_valid(""));
        assert!(signature_is_valid("su"));
        assert!(signature_is_valid("a{sv}as(iu)"));
        assert!(!signature_is_valid("a"));
        assert!(!signature_is_valid("(ii"));
        assert!(!signature_is_valid("{sv}"));
    }

    #[test]
    fn dict_entry_requires_basic_key() {
        assert!(is_valid_dict_entry_signature("sv").is_ok());
        assert!(is_valid_dict_entry_signature("(i)v").is_err());
        assert!(is_valid_dict_entry_signature("s").is_err());
        assert!(is_valid_dict_entry_signature("sss").is_err());
    }

    #[test]
    fn element_length_reports_first_type_only() {
        assert_eq!(signature_element_length("sv").unwrap(), 1);
        assert_eq!(signature_element_length("a{sv}x").unwrap(), 5);
    }
}
