//! Header fields: the `ARRAY of STRUCT { BYTE code, VARIANT value }` that
//! carries the path/interface/member/etc. quick-access attributes
//! (`spec.md` §3, §4.5, §6 "Fields array").
//!
//! Each entry is written and read like any other STRUCT — 8-byte aligned,
//! `BYTE` code then `VARIANT` value — but there is no surrounding ARRAY
//! frame on the wire (`spec.md` §6's header just calls it "fields array"
//! without a length prefix of its own; the header's `fields_size` word
//! plays that role). So this module drives the loop directly over
//! `wire.rs`'s primitives rather than going through `container.rs`.

use crate::buffer;
use crate::error::{Error, Result};
use crate::names;
use crate::wire::{self, Endian};

pub(crate) const FIELD_PATH: u8 = 1;
pub(crate) const FIELD_INTERFACE: u8 = 2;
pub(crate) const FIELD_MEMBER: u8 = 3;
pub(crate) const FIELD_ERROR_NAME: u8 = 4;
pub(crate) const FIELD_REPLY_SERIAL: u8 = 5;
pub(crate) const FIELD_DESTINATION: u8 = 6;
pub(crate) const FIELD_SENDER: u8 = 7;
pub(crate) const FIELD_SIGNATURE: u8 = 8;
pub(crate) const FIELD_UNIX_FDS: u8 = 9;

/// Quick-access values recovered by [`parse`] from a received fields region.
#[derive(Default, Debug)]
pub(crate) struct ParsedFields {
    pub(crate) path: Option<String>,
    pub(crate) interface: Option<String>,
    pub(crate) member: Option<String>,
    pub(crate) error_name: Option<String>,
    pub(crate) reply_serial: Option<u32>,
    pub(crate) destination: Option<String>,
    pub(crate) sender: Option<String>,
    pub(crate) signature: Option<String>,
    pub(crate) unix_fds: Option<u32>,
}

fn begin_entry(fields: &mut Vec<u8>, code: u8, value_sig: &str) -> Result<()> {
    buffer::pad_to(fields, 8);
    wire::write_u8(fields, code)?;
    wire::write_signature(fields, value_sig)?;
    Ok(())
}

pub(crate) fn append_string(fields: &mut Vec<u8>, endian: Endian, code: u8, value_sig: &str, s: &str) -> Result<()> {
    begin_entry(fields, code, value_sig)?;
    wire::write_string(fields, endian, s)?;
    Ok(())
}

pub(crate) fn append_u32(fields: &mut Vec<u8>, endian: Endian, code: u8, v: u32) -> Result<()> {
    begin_entry(fields, code, "u")?;
    wire::write_u32(fields, endian, v)?;
    Ok(())
}

pub(crate) fn append_signature(fields: &mut Vec<u8>, code: u8, s: &str) -> Result<()> {
    begin_entry(fields, code, "g")?;
    wire::write_signature(fields, s)?;
    Ok(())
}

/// Enumerates every entry in a received fields region, populating the
/// quick-access attributes (`spec.md` §4.5 table). An unrecognized code is
/// skipped by its declared signature rather than rejected, matching the
/// table's "other -> skip value per its signature" row.
pub(crate) fn parse(fields: &[u8], endian: Endian) -> Result<ParsedFields> {
    let mut out = ParsedFields::default();
    let mut offset = 0usize;

    while offset < fields.len() {
        let start = buffer::align_up(offset, 8);
        if start >= fields.len() {
            if !buffer::padding_is_zero(fields, offset, fields.len()) {
                return Err(Error::malformed("non-zero trailing padding in fields array"));
            }
            break;
        }
        if !buffer::padding_is_zero(fields, offset, start) {
            return Err(Error::malformed("non-zero padding between header fields"));
        }

        let (code, after_code) = wire::read_u8(fields, start)?;
        let (sig, after_sig) = wire::read_signature(fields, after_code)?;

        offset = match code {
            FIELD_PATH => {
                expect_sig(code, &sig, "o")?;
                let (v, next) = wire::read_string(fields, endian, after_sig)?;
                if !names::is_valid_object_path(&v) {
                    return Err(Error::malformed("PATH field is not a valid object path"));
                }
                out.path = Some(v);
                next
            }
            FIELD_INTERFACE => {
                expect_sig(code, &sig, "s")?;
                let (v, next) = wire::read_string(fields, endian, after_sig)?;
                if !names::is_valid_interface_name(&v) {
                    return Err(Error::malformed("INTERFACE field is not a valid interface name"));
                }
                out.interface = Some(v);
                next
            }
            FIELD_MEMBER => {
                expect_sig(code, &sig, "s")?;
                let (v, next) = wire::read_string(fields, endian, after_sig)?;
                if !names::is_valid_member_name(&v) {
                    return Err(Error::malformed("MEMBER field is not a valid member name"));
                }
                out.member = Some(v);
                next
            }
            FIELD_ERROR_NAME => {
                expect_sig(code, &sig, "s")?;
                let (v, next) = wire::read_string(fields, endian, after_sig)?;
                if !names::is_valid_error_name(&v) {
                    return Err(Error::malformed("ERROR_NAME field is not a valid error name"));
                }
                out.error_name = Some(v);
                next
            }
            FIELD_REPLY_SERIAL => {
                expect_sig(code, &sig, "u")?;
                let (v, next) = wire::read_u32(fields, endian, after_sig)?;
                if v == 0 {
                    return Err(Error::malformed("REPLY_SERIAL field must be non-zero"));
                }
                out.reply_serial = Some(v);
                next
            }
            FIELD_DESTINATION => {
                expect_sig(code, &sig, "s")?;
                let (v, next) = wire::read_string(fields, endian, after_sig)?;
                if !names::is_valid_bus_name(&v) {
                    return Err(Error::malformed("DESTINATION field is not a valid bus name"));
                }
                out.destination = Some(v);
                next
            }
            FIELD_SENDER => {
                expect_sig(code, &sig, "s")?;
                let (v, next) = wire::read_string(fields, endian, after_sig)?;
                if !names::is_valid_bus_name(&v) {
                    return Err(Error::malformed("SENDER field is not a valid bus name"));
                }
                out.sender = Some(v);
                next
            }
            FIELD_SIGNATURE => {
                expect_sig(code, &sig, "g")?;
                let (v, next) = wire::read_signature(fields, after_sig)?;
                if !crate::type_system::signature_is_valid(&v) {
                    return Err(Error::malformed("SIGNATURE field is not a well-formed signature"));
                }
                out.signature = Some(v);
                next
            }
            FIELD_UNIX_FDS => {
                expect_sig(code, &sig, "u")?;
                let (v, next) = wire::read_u32(fields, endian, after_sig)?;
                out.unix_fds = Some(v);
                next
            }
            _ => wire::skip_value(fields, endian, after_sig, &sig)?,
        };
    }

    Ok(out)
}

fn expect_sig(code: u8, found: &str, expected: &str) -> Result<()> {
    if found != expected {
        return Err(Error::malformed(format!(
            "header field {} carries signature `{}`, expected `{}`",
            code, found, expected
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_path_and_member() {
        let mut fields = Vec::new();
        append_string(&mut fields, Endian::Little, FIELD_PATH, "o", "/foo").unwrap();
        append_string(&mut fields, Endian::Little, FIELD_MEMBER, "s", "Bar").unwrap();
        let parsed = parse(&fields, Endian::Little).unwrap();
        assert_eq!(parsed.path.as_deref(), Some("/foo"));
        assert_eq!(parsed.member.as_deref(), Some("Bar"));
    }

    #[test]
    fn rejects_signature_mismatch() {
        let mut fields = Vec::new();
        append_u32(&mut fields, Endian::Little, FIELD_PATH, 7).unwrap();
        assert!(parse(&fields, Endian::Little).is_err());
    }

    #[test]
    fn unix_fds_round_trips() {
        let mut fields = Vec::new();
        append_u32(&mut fields, Endian::Little, FIELD_UNIX_FDS, 3).unwrap();
        let parsed = parse(&fields, Endian::Little).unwrap();
        assert_eq!(parsed.unix_fds, Some(3));
    }
}
