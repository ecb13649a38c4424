//! The parse-side traversal cursor: peek, read, enter/exit container, skip,
//! rewind (`spec.md` §4.5 "Read cursor operations").
//!
//! `rindex` is the body-relative read cursor; the container stack's
//! per-frame signature cursor tracks position the same way it does on the
//! write side, so `enter_container`/`exit_container` reuse `container.rs`'s
//! frame bookkeeping almost unchanged from `writer.rs`'s open/close.

use crate::container::{self, ContainerFrame, ContainerKind};
use crate::error::{Error, Result};
use crate::limits::BUS_ARRAY_MAX_SIZE;
use crate::message::Message;
use crate::names;
use crate::type_system::{self, Type};
use crate::value::Value;
use crate::wire;
use std::convert::TryFrom;

/// What [`Message::peek_type`] finds at the read cursor. Container variants
/// carry no data of their own — call [`Message::peeked_contents`] for the
/// borrowed contents signature, per the cached-peek contract (`spec.md` §9).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PeekedType {
    Basic(Type),
    Array,
    Variant,
    Struct,
    DictEntry,
    /// No more values in the current container; carries which kind of
    /// container is ending, so the caller knows what to `exit_container`.
    EndOfContainer(ContainerKind),
}

impl Message {
    fn check_readable(&self) -> Result<()> {
        if !self.sealed {
            return Err(Error::invalid_state("message must be sealed (or received) before it can be read"));
        }
        Ok(())
    }

    fn current_frame_done(&self) -> Result<bool> {
        let frame = self.containers.last().ok_or_else(|| Error::invalid_state("no open container"))?;
        Ok(match frame.kind {
            ContainerKind::Array => self.rindex - frame.begin >= frame.array_len.unwrap_or(0) as usize,
            _ => frame.index >= frame.signature.len(),
        })
    }

    /// Inspects the current signature slot without advancing the cursor
    /// (`spec.md` §4.5 `peek_type`).
    pub fn peek_type(&mut self) -> Result<PeekedType> {
        self.check_readable()?;
        if self.current_frame_done()? {
            let kind = self.containers.last().expect("checked above").kind;
            return Ok(PeekedType::EndOfContainer(kind));
        }

        let marker = {
            let frame = self.containers.last().expect("checked above");
            match frame.kind {
                ContainerKind::Array => frame.signature.clone(),
                _ => {
                    let slot = &frame.signature[frame.index..];
                    let len = type_system::leading_element_len(slot)?;
                    slot[..len].to_string()
                }
            }
        };

        let code = *marker
            .as_bytes()
            .first()
            .ok_or_else(|| Error::invalid_state("empty signature slot"))?;
        match code {
            b'a' => {
                self.peeked_signature = marker[1..].to_string();
                Ok(PeekedType::Array)
            }
            b'(' => {
                self.peeked_signature = marker[1..marker.len() - 1].to_string();
                Ok(PeekedType::Struct)
            }
            b'{' => {
                self.peeked_signature = marker[1..marker.len() - 1].to_string();
                Ok(PeekedType::DictEntry)
            }
            b'v' => {
                let (inner_sig, _next) = wire::read_signature(&self.body, self.rindex)?;
                self.peeked_signature = inner_sig;
                Ok(PeekedType::Variant)
            }
            other => Ok(PeekedType::Basic(Type::try_from(other)?)),
        }
    }

    /// The contents signature captured by the most recent [`Message::peek_type`]
    /// call (valid for container peek results; overwritten on the next peek).
    pub fn peeked_contents(&self) -> &str {
        &self.peeked_signature
    }

    /// Reads the basic value at the cursor, which must match `expected`
    /// (`spec.md` §4.5 `read_basic`).
    pub fn read_basic(&mut self, expected: Type) -> Result<Value> {
        self.check_readable()?;
        if !expected.is_basic() {
            return Err(Error::invalid_argument("read_basic requires a basic type"));
        }
        let marker = (expected.code() as char).to_string();
        self.validate_read_marker(&marker)?;

        let (value, next) = self.read_basic_bytes(expected)?;
        self.rindex = next;
        self.commit_read_marker(&marker);
        Ok(value)
    }

    fn validate_read_marker(&self, marker: &str) -> Result<()> {
        let frame = self.containers.last().ok_or_else(|| Error::invalid_state("no open container"))?;
        match frame.kind {
            ContainerKind::Array => {
                if frame.signature != marker {
                    Err(Error::type_mismatch(frame.signature.clone(), marker.to_string()))
                } else {
                    Ok(())
                }
            }
            ContainerKind::Root | ContainerKind::Variant | ContainerKind::Struct | ContainerKind::DictEntry => {
                match frame.peek() {
                    None => Err(Error::invalid_state("no more values in this container")),
                    Some(found) if found != marker => {
                        Err(Error::type_mismatch(found.to_string(), marker.to_string()))
                    }
                    Some(_) => Ok(()),
                }
            }
        }
    }

    fn commit_read_marker(&mut self, marker: &str) {
        if let Some(frame) = self.containers.last_mut() {
            match frame.kind {
                ContainerKind::Array => {}
                _ => frame.index += marker.len(),
            }
        }
    }

    fn read_basic_bytes(&self, t: Type) -> Result<(Value, usize)> {
        let endian = self.endian;
        Ok(match t {
            Type::Byte => {
                let (v, n) = wire::read_u8(&self.body, self.rindex)?;
                (Value::Byte(v), n)
            }
            Type::Boolean => {
                let (v, n) = wire::read_bool(&self.body, endian, self.rindex)?;
                (Value::Boolean(v), n)
            }
            Type::Int16 => {
                let (v, n) = wire::read_i16(&self.body, endian, self.rindex)?;
                (Value::Int16(v), n)
            }
            Type::UInt16 => {
                let (v, n) = wire::read_u16(&self.body, endian, self.rindex)?;
                (Value::UInt16(v), n)
            }
            Type::Int32 => {
                let (v, n) = wire::read_i32(&self.body, endian, self.rindex)?;
                (Value::Int32(v), n)
            }
            Type::UInt32 => {
                let (v, n) = wire::read_u32(&self.body, endian, self.rindex)?;
                (Value::UInt32(v), n)
            }
            Type::Int64 => {
                let (v, n) = wire::read_i64(&self.body, endian, self.rindex)?;
                (Value::Int64(v), n)
            }
            Type::UInt64 => {
                let (v, n) = wire::read_u64(&self.body, endian, self.rindex)?;
                (Value::UInt64(v), n)
            }
            Type::Double => {
                let (v, n) = wire::read_f64(&self.body, endian, self.rindex)?;
                (Value::Double(v), n)
            }
            Type::String => {
                let (v, n) = wire::read_string(&self.body, endian, self.rindex)?;
                (Value::String(v), n)
            }
            Type::ObjectPath => {
                let (v, n) = wire::read_string(&self.body, endian, self.rindex)?;
                if !names::is_valid_object_path(&v) {
                    return Err(Error::malformed("object path value failed grammar validation"));
                }
                (Value::ObjectPath(v), n)
            }
            Type::Signature => {
                let (v, n) = wire::read_signature(&self.body, self.rindex)?;
                if !type_system::signature_is_valid(&v) {
                    return Err(Error::malformed("signature value is not well-formed"));
                }
                (Value::Signature(v), n)
            }
            Type::UnixFd => {
                let (index, n) = wire::read_u32(&self.body, endian, self.rindex)?;
                if index as usize >= self.fds.len() {
                    return Err(Error::malformed("UNIX_FD index is out of range"));
                }
                (Value::UnixFd(index), n)
            }
            Type::Array | Type::Variant | Type::Struct | Type::DictEntry => {
                return Err(Error::invalid_argument("read_basic requires a basic type"))
            }
        })
    }

    /// Matches `contents` against the cursor and pushes a new frame
    /// (`spec.md` §4.5 `enter_container`).
    pub fn enter_container(&mut self, kind: ContainerKind, contents: &str) -> Result<()> {
        self.check_readable()?;
        container::check_depth_parse(self.containers.len())?;

        let marker = container::container_marker(kind, contents);
        self.validate_read_marker(&marker)?;

        let frame = match kind {
            ContainerKind::Array => {
                if !type_system::is_valid_array_contents(contents) {
                    return Err(Error::malformed("ARRAY contents must be a single complete type"));
                }
                let (len, after_len) = wire::read_u32(&self.body, self.endian, self.rindex)?;
                if len > BUS_ARRAY_MAX_SIZE {
                    return Err(Error::malformed(format!(
                        "array length {} exceeds the {}-byte cap",
                        len, BUS_ARRAY_MAX_SIZE
                    )));
                }
                let elem_align = type_system::leading_element_alignment(contents)?;
                let begin = crate::buffer::align_up(after_len, elem_align);
                if !crate::buffer::padding_is_zero(&self.body, after_len, begin) {
                    return Err(Error::malformed("non-zero array element padding"));
                }
                if begin + len as usize > self.body.len() {
                    return Err(Error::malformed("array extends past end of body"));
                }
                self.rindex = begin;
                ContainerFrame {
                    kind,
                    signature: contents.to_string(),
                    index: 0,
                    array_size_offset: None,
                    array_len: Some(len),
                    begin,
                }
            }
            ContainerKind::Variant => {
                let (inner_sig, next) = wire::read_signature(&self.body, self.rindex)?;
                if inner_sig != contents {
                    return Err(Error::type_mismatch(inner_sig, contents.to_string()));
                }
                self.rindex = next;
                ContainerFrame {
                    kind,
                    signature: contents.to_string(),
                    index: 0,
                    array_size_offset: None,
                    array_len: None,
                    begin: next,
                }
            }
            ContainerKind::Struct | ContainerKind::DictEntry => {
                if kind == ContainerKind::DictEntry
                    && self.containers.last().map(|f| f.kind) != Some(ContainerKind::Array)
                {
                    return Err(Error::invalid_argument("DICT_ENTRY may only be entered inside an ARRAY"));
                }
                let begin = crate::buffer::align_up(self.rindex, 8);
                if !crate::buffer::padding_is_zero(&self.body, self.rindex, begin) {
                    return Err(Error::malformed("non-zero struct alignment padding"));
                }
                if begin > self.body.len() {
                    return Err(Error::malformed("struct extends past end of body"));
                }
                self.rindex = begin;
                ContainerFrame {
                    kind,
                    signature: contents.to_string(),
                    index: 0,
                    array_size_offset: None,
                    array_len: None,
                    begin,
                }
            }
            ContainerKind::Root => return Err(Error::invalid_argument("root is not an enterable container")),
        };

        self.commit_read_marker(&marker);
        log::trace!("entered {:?} container, contents {:?}, depth now {}", kind, contents, self.containers.len() + 1);
        self.containers.push(frame);
        Ok(())
    }

    /// Pops the current frame, verifying an ARRAY's declared length matched
    /// what was actually consumed (`spec.md` §4.5 `exit_container`).
    pub fn exit_container(&mut self) -> Result<()> {
        self.check_readable()?;
        let frame = self
            .containers
            .last()
            .ok_or_else(|| Error::invalid_state("no open container to exit"))?;
        if frame.kind == ContainerKind::Root {
            return Err(Error::invalid_state("no open container to exit"));
        }
        if frame.kind == ContainerKind::Array {
            let expected_end = frame.begin + frame.array_len.unwrap_or(0) as usize;
            if expected_end != self.rindex {
                return Err(Error::malformed("array length did not match bytes consumed"));
            }
        }
        self.containers.pop();
        log::trace!("exited container, depth now {}", self.containers.len());
        Ok(())
    }

    /// Walks past the bytes of `type_string` at the cursor without
    /// materializing a value (`spec.md` §4.5 `skip`).
    pub fn skip(&mut self, type_string: &str) -> Result<()> {
        self.check_readable()?;
        self.rindex = wire::skip_value(&self.body, self.endian, self.rindex, type_string)?;
        Ok(())
    }

    /// Resets the read cursor (`spec.md` §4.5 `rewind`). Returns whether
    /// there is at least one more value to read afterward.
    pub fn rewind(&mut self, complete: bool) -> Result<bool> {
        self.check_readable()?;
        if complete {
            self.containers.truncate(1);
            self.containers[0].index = 0;
            self.rindex = 0;
        } else if let Some(frame) = self.containers.last_mut() {
            frame.index = 0;
            self.rindex = frame.begin;
        }
        Ok(!self.current_frame_done()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::ContainerKind;
    use crate::message::Message;

    #[test]
    fn dict_inside_array_scenario() {
        let mut msg = Message::new_signal("/foo", "com.example", "Bar").unwrap();
        msg.open_container(ContainerKind::Array, "{sv}").unwrap();
        msg.open_container(ContainerKind::DictEntry, "sv").unwrap();
        msg.append_basic(Value::String("count".to_string())).unwrap();
        msg.open_container(ContainerKind::Variant, "u").unwrap();
        msg.append_basic(Value::UInt32(42)).unwrap();
        msg.close_container().unwrap();
        msg.close_container().unwrap();
        msg.close_container().unwrap();
        msg.seal(1).unwrap();

        let blob = msg.get_blob().unwrap();
        let mut parsed = Message::from_buffer(blob, None, None).unwrap();

        assert_eq!(parsed.peek_type().unwrap(), PeekedType::Array);
        assert_eq!(parsed.peeked_contents(), "{sv}");
        parsed.enter_container(ContainerKind::Array, "{sv}").unwrap();

        assert_eq!(parsed.peek_type().unwrap(), PeekedType::DictEntry);
        parsed.enter_container(ContainerKind::DictEntry, "sv").unwrap();

        assert_eq!(parsed.peek_type().unwrap(), PeekedType::Basic(Type::String));
        assert_eq!(parsed.read_basic(Type::String).unwrap(), Value::String("count".to_string()));

        assert_eq!(parsed.peek_type().unwrap(), PeekedType::Variant);
        assert_eq!(parsed.peeked_contents(), "u");
        parsed.enter_container(ContainerKind::Variant, "u").unwrap();
        assert_eq!(parsed.read_basic(Type::UInt32).unwrap(), Value::UInt32(42));
        parsed.exit_container().unwrap();

        parsed.exit_container().unwrap();
        assert_eq!(
            parsed.peek_type().unwrap(),
            PeekedType::EndOfContainer(ContainerKind::Array)
        );
        parsed.exit_container().unwrap();
    }

    #[test]
    fn array_length_forged_past_body_end_is_rejected() {
        let mut msg = Message::new_signal("/foo", "com.example", "Bar").unwrap();
        msg.open_container(ContainerKind::Array, "u").unwrap();
        msg.append_basic(Value::UInt32(1)).unwrap();
        msg.close_container().unwrap();
        msg.seal(1).unwrap();
        let mut blob = msg.get_blob().unwrap();
        // Corrupt the array's length prefix, the first 4 bytes of the body.
        let body_offset = blob.len() - msg.body.len();
        blob[body_offset] = 99;
        let mut parsed = Message::from_buffer(blob, None, None).unwrap();
        assert!(parsed.enter_container(ContainerKind::Array, "u").is_err());
    }
}
