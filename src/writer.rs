//! The build-side half of the codec: basic-type append, container open/
//! close, and the variadic convenience append (`spec.md` §4.4).
//!
//! Every operation here follows the same shape: validate the value's
//! marker against the current container's signature cursor *before*
//! touching the body, then write the bytes, then commit the cursor
//! advance. Validating first means a failed write (out-of-memory) never
//! leaves a tentatively-extended root signature behind — there is nothing
//! to truncate, because nothing was appended to the signature until the
//! write that justifies it had already succeeded.

use crate::buffer;
use crate::container::{self, ContainerFrame, ContainerKind};
use crate::error::{Error, Result};
use crate::limits::BUS_ARRAY_MAX_SIZE;
use crate::message::Message;
use crate::type_system;
use crate::value::Value;
use crate::wire;
use std::convert::TryFrom;
use std::os::unix::io::RawFd;

impl Message {
    /// Appends a UNIX_FD value: the wire value is the descriptor's index
    /// into this message's own fd list (`spec.md` §3 "File descriptors",
    /// §9 "fd ownership" — the list travels out-of-band, never embedded in
    /// the serialized bytes). `fd` is appended to the list only after the
    /// value has been written successfully, so a failed append never
    /// leaves an orphaned descriptor behind for `Drop` to close twice.
    pub fn append_fd(&mut self, fd: RawFd) -> Result<()> {
        self.check_writable()?;
        let index = u32::try_from(self.fds.len())
            .map_err(|_| Error::out_of_memory("too many file descriptors"))?;
        self.append_basic(Value::UnixFd(index))?;
        self.fds.push(fd);
        Ok(())
    }

    pub fn append_basic(&mut self, value: Value) -> Result<()> {
        self.check_writable()?;
        if !value.is_basic() {
            return Err(Error::invalid_argument("append_basic requires a basic-type value"));
        }
        let marker = value.signature();
        self.validate_write_marker(&marker)?;
        self.write_basic_value(&value)?;
        self.account_array_growth()?;
        self.commit_write_marker(&marker);
        Ok(())
    }

    pub fn open_container(&mut self, kind: ContainerKind, contents: &str) -> Result<()> {
        self.check_writable()?;
        container::check_depth(self.containers.len())?;

        match kind {
            ContainerKind::Array => {
                if !type_system::is_valid_array_contents(contents) {
                    return Err(Error::invalid_argument("ARRAY contents must be a single complete type"));
                }
            }
            ContainerKind::Variant => {
                if !type_system::is_single_complete_type(contents) {
                    return Err(Error::invalid_argument("VARIANT contents must be a single complete type"));
                }
            }
            ContainerKind::Struct => {
                if !type_system::signature_is_valid(contents) {
                    return Err(Error::invalid_argument("STRUCT contents is not a well-formed signature"));
                }
            }
            ContainerKind::DictEntry => {
                if self.containers.last().map(|f| f.kind) != Some(ContainerKind::Array) {
                    return Err(Error::invalid_argument("DICT_ENTRY may only be opened inside an ARRAY"));
                }
                type_system::is_valid_dict_entry_signature(contents)?;
            }
            ContainerKind::Root => {
                return Err(Error::invalid_argument("root is not an openable container"));
            }
        }

        let marker = container::container_marker(kind, contents);
        self.validate_write_marker(&marker)?;

        let frame = match kind {
            ContainerKind::Array => {
                let size_offset = wire::write_u32(&mut self.body, self.endian, 0)?;
                self.account_array_growth()?;
                let elem_align = type_system::leading_element_alignment(contents)?;
                buffer::pad_to(&mut self.body, elem_align);
                self.account_array_growth()?;
                ContainerFrame {
                    kind,
                    signature: contents.to_string(),
                    index: 0,
                    array_size_offset: Some(size_offset),
                    array_len: None,
                    begin: self.body.len(),
                }
            }
            ContainerKind::Variant => {
                wire::write_signature(&mut self.body, contents)?;
                self.account_array_growth()?;
                ContainerFrame {
                    kind,
                    signature: contents.to_string(),
                    index: 0,
                    array_size_offset: None,
                    array_len: None,
                    begin: self.body.len(),
                }
            }
            ContainerKind::Struct | ContainerKind::DictEntry => {
                buffer::pad_to(&mut self.body, 8);
                self.account_array_growth()?;
                ContainerFrame {
                    kind,
                    signature: contents.to_string(),
                    index: 0,
                    array_size_offset: None,
                    array_len: None,
                    begin: self.body.len(),
                }
            }
            ContainerKind::Root => unreachable!("rejected above"),
        };

        self.commit_write_marker(&marker);
        log::trace!("opened {:?} container, contents {:?}, depth now {}", kind, contents, self.containers.len() + 1);
        self.containers.push(frame);
        Ok(())
    }

    pub fn close_container(&mut self) -> Result<()> {
        self.check_writable()?;
        let frame = self
            .containers
            .last()
            .ok_or_else(|| Error::invalid_state("no open container to close"))?;
        if frame.kind == ContainerKind::Root {
            return Err(Error::invalid_state("no open container to close"));
        }
        if frame.kind != ContainerKind::Array && !frame.is_complete() {
            return Err(Error::invalid_state(
                "container's declared signature has not been fully written",
            ));
        }
        self.containers.pop();
        log::trace!("closed container, depth now {}", self.containers.len());
        Ok(())
    }

    /// Appends a whole value tree, opening and closing containers as
    /// needed (`spec.md` §4.4 `append_variadic`, adapted from a
    /// `type_string, args...` walk to a typed value tree — see DESIGN.md).
    pub fn append(&mut self, value: Value) -> Result<()> {
        self.append_value(&value)
    }

    fn append_value(&mut self, value: &Value) -> Result<()> {
        match value {
            Value::Array(elem_sig, items) => {
                self.open_container(ContainerKind::Array, elem_sig)?;
                for item in items {
                    self.append_value(item)?;
                }
                self.close_container()
            }
            Value::Variant(inner) => {
                let sig = inner.signature();
                self.open_container(ContainerKind::Variant, &sig)?;
                self.append_value(inner)?;
                self.close_container()
            }
            Value::Struct(items) => {
                let sig: String = items.iter().map(Value::signature).collect();
                self.open_container(ContainerKind::Struct, &sig)?;
                for item in items {
                    self.append_value(item)?;
                }
                self.close_container()
            }
            Value::DictEntry(key, value) => {
                let sig = format!("{}{}", key.signature(), value.signature());
                self.open_container(ContainerKind::DictEntry, &sig)?;
                self.append_value(key)?;
                self.append_value(value)?;
                self.close_container()
            }
            basic => self.append_basic(basic.clone()),
        }
    }

    fn check_writable(&self) -> Result<()> {
        if self.sealed {
            return Err(Error::permission_denied("cannot write to a sealed message"));
        }
        Ok(())
    }

    /// Checks `marker` against the current container's signature cursor
    /// without mutating anything (`spec.md` §4.2 "append" rule).
    fn validate_write_marker(&self, marker: &str) -> Result<()> {
        let frame = self
            .containers
            .last()
            .ok_or_else(|| Error::invalid_state("no open container"))?;
        match frame.kind {
            ContainerKind::Root => Ok(()),
            ContainerKind::Array => {
                if frame.signature != marker {
                    Err(Error::type_mismatch(frame.signature.clone(), marker.to_string()))
                } else {
                    Ok(())
                }
            }
            ContainerKind::Variant | ContainerKind::Struct | ContainerKind::DictEntry => {
                match frame.peek() {
                    None => Err(Error::invalid_state(
                        "container's declared signature is already fully written",
                    )),
                    Some(expected) if expected != marker => {
                        Err(Error::type_mismatch(expected.to_string(), marker.to_string()))
                    }
                    Some(_) => Ok(()),
                }
            }
        }
    }

    /// Advances the signature cursor after a write already validated by
    /// [`Message::validate_write_marker`] has succeeded.
    fn commit_write_marker(&mut self, marker: &str) {
        let frame = match self.containers.last_mut() {
            Some(frame) => frame,
            None => return,
        };
        match frame.kind {
            ContainerKind::Root => {
                frame.signature.push_str(marker);
                frame.index = frame.signature.len();
            }
            ContainerKind::Array => {}
            ContainerKind::Variant | ContainerKind::Struct | ContainerKind::DictEntry => {
                frame.index += marker.len();
            }
        }
    }

    fn write_basic_value(&mut self, value: &Value) -> Result<()> {
        let endian = self.endian;
        match value {
            Value::Byte(v) => {
                wire::write_u8(&mut self.body, *v)?;
            }
            Value::Boolean(v) => {
                wire::write_bool(&mut self.body, endian, *v)?;
            }
            Value::Int16(v) => {
                wire::write_i16(&mut self.body, endian, *v)?;
            }
            Value::UInt16(v) => {
                wire::write_u16(&mut self.body, endian, *v)?;
            }
            Value::Int32(v) => {
                wire::write_i32(&mut self.body, endian, *v)?;
            }
            Value::UInt32(v) => {
                wire::write_u32(&mut self.body, endian, *v)?;
            }
            Value::Int64(v) => {
                wire::write_i64(&mut self.body, endian, *v)?;
            }
            Value::UInt64(v) => {
                wire::write_u64(&mut self.body, endian, *v)?;
            }
            Value::Double(v) => {
                wire::write_f64(&mut self.body, endian, *v)?;
            }
            Value::String(s) => {
                wire::write_string(&mut self.body, endian, s)?;
            }
            Value::ObjectPath(s) => {
                wire::write_string(&mut self.body, endian, s)?;
            }
            Value::Signature(s) => {
                wire::write_signature(&mut self.body, s)?;
            }
            Value::UnixFd(index) => {
                wire::write_u32(&mut self.body, endian, *index)?;
            }
            Value::Array(..) | Value::Variant(_) | Value::Struct(_) | Value::DictEntry(..) => {
                return Err(Error::invalid_argument("not a basic value"));
            }
        }
        Ok(())
    }

    /// Walks every open ARRAY frame and resets its length prefix to the
    /// number of body bytes appended since that array's contents began
    /// (`spec.md` §4.3's per-append array-size accounting).
    fn account_array_growth(&mut self) -> Result<()> {
        for i in 0..self.containers.len() {
            let (kind, offset, begin) = {
                let frame = &self.containers[i];
                (frame.kind, frame.array_size_offset, frame.begin)
            };
            if kind != ContainerKind::Array {
                continue;
            }
            let offset = match offset {
                Some(offset) => offset,
                None => continue,
            };
            let len = self.body.len() - begin;
            if len as u64 > BUS_ARRAY_MAX_SIZE as u64 {
                return Err(Error::invalid_argument(format!(
                    "array body would grow to {} bytes, exceeding the {}-byte cap",
                    len, BUS_ARRAY_MAX_SIZE
                )));
            }
            self.endian.write_u32(&mut self.body[offset..offset + 4], len as u32);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Message;

    #[test]
    fn struct_append_and_close() {
        let mut msg = Message::new_signal("/foo", "com.example", "Bar").unwrap();
        msg.open_container(ContainerKind::Struct, "iu").unwrap();
        msg.append_basic(Value::Int32(-1)).unwrap();
        msg.append_basic(Value::UInt32(2)).unwrap();
        msg.close_container().unwrap();
        assert_eq!(msg.root_signature(), "(iu)");
    }

    #[test]
    fn close_rejects_incomplete_struct() {
        let mut msg = Message::new_signal("/foo", "com.example", "Bar").unwrap();
        msg.open_container(ContainerKind::Struct, "iu").unwrap();
        msg.append_basic(Value::Int32(-1)).unwrap();
        assert!(msg.close_container().is_err());
    }

    #[test]
    fn array_of_structs_tracks_length() {
        let mut msg = Message::new_signal("/foo", "com.example", "Bar").unwrap();
        msg.open_container(ContainerKind::Array, "(iu)").unwrap();
        for i in 0..3i32 {
            msg.open_container(ContainerKind::Struct, "iu").unwrap();
            msg.append_basic(Value::Int32(i)).unwrap();
            msg.append_basic(Value::UInt32(i as u32)).unwrap();
            msg.close_container().unwrap();
        }
        msg.close_container().unwrap();
        assert_eq!(msg.root_signature(), "a(iu)");
    }

    #[test]
    fn depth_guard_rejects_65th_variant() {
        let mut msg = Message::new_signal("/foo", "com.example", "Bar").unwrap();
        for _ in 0..64 {
            // nesting v inside v: each level's contents is itself "v"
            msg.open_container(ContainerKind::Variant, "v").unwrap();
        }
        // The loop above nests 64 variants (1..=64); the 65th open must fail.
        assert!(msg.open_container(ContainerKind::Variant, "v").is_err());
    }

    #[test]
    fn type_mismatch_on_wrong_struct_field() {
        let mut msg = Message::new_signal("/foo", "com.example", "Bar").unwrap();
        msg.open_container(ContainerKind::Struct, "iu").unwrap();
        assert!(msg.append_basic(Value::String("nope".to_string())).is_err());
    }

    #[test]
    fn append_fd_records_index_and_owns_descriptor() {
        let mut msg = Message::new_signal("/foo", "com.example", "Bar").unwrap();
        msg.append_fd(3).unwrap();
        msg.append_fd(4).unwrap();
        assert_eq!(msg.root_signature(), "hh");
        assert_eq!(msg.take_fds(), vec![3, 4]);
    }

    #[test]
    fn append_variadic_dict_entry() {
        let mut msg = Message::new_signal("/foo", "com.example", "Bar").unwrap();
        let entry = Value::DictEntry(
            Box::new(Value::String("count".to_string())),
            Box::new(Value::Variant(Box::new(Value::UInt32(42)))),
        );
        msg.append(Value::Array("{sv}".to_string(), vec![entry])).unwrap();
        assert_eq!(msg.root_signature(), "a{sv}");
    }
}
