//! The message object: header, fields, body, container stack and read
//! cursor (`spec.md` §3 "Message"). Construction, sealing and parsing live
//! here; basic-type append/read and container traversal are split out into
//! `writer.rs` and `reader.rs` as additional `impl Message` blocks over the
//! same struct, mirroring how the teacher kept its header/body concerns and
//! its wire-write concerns in separate files over one connection type.

use crate::buffer;
use crate::container::ContainerFrame;
use crate::error::{Error, Result};
use crate::fields::{self, ParsedFields};
use crate::limits::{BUS_MESSAGE_SIZE_MAX, HEADER_LENGTH, PROTOCOL_VERSION};
use crate::names;
use crate::wire::{self, Endian};
use bitflags::bitflags;
use std::convert::TryFrom;
use std::os::unix::io::RawFd;

/// The four wire message types (`spec.md` §3, wire codes per §6).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MessageType {
    MethodCall = 1,
    MethodReturn = 2,
    Error = 3,
    Signal = 4,
}

impl MessageType {
    fn code(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for MessageType {
    type Error = Error;

    fn try_from(code: u8) -> Result<MessageType> {
        Ok(match code {
            1 => MessageType::MethodCall,
            2 => MessageType::MethodReturn,
            3 => MessageType::Error,
            4 => MessageType::Signal,
            other => {
                return Err(Error::malformed(format!(
                    "unknown message type code {}",
                    other
                )))
            }
        })
    }
}

bitflags! {
    /// Header byte 2 (`spec.md` §3, §6).
    pub struct HeaderFlags: u8 {
        const NO_REPLY_EXPECTED = 0x1;
        const NO_AUTO_START = 0x2;
        const ALLOW_INTERACTIVE_AUTHORIZATION = 0x4;
    }
}

/// Credentials attached to a received message (`spec.md` §3 "Credentials
/// (received only)").
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Credentials {
    pub uid: Option<u32>,
    pub gid: Option<u32>,
    pub pid: Option<u32>,
    pub tid: Option<u32>,
}

/// METHOD_ERROR's name + best-effort message (`spec.md` §4.5, §9 open
/// question (a)).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ErrorInfo {
    pub name: String,
    pub message: Option<String>,
}

pub struct Message {
    pub(crate) endian: Endian,
    pub(crate) message_type: MessageType,
    pub(crate) flags: HeaderFlags,
    pub(crate) serial: u32,
    pub(crate) header: [u8; HEADER_LENGTH],
    pub(crate) fields: Vec<u8>,
    pub(crate) body: Vec<u8>,
    pub(crate) sealed: bool,
    pub(crate) containers: Vec<ContainerFrame>,
    pub(crate) rindex: usize,
    pub(crate) fds: Vec<RawFd>,
    pub(crate) expected_fds: u32,
    pub(crate) path: Option<String>,
    pub(crate) interface: Option<String>,
    pub(crate) member: Option<String>,
    pub(crate) destination: Option<String>,
    pub(crate) sender: Option<String>,
    pub(crate) reply_serial: Option<u32>,
    pub(crate) error: Option<ErrorInfo>,
    pub(crate) credentials: Option<Credentials>,
    pub(crate) label: Option<Vec<u8>>,
    pub(crate) peeked_signature: String,
    /// Carried on replies whose originating call set `no_reply_expected`;
    /// never serialized (`spec.md` §9 open question (b)).
    pub(crate) dont_send: bool,
}

impl Message {
    fn new(message_type: MessageType, flags: HeaderFlags) -> Message {
        Message {
            endian: Endian::native(),
            message_type,
            flags,
            serial: 0,
            header: [0; HEADER_LENGTH],
            fields: Vec::new(),
            body: Vec::new(),
            sealed: false,
            containers: vec![ContainerFrame::root()],
            rindex: 0,
            fds: Vec::new(),
            expected_fds: 0,
            path: None,
            interface: None,
            member: None,
            destination: None,
            sender: None,
            reply_serial: None,
            error: None,
            credentials: None,
            label: None,
            peeked_signature: String::new(),
            dont_send: false,
        }
    }

    fn check_unsealed(&self) -> Result<()> {
        if self.sealed {
            return Err(Error::permission_denied("message is already sealed"));
        }
        Ok(())
    }

    // --- constructors (`spec.md` §4.6) -----------------------------------

    pub fn new_signal(path: &str, interface: &str, member: &str) -> Result<Message> {
        if !names::is_valid_object_path(path) {
            return Err(Error::invalid_argument("signal path is not a valid object path"));
        }
        if !names::is_valid_interface_name(interface) {
            return Err(Error::invalid_argument("signal interface is not a valid interface name"));
        }
        if !names::is_valid_member_name(member) {
            return Err(Error::invalid_argument("signal member is not a valid member name"));
        }
        let mut msg = Message::new(MessageType::Signal, HeaderFlags::NO_REPLY_EXPECTED);
        msg.path = Some(path.to_string());
        msg.interface = Some(interface.to_string());
        msg.member = Some(member.to_string());
        Ok(msg)
    }

    pub fn new_method_call(
        destination: Option<&str>,
        path: &str,
        interface: Option<&str>,
        member: &str,
    ) -> Result<Message> {
        if !names::is_valid_object_path(path) {
            return Err(Error::invalid_argument("method call path is not a valid object path"));
        }
        if !names::is_valid_member_name(member) {
            return Err(Error::invalid_argument("method call member is not a valid member name"));
        }
        if let Some(iface) = interface {
            if !names::is_valid_interface_name(iface) {
                return Err(Error::invalid_argument("method call interface is not a valid interface name"));
            }
        }
        if let Some(dest) = destination {
            if !names::is_valid_bus_name(dest) {
                return Err(Error::invalid_argument("method call destination is not a valid bus name"));
            }
        }
        let mut msg = Message::new(MessageType::MethodCall, HeaderFlags::empty());
        msg.path = Some(path.to_string());
        msg.member = Some(member.to_string());
        msg.interface = interface.map(str::to_string);
        msg.destination = destination.map(str::to_string);
        Ok(msg)
    }

    pub fn new_method_return(call: &Message) -> Result<Message> {
        call.check_is_sealed_method_call()?;
        let mut msg = Message::new(MessageType::MethodReturn, HeaderFlags::empty());
        msg.destination = call.sender.clone();
        msg.reply_serial = Some(call.serial);
        msg.dont_send = call.flags.contains(HeaderFlags::NO_REPLY_EXPECTED);
        Ok(msg)
    }

    pub fn new_method_error(call: &Message, error_name: &str, error_message: Option<&str>) -> Result<Message> {
        call.check_is_sealed_method_call()?;
        if !names::is_valid_error_name(error_name) {
            return Err(Error::invalid_argument("error name is not a valid error name"));
        }
        let mut msg = Message::new(MessageType::Error, HeaderFlags::empty());
        msg.destination = call.sender.clone();
        msg.reply_serial = Some(call.serial);
        msg.dont_send = call.flags.contains(HeaderFlags::NO_REPLY_EXPECTED);
        msg.error = Some(ErrorInfo {
            name: error_name.to_string(),
            message: error_message.map(str::to_string),
        });
        if let Some(text) = error_message {
            msg.append_basic(crate::value::Value::String(text.to_string()))?;
        }
        Ok(msg)
    }

    fn check_is_sealed_method_call(&self) -> Result<()> {
        if !self.sealed {
            return Err(Error::invalid_state(
                "the originating call must be sealed before replying to it",
            ));
        }
        if self.message_type != MessageType::MethodCall {
            return Err(Error::invalid_state(
                "can only reply to a message of type method_call",
            ));
        }
        Ok(())
    }

    // --- invariant 9 / invariant 10 ---------------------------------------

    fn check_required_fields(&self) -> Result<()> {
        match self.message_type {
            MessageType::Signal => {
                if self.path.is_none() || self.interface.is_none() || self.member.is_none() {
                    return Err(Error::malformed("signal is missing path, interface or member"));
                }
            }
            MessageType::MethodCall => {
                if self.path.is_none() || self.member.is_none() {
                    return Err(Error::malformed("method call is missing path or member"));
                }
            }
            MessageType::MethodReturn => {
                if self.reply_serial.is_none() {
                    return Err(Error::malformed("method return is missing reply_serial"));
                }
            }
            MessageType::Error => {
                if self.reply_serial.is_none() || self.error.is_none() {
                    return Err(Error::malformed("method error is missing reply_serial or error_name"));
                }
            }
        }
        Ok(())
    }

    fn check_body_signature_consistency(&self) -> Result<()> {
        let root_signature_empty = self.containers[0].signature.is_empty();
        if self.body.is_empty() != root_signature_empty {
            return Err(Error::malformed(
                "body length and root signature emptiness disagree",
            ));
        }
        Ok(())
    }

    // --- seal (`spec.md` §4.7) -------------------------------------------

    pub fn seal(&mut self, serial: u32) -> Result<()> {
        self.check_unsealed()?;
        if self.containers.len() != 1 {
            return Err(Error::invalid_state("cannot seal with open containers"));
        }
        if serial == 0 {
            return Err(Error::invalid_argument("serial must be non-zero"));
        }
        self.check_required_fields()?;
        self.check_body_signature_consistency()?;

        if let Some(path) = &self.path {
            fields::append_string(&mut self.fields, self.endian, fields::FIELD_PATH, "o", path)?;
        }
        if let Some(interface) = &self.interface {
            fields::append_string(&mut self.fields, self.endian, fields::FIELD_INTERFACE, "s", interface)?;
        }
        if let Some(member) = &self.member {
            fields::append_string(&mut self.fields, self.endian, fields::FIELD_MEMBER, "s", member)?;
        }
        if let Some(error) = &self.error {
            fields::append_string(&mut self.fields, self.endian, fields::FIELD_ERROR_NAME, "s", &error.name)?;
        }
        if let Some(reply_serial) = self.reply_serial {
            fields::append_u32(&mut self.fields, self.endian, fields::FIELD_REPLY_SERIAL, reply_serial)?;
        }
        if let Some(destination) = &self.destination {
            fields::append_string(&mut self.fields, self.endian, fields::FIELD_DESTINATION, "s", destination)?;
        }
        if let Some(sender) = &self.sender {
            fields::append_string(&mut self.fields, self.endian, fields::FIELD_SENDER, "s", sender)?;
        }
        let root_signature = self.containers[0].signature.clone();
        if !root_signature.is_empty() {
            fields::append_signature(&mut self.fields, fields::FIELD_SIGNATURE, &root_signature)?;
        }
        if !self.fds.is_empty() {
            let count = u32::try_from(self.fds.len())
                .map_err(|_| Error::out_of_memory("too many file descriptors to serialize"))?;
            fields::append_u32(&mut self.fields, self.endian, fields::FIELD_UNIX_FDS, count)?;
        }

        self.serial = serial;
        self.sealed = true;
        self.rebuild_header();
        log::debug!(
            "sealed {:?} serial {} body {} bytes fields {} bytes",
            self.message_type,
            self.serial,
            self.body.len(),
            self.fields.len()
        );
        Ok(())
    }

    fn rebuild_header(&mut self) {
        let mut header = [0u8; HEADER_LENGTH];
        header[0] = self.endian.marker();
        header[1] = self.message_type.code();
        header[2] = self.flags.bits();
        header[3] = PROTOCOL_VERSION;
        self.endian.write_u32(&mut header[4..8], self.body.len() as u32);
        self.endian.write_u32(&mut header[8..12], self.serial);
        self.endian.write_u32(&mut header[12..16], self.fields.len() as u32);
        self.header = header;
    }

    // --- receive path (`spec.md` §4.5 `from_buffer`) ----------------------

    pub fn from_buffer(buf: Vec<u8>, credentials: Option<Credentials>, label: Option<Vec<u8>>) -> Result<Message> {
        if buf.len() < HEADER_LENGTH {
            return Err(Error::malformed("buffer shorter than the 16-byte header"));
        }
        let endian = Endian::from_marker(buf[0])?;
        let message_type = MessageType::try_from(buf[1])?;
        let flags = HeaderFlags::from_bits_truncate(buf[2]);
        if buf[3] != PROTOCOL_VERSION {
            return Err(Error::malformed(format!(
                "unsupported protocol version {}",
                buf[3]
            )));
        }
        let body_size = endian.read_u32(&buf[4..8]) as usize;
        let serial = endian.read_u32(&buf[8..12]);
        if serial == 0 {
            return Err(Error::malformed("serial must be non-zero"));
        }
        let fields_size = endian.read_u32(&buf[12..16]) as usize;

        let fields_padded = buffer::align_up(fields_size, 8);
        let expected_len = HEADER_LENGTH
            .checked_add(fields_padded)
            .and_then(|n| n.checked_add(body_size))
            .ok_or_else(|| Error::malformed("header sizes overflow"))?;
        if expected_len as u64 > BUS_MESSAGE_SIZE_MAX {
            return Err(Error::malformed("message exceeds the wire-format size limit"));
        }
        if buf.len() != expected_len {
            return Err(Error::malformed(format!(
                "buffer length {} does not match header-declared length {}",
                buf.len(),
                expected_len
            )));
        }

        let fields_region = buf[HEADER_LENGTH..HEADER_LENGTH + fields_size].to_vec();
        if !buffer::padding_is_zero(&buf, HEADER_LENGTH + fields_size, HEADER_LENGTH + fields_padded) {
            return Err(Error::malformed("non-zero padding between fields and body"));
        }
        let body_start = HEADER_LENGTH + fields_padded;
        let body = buf[body_start..body_start + body_size].to_vec();

        let parsed: ParsedFields = fields::parse(&fields_region, endian)?;
        let root_signature = parsed.signature.clone().unwrap_or_default();

        let mut msg = Message::new(message_type, flags);
        msg.endian = endian;
        msg.serial = serial;
        msg.fields = fields_region;
        msg.body = body;
        msg.credentials = credentials;
        msg.label = label;
        msg.path = parsed.path;
        msg.interface = parsed.interface;
        msg.member = parsed.member;
        msg.destination = parsed.destination;
        msg.sender = parsed.sender;
        msg.reply_serial = parsed.reply_serial;
        msg.expected_fds = parsed.unix_fds.unwrap_or(0);
        if let Some(name) = parsed.error_name {
            msg.error = Some(ErrorInfo { name, message: None });
        }
        msg.containers = vec![ContainerFrame {
            kind: crate::container::ContainerKind::Root,
            signature: root_signature,
            index: 0,
            array_size_offset: None,
            array_len: None,
            begin: 0,
        }];

        msg.check_required_fields()?;
        msg.check_body_signature_consistency()?;

        if msg.message_type == MessageType::Error {
            // Best-effort: a failure here is silently ignored (`spec.md` §9
            // open question (a)).
            if let Ok((text, _)) = wire::read_string(&msg.body, msg.endian, 0) {
                if let Some(error) = &mut msg.error {
                    error.message = Some(text);
                }
            }
        }

        msg.sealed = true;
        msg.rebuild_header();
        log::debug!(
            "parsed {:?} serial {} body {} bytes fields {} bytes",
            msg.message_type,
            msg.serial,
            msg.body.len(),
            msg.fields.len()
        );
        Ok(msg)
    }

    // --- quick-access getters (`spec.md` §6 public API) -------------------

    pub fn message_type(&self) -> MessageType {
        self.message_type
    }

    pub fn serial(&self) -> u32 {
        self.serial
    }

    pub fn reply_serial(&self) -> Option<u32> {
        self.reply_serial
    }

    pub fn no_reply_expected(&self) -> bool {
        self.flags.contains(HeaderFlags::NO_REPLY_EXPECTED)
    }

    pub fn dont_send(&self) -> bool {
        self.dont_send
    }

    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    pub fn interface(&self) -> Option<&str> {
        self.interface.as_deref()
    }

    pub fn member(&self) -> Option<&str> {
        self.member.as_deref()
    }

    pub fn destination(&self) -> Option<&str> {
        self.destination.as_deref()
    }

    pub fn sender(&self) -> Option<&str> {
        self.sender.as_deref()
    }

    pub fn error(&self) -> Option<(&str, Option<&str>)> {
        self.error.as_ref().map(|e| (e.name.as_str(), e.message.as_deref()))
    }

    pub fn uid(&self) -> Option<u32> {
        self.credentials.as_ref().and_then(|c| c.uid)
    }

    pub fn gid(&self) -> Option<u32> {
        self.credentials.as_ref().and_then(|c| c.gid)
    }

    pub fn pid(&self) -> Option<u32> {
        self.credentials.as_ref().and_then(|c| c.pid)
    }

    pub fn tid(&self) -> Option<u32> {
        self.credentials.as_ref().and_then(|c| c.tid)
    }

    pub fn label(&self) -> Option<&[u8]> {
        self.label.as_deref()
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    pub fn root_signature(&self) -> &str {
        &self.containers[0].signature
    }

    pub fn is_signal(&self, interface: Option<&str>, member: Option<&str>) -> bool {
        self.message_type == MessageType::Signal
            && interface.map_or(true, |i| self.interface.as_deref() == Some(i))
            && member.map_or(true, |m| self.member.as_deref() == Some(m))
    }

    pub fn is_method_call(&self, interface: Option<&str>, member: Option<&str>) -> bool {
        self.message_type == MessageType::MethodCall
            && interface.map_or(true, |i| self.interface.as_deref() == Some(i))
            && member.map_or(true, |m| self.member.as_deref() == Some(m))
    }

    pub fn is_method_error(&self, name: Option<&str>) -> bool {
        self.message_type == MessageType::Error
            && name.map_or(true, |n| self.error.as_ref().map(|e| e.name.as_str()) == Some(n))
    }

    /// Moves the owned file descriptors out of the message (`spec.md` §9 "fd
    /// ownership"); after this call `Drop` has nothing left to close.
    pub fn take_fds(&mut self) -> Vec<RawFd> {
        std::mem::take(&mut self.fds)
    }

    /// Attaches file descriptors received alongside the buffer passed to
    /// [`Message::from_buffer`] (`spec.md` §1: transport-level fd passing is
    /// out of scope, so the codec only ever sees the already-received list).
    /// Replaces any descriptors currently owned by the message; call before
    /// any `read_basic(Type::UnixFd)` that needs to resolve an index.
    pub fn set_received_fds(&mut self, fds: Vec<RawFd>) {
        self.fds = fds;
    }

    pub fn expected_fd_count(&self) -> u32 {
        self.expected_fds
    }

    // --- wire output (`spec.md` §3 "iovec view", §4.7) --------------------

    /// The ordered byte spans that make up the serialized message: header,
    /// fields, 0..7 bytes of zero padding, body.
    pub fn iovecs(&self) -> Result<[std::io::IoSlice<'_>; 4]> {
        if !self.sealed {
            return Err(Error::invalid_state("message must be sealed before it can be serialized"));
        }
        const ZERO_PAD: [u8; 7] = [0; 7];
        let pad_len = buffer::align_up(self.fields.len(), 8) - self.fields.len();
        Ok([
            std::io::IoSlice::new(&self.header),
            std::io::IoSlice::new(&self.fields),
            std::io::IoSlice::new(&ZERO_PAD[..pad_len]),
            std::io::IoSlice::new(&self.body),
        ])
    }

    pub fn get_blob(&self) -> Result<Vec<u8>> {
        if !self.sealed {
            return Err(Error::invalid_state("message must be sealed before it can be serialized"));
        }
        let pad_len = buffer::align_up(self.fields.len(), 8) - self.fields.len();
        let mut out = Vec::with_capacity(self.header.len() + self.fields.len() + pad_len + self.body.len());
        out.extend_from_slice(&self.header);
        out.extend_from_slice(&self.fields);
        out.extend(std::iter::repeat(0u8).take(pad_len));
        out.extend_from_slice(&self.body);
        Ok(out)
    }
}

impl Drop for Message {
    fn drop(&mut self) {
        for fd in self.fds.drain(..) {
            let _ = nix::unistd::close(fd);
        }
    }
}

impl std::fmt::Debug for Message {
    /// Never panics, even on an unsealed or mid-traversal message — this is
    /// the representation the `log` instrumentation in the writer/reader
    /// reaches for, so it has to stay safe under arbitrary internal state.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Message")
            .field("type", &self.message_type)
            .field("serial", &self.serial)
            .field("sealed", &self.sealed)
            .field("path", &self.path)
            .field("interface", &self.interface)
            .field("member", &self.member)
            .field("containers_open", &self.containers.len())
            .field("body_len", &self.body.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    #[test]
    fn signal_round_trip_scenario() {
        let mut msg = Message::new_signal("/foo", "com.example", "Bar").unwrap();
        msg.append_basic(Value::String("hi".to_string())).unwrap();
        msg.append_basic(Value::UInt32(7)).unwrap();
        msg.seal(1).unwrap();

        assert_eq!(msg.message_type(), MessageType::Signal);
        assert!(msg.no_reply_expected());
        assert_eq!(msg.serial(), 1);
        assert_eq!(msg.root_signature(), "su");

        let blob = msg.get_blob().unwrap();
        assert_eq!(blob[0], msg.endian.marker());
        assert_eq!(blob[1], 4);
        assert_eq!(blob[2], 1);
        assert_eq!(blob[3], 1);

        let parsed = Message::from_buffer(blob, None, None).unwrap();
        assert_eq!(parsed.path(), Some("/foo"));
        assert_eq!(parsed.interface(), Some("com.example"));
        assert_eq!(parsed.member(), Some("Bar"));
        assert_eq!(parsed.root_signature(), "su");
    }

    #[test]
    fn method_call_without_interface() {
        let mut msg = Message::new_method_call(Some("o.f.DBus"), "/", None, "Hello").unwrap();
        msg.seal(1).unwrap();
        assert_eq!(msg.root_signature(), "");
        let blob = msg.get_blob().unwrap();
        let parsed = Message::from_buffer(blob, None, None).unwrap();
        assert_eq!(parsed.interface(), None);
        assert_eq!(parsed.destination(), Some("o.f.DBus"));
        assert_eq!(parsed.member(), Some("Hello"));
    }

    #[test]
    fn unix_fds_field_round_trips_without_embedding_descriptors() {
        let mut msg = Message::new_signal("/foo", "com.example", "Bar").unwrap();
        msg.append_fd(5).unwrap();
        msg.seal(1).unwrap();
        let blob = msg.get_blob().unwrap();

        let mut parsed = Message::from_buffer(blob, None, None).unwrap();
        assert_eq!(parsed.expected_fd_count(), 1);
        assert_eq!(parsed.root_signature(), "h");

        parsed.set_received_fds(vec![7]);
        assert_eq!(
            parsed.read_basic(crate::type_system::Type::UnixFd).unwrap(),
            Value::UnixFd(0)
        );
        assert_eq!(parsed.take_fds(), vec![7]);
    }

    #[test]
    fn error_reply_round_trip() {
        let mut call = Message::new_method_call(None, "/", None, "Do").unwrap();
        call.seal(100).unwrap();
        let mut reply = Message::new_method_error(&call, "com.example.BadArg", Some("nope")).unwrap();
        reply.seal(1).unwrap();
        assert_eq!(reply.reply_serial(), Some(100));
        assert_eq!(reply.root_signature(), "s");

        let blob = reply.get_blob().unwrap();
        let parsed = Message::from_buffer(blob, None, None).unwrap();
        assert!(parsed.is_method_error(Some("com.example.BadArg")));
        assert_eq!(parsed.error(), Some(("com.example.BadArg", Some("nope"))));
    }

    /// A single basic value, restricted to what `Arbitrary` can shrink
    /// sensibly (`String`'s bytes are filtered to exclude the interior NUL
    /// a D-Bus string forbids).
    #[derive(Clone, Debug)]
    enum ArbitraryBasic {
        Byte(u8),
        Boolean(bool),
        Int32(i32),
        UInt64(u64),
        Double(u32), // carried as bits; NaN payloads don't round-trip through == otherwise
        Str(String),
    }

    impl quickcheck::Arbitrary for ArbitraryBasic {
        fn arbitrary<G: quickcheck::Gen>(g: &mut G) -> Self {
            match u8::arbitrary(g) % 6 {
                0 => ArbitraryBasic::Byte(u8::arbitrary(g)),
                1 => ArbitraryBasic::Boolean(bool::arbitrary(g)),
                2 => ArbitraryBasic::Int32(i32::arbitrary(g)),
                3 => ArbitraryBasic::UInt64(u64::arbitrary(g)),
                4 => ArbitraryBasic::Double(u32::arbitrary(g)),
                _ => {
                    let s: String = String::arbitrary(g).chars().filter(|c| *c != '\0').collect();
                    ArbitraryBasic::Str(s)
                }
            }
        }
    }

    impl ArbitraryBasic {
        fn to_value(&self) -> Value {
            match self {
                ArbitraryBasic::Byte(v) => Value::Byte(*v),
                ArbitraryBasic::Boolean(v) => Value::Boolean(*v),
                ArbitraryBasic::Int32(v) => Value::Int32(*v),
                ArbitraryBasic::UInt64(v) => Value::UInt64(*v),
                ArbitraryBasic::Double(bits) => Value::Double(f64::from(*bits)),
                ArbitraryBasic::Str(s) => Value::String(s.clone()),
            }
        }

        fn ty(&self) -> crate::type_system::Type {
            match self {
                ArbitraryBasic::Byte(_) => crate::type_system::Type::Byte,
                ArbitraryBasic::Boolean(_) => crate::type_system::Type::Boolean,
                ArbitraryBasic::Int32(_) => crate::type_system::Type::Int32,
                ArbitraryBasic::UInt64(_) => crate::type_system::Type::UInt64,
                ArbitraryBasic::Double(_) => crate::type_system::Type::Double,
                ArbitraryBasic::Str(_) => crate::type_system::Type::String,
            }
        }
    }

    #[quickcheck_macros::quickcheck]
    fn basic_values_round_trip_through_seal_and_parse(values: Vec<ArbitraryBasic>) -> bool {
        let mut msg = Message::new_signal("/foo", "com.example", "Bar").unwrap();
        for v in &values {
            if msg.append_basic(v.to_value()).is_err() {
                return true; // a forged type (none here) would be the only way to fail
            }
        }
        msg.seal(1).unwrap();
        let blob = msg.get_blob().unwrap();
        let mut parsed = Message::from_buffer(blob, None, None).unwrap();
        for v in &values {
            if parsed.read_basic(v.ty()).unwrap() != v.to_value() {
                return false;
            }
        }
        true
    }
}
