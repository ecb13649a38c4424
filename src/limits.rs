//! Protocol-fixed limits. These are invariants of the D-Bus wire format, not
//! runtime policy, so they are plain constants rather than a config surface.

/// Maximum permitted length, in bytes, of a single ARRAY body (`BUS_ARRAY_MAX_SIZE`).
pub const BUS_ARRAY_MAX_SIZE: u32 = 64 * 1024 * 1024;

/// Maximum permitted nesting depth of open containers (`BUS_CONTAINER_DEPTH`).
pub const BUS_CONTAINER_DEPTH: usize = 64;

/// Maximum size, in bytes, of a whole serialized message (wire format ceiling).
pub const BUS_MESSAGE_SIZE_MAX: u64 = u32::MAX as u64;

/// Maximum length of a bus name, interface name, member name or error name.
pub const MAX_NAME_LENGTH: usize = 255;

/// Fixed size of a message header, before the fields array.
pub const HEADER_LENGTH: usize = 16;

/// Required major protocol version.
pub const PROTOCOL_VERSION: u8 = 1;
