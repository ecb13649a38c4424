//! D-Bus message codec: build, serialize, parse and traverse messages in the
//! D-Bus wire format.
//!
//! The crate is organized bottom-up, the same way the wire format itself
//! layers: [`buffer`] grows the two regions every message owns; [`wire`]
//! encodes and decodes individual basic-type values against those regions;
//! [`type_system`] and [`container`] track the signature grammar and the
//! open-container stack shared by both the build and parse pipelines;
//! [`writer`] and [`reader`] are `impl Message` blocks built on top of that
//! stack; and [`message`] ties the whole thing to a single `Message` type
//! with constructors, `seal`, and `from_buffer`.
//!
//! Transport (socket I/O, authentication, fd passing) and bus-level
//! dispatch are out of scope: this crate only produces and consumes
//! buffers and file descriptor lists.

mod buffer;
mod container;
mod error;
mod fields;
mod limits;
mod message;
mod names;
mod reader;
mod type_system;
mod value;
mod wire;
mod writer;

pub use container::ContainerKind;
pub use error::{Error, Result};
pub use limits::{BUS_ARRAY_MAX_SIZE, BUS_CONTAINER_DEPTH, BUS_MESSAGE_SIZE_MAX, MAX_NAME_LENGTH};
pub use message::{Credentials, ErrorInfo, HeaderFlags, Message, MessageType};
pub use names::{
    is_valid_bus_name, is_valid_error_name, is_valid_interface_name, is_valid_member_name,
    is_valid_object_path,
};
pub use reader::PeekedType;
pub use type_system::Type;
pub use value::Value;
