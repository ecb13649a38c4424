//! The container stack and signature cursor (`spec.md` §4.2, §4.3).
//!
//! A single `ContainerFrame` type serves both the writer and the reader:
//! during a build it tracks how much of the current container's signature
//! has been appended (extending the root frame's signature in place, per
//! `spec.md` §4.2); during a traversal of a sealed message it tracks how
//! much has been read back out. `writer.rs` and `reader.rs` both drive this
//! same frame shape with a validate-before/commit-after pair of calls
//! around the actual byte write or read, so a failed write never leaves a
//! tentatively-extended root signature behind (`peek` below is what they
//! validate against; the commit step is a plain field mutation in each of
//! those modules, not reproduced here).

use crate::error::{Error, Result};
use crate::limits::BUS_CONTAINER_DEPTH;
use crate::type_system::leading_element_len;

/// What a container frame encloses. `Root` is not itself a wire container —
/// it stands for the message body's top-level argument list — but sharing
/// its bookkeeping with the real containers lets the same cursor code drive
/// both.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ContainerKind {
    Root,
    Array,
    Variant,
    Struct,
    DictEntry,
}

#[derive(Debug)]
pub(crate) struct ContainerFrame {
    pub(crate) kind: ContainerKind,
    /// Contents signature: for `Root` the (growing, on write) top-level body
    /// signature; for `Array`/`Variant`/`Struct`/`DictEntry` the signature
    /// given to `open_container`/`enter_container` at push time.
    pub(crate) signature: String,
    /// Cursor into `signature`, in bytes. Unused for `Array` (every element
    /// reuses the same declared type).
    pub(crate) index: usize,
    /// Body offset of the u32 length prefix, for an open `Array` frame on
    /// the write side (`spec.md` §4.3's "array_size" back-pointer).
    pub(crate) array_size_offset: Option<usize>,
    /// Length captured from the wire on the read side for an open `Array`
    /// frame.
    pub(crate) array_len: Option<u32>,
    /// Body offset at which this container's contents begin.
    pub(crate) begin: usize,
}

impl ContainerFrame {
    pub(crate) fn root() -> ContainerFrame {
        ContainerFrame {
            kind: ContainerKind::Root,
            signature: String::new(),
            index: 0,
            array_size_offset: None,
            array_len: None,
            begin: 0,
        }
    }

    /// The complete-type substring at the cursor, without consuming it, or
    /// `None` at end-of-container (`Array`'s "more elements?" question is
    /// answered separately, from the length prefix and the read cursor, not
    /// from this signature string).
    pub(crate) fn peek(&self) -> Option<&str> {
        match self.kind {
            ContainerKind::Array => Some(self.signature.as_str()),
            _ => {
                if self.index >= self.signature.len() {
                    None
                } else {
                    let slot = &self.signature[self.index..];
                    let elem_len = leading_element_len(slot).unwrap_or(slot.len());
                    Some(&slot[..elem_len])
                }
            }
        }
    }

    /// Whether this non-`Array` frame's declared signature has been fully
    /// consumed (write: fully appended; read: fully read).
    pub(crate) fn is_complete(&self) -> bool {
        match self.kind {
            ContainerKind::Array => true,
            _ => self.index >= self.signature.len(),
        }
    }
}

/// Depth check shared by `open_container` (write) and `enter_container`
/// (read): `stack_len` is `containers.len()` *before* the new frame is
/// pushed, including the root frame (`spec.md` §3 invariant 4,
/// `BUS_CONTAINER_DEPTH`).
pub(crate) fn check_depth(stack_len: usize) -> Result<()> {
    if stack_len - 1 >= BUS_CONTAINER_DEPTH {
        return Err(Error::invalid_argument(format!(
            "container nesting exceeds the {}-level depth limit",
            BUS_CONTAINER_DEPTH
        )));
    }
    Ok(())
}

/// Same check, for the parser, which reports depth violations as
/// malformed-message rather than invalid-argument (`spec.md` §3 invariant 4:
/// "Exceeding it on parse yields malformed-message").
pub(crate) fn check_depth_parse(stack_len: usize) -> Result<()> {
    if stack_len - 1 >= BUS_CONTAINER_DEPTH {
        return Err(Error::malformed(format!(
            "container nesting exceeds the {}-level depth limit",
            BUS_CONTAINER_DEPTH
        )));
    }
    Ok(())
}

/// The container-kind marker for an `open_container`/`enter_container` call,
/// as it appears embedded in an enclosing signature.
pub(crate) fn container_marker(kind: ContainerKind, contents: &str) -> String {
    match kind {
        ContainerKind::Array => format!("a{}", contents),
        ContainerKind::Variant => "v".to_string(),
        ContainerKind::Struct => format!("({})", contents),
        ContainerKind::DictEntry => format!("{{{}}}", contents),
        ContainerKind::Root => unreachable!("root is never itself opened as a container"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn struct_frame_peeks_one_complete_type_at_a_time() {
        let mut frame = ContainerFrame {
            kind: ContainerKind::Struct,
            signature: "su".to_string(),
            index: 0,
            array_size_offset: None,
            array_len: None,
            begin: 0,
        };
        assert_eq!(frame.peek(), Some("s"));
        frame.index += 1;
        assert_eq!(frame.peek(), Some("u"));
        frame.index += 1;
        assert_eq!(frame.peek(), None);
        assert!(frame.is_complete());
    }

    #[test]
    fn array_frame_always_peeks_its_element_type() {
        let frame = ContainerFrame {
            kind: ContainerKind::Array,
            signature: "i".to_string(),
            index: 0,
            array_size_offset: None,
            array_len: None,
            begin: 0,
        };
        assert_eq!(frame.peek(), Some("i"));
        assert_eq!(frame.peek(), Some("i"));
        assert!(frame.is_complete());
    }

    #[test]
    fn depth_allows_exactly_the_limit() {
        assert!(check_depth(65).is_ok()); // 64 open (root + 64 == 65), about to push the 65th
        assert!(check_depth(66).is_err());
    }
}
