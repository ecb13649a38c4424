//! The buffer manager (`spec.md` §4.1).
//!
//! The C original tracks each region as a `(base pointer, size)` pair and
//! must re-base every outstanding pointer into it whenever `realloc` moves
//! the allocation. A `Vec<u8>` never invalidates byte *offsets* on growth
//! (only raw pointers/references would need rebasing), so this port keeps
//! every cross-reference into `fields`/`body` as a plain `usize` offset
//! (`spec.md` §9 "Pointer rebasing on grow" names this as the intended
//! strategy for languages without raw-pointer rebase) and the rebasing
//! machinery the C core needs simply does not exist here. What does carry
//! over unchanged is the alignment contract: every extension zero-fills its
//! padding and returns the aligned start offset.

use crate::error::{Error, Result};
use crate::limits::BUS_MESSAGE_SIZE_MAX;

/// Rounds `size` up to the next multiple of `align` (`align` a power of two).
#[inline]
pub(crate) fn align_up(size: usize, align: usize) -> usize {
    debug_assert!(align.is_power_of_two());
    (size + align - 1) & !(align - 1)
}

/// Grows `region` so that a value of `len` bytes can be written at an
/// `align`-aligned offset, zero-filling the alignment padding. Returns the
/// offset at which the caller should write its `len` bytes.
///
/// Fails with `out-of-memory` if the region would exceed the wire-format
/// size ceiling.
pub(crate) fn extend(region: &mut Vec<u8>, align: usize, len: usize) -> Result<usize> {
    let start = align_up(region.len(), align);
    let end = start
        .checked_add(len)
        .ok_or_else(|| Error::OutOfMemory("body size overflow".into()))?;
    if end as u64 > BUS_MESSAGE_SIZE_MAX {
        return Err(Error::OutOfMemory(format!(
            "region would grow to {} bytes, exceeding the {}-byte wire limit",
            end, BUS_MESSAGE_SIZE_MAX
        )));
    }
    region.resize(end, 0);
    log::trace!("buffer grew to {} bytes (aligned write at {})", end, start);
    Ok(start)
}

/// Grows `region` only by alignment padding (no payload), used for the
/// gap between an ARRAY's length prefix and its first element.
pub(crate) fn pad_to(region: &mut Vec<u8>, align: usize) {
    let start = align_up(region.len(), align);
    region.resize(start, 0);
}

/// Verifies that `[offset, offset + align_up(offset,align)-offset)` (i.e.
/// the padding consumed to reach `offset` from `prev_end`) is all zero, as
/// required by `spec.md` §3 invariant 1 and enforced on every read.
pub(crate) fn padding_is_zero(region: &[u8], prev_end: usize, offset: usize) -> bool {
    region[prev_end..offset].iter().all(|&b| b == 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn align_up_rounds_to_power_of_two() {
        assert_eq!(align_up(0, 8), 0);
        assert_eq!(align_up(1, 8), 8);
        assert_eq!(align_up(8, 8), 8);
        assert_eq!(align_up(9, 4), 12);
    }

    #[test]
    fn extend_zero_fills_padding() {
        let mut body = vec![0u8; 1];
        let offset = extend(&mut body, 4, 4).unwrap();
        assert_eq!(offset, 4);
        assert_eq!(body.len(), 8);
        assert!(padding_is_zero(&body, 1, 4));
    }

    #[quickcheck_macros::quickcheck]
    fn align_up_is_aligned_and_idempotent(size: usize, align_shift: u8) -> bool {
        let align = 1usize << (align_shift % 4); // one of 1, 2, 4, 8
        let size = size % (1 << 20);
        let aligned = align_up(size, align);
        aligned >= size && aligned % align == 0 && align_up(aligned, align) == aligned
    }

    #[quickcheck_macros::quickcheck]
    fn extend_never_shrinks_the_region_and_pads_with_zero(prefix_len: usize, align_shift: u8, payload_len: u8) -> bool {
        let align = 1usize << (align_shift % 4);
        let mut region = vec![0xaau8; prefix_len % 64];
        let before = region.len();
        match extend(&mut region, align, payload_len as usize) {
            Ok(offset) => region.len() >= before && offset % align == 0 && padding_is_zero(&region, before, offset),
            Err(_) => true,
        }
    }
}
