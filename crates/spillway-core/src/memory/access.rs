//! Raw byte access across region boundaries.
//!
//! Reads and writes are addressed relative to a region's base but are not
//! confined to that region: an extent that runs past the region's declared
//! capacity continues into the following regions in adjacency order. Only an
//! extent that leaves the whole address space is refused.

use crate::{AddressSpace, RegionHandle, RegionSpan, SimError};

/// Validates that `[offset, offset + length)` ends at or before `end`.
///
/// # Errors
///
/// Returns [`SimError::OutOfBounds`] when the extent passes `end` or its end
/// offset overflows.
pub const fn validate_extent(offset: usize, length: usize, end: usize) -> Result<(), SimError> {
    match offset.checked_add(length) {
        Some(stop) if stop <= end => Ok(()),
        _ => Err(SimError::OutOfBounds {
            offset,
            length,
            end,
        }),
    }
}

impl AddressSpace {
    /// Converts a region-relative offset into an absolute offset.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::UnknownRegion`] for a foreign handle and
    /// [`SimError::OutOfBounds`] when the sum overflows.
    pub fn absolute(&self, handle: RegionHandle, offset: usize) -> Result<usize, SimError> {
        let base = self.region(handle)?.base;
        base.checked_add(offset).ok_or(SimError::OutOfBounds {
            offset: base,
            length: offset,
            end: self.end(),
        })
    }

    /// Reads `length` bytes starting at `handle`'s base plus `offset`.
    ///
    /// The read may cross into following regions.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::OutOfBounds`] when the extent passes the end of the
    /// address space.
    pub fn read_bytes(
        &self,
        handle: RegionHandle,
        offset: usize,
        length: usize,
    ) -> Result<Vec<u8>, SimError> {
        let start = self.absolute(handle, offset)?;
        self.read_absolute(start, length)
    }

    /// Reads `length` bytes at an absolute offset.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::OutOfBounds`] when the extent passes the end of the
    /// address space.
    pub fn read_absolute(&self, start: usize, length: usize) -> Result<Vec<u8>, SimError> {
        let mut out = Vec::with_capacity(length);
        for span in self.spans(start, length)? {
            let bytes = &self.regions[span.region.index()].bytes;
            out.extend_from_slice(&bytes[span.region_offset..span.region_offset + span.len]);
        }
        Ok(out)
    }

    /// Writes `bytes` starting at `handle`'s base plus `offset`.
    ///
    /// Bytes beyond the region's capacity silently land in the following
    /// regions. Returns the per-region spans that were written. Nothing is
    /// written when the extent is rejected.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::OutOfBounds`] when the extent passes the end of the
    /// address space.
    pub fn write_bytes(
        &mut self,
        handle: RegionHandle,
        offset: usize,
        bytes: &[u8],
    ) -> Result<Vec<RegionSpan>, SimError> {
        let start = self.absolute(handle, offset)?;
        self.write_absolute(start, bytes)
    }

    /// Writes `bytes` at an absolute offset; see [`Self::write_bytes`].
    ///
    /// # Errors
    ///
    /// Returns [`SimError::OutOfBounds`] when the extent passes the end of the
    /// address space.
    pub fn write_absolute(&mut self, start: usize, bytes: &[u8]) -> Result<Vec<RegionSpan>, SimError> {
        let spans = self.spans(start, bytes.len())?;
        let mut consumed = 0;
        for span in &spans {
            let target = &mut self.regions[span.region.index()].bytes;
            target[span.region_offset..span.region_offset + span.len]
                .copy_from_slice(&bytes[consumed..consumed + span.len]);
            consumed += span.len;
        }
        Ok(spans)
    }

    /// Borrows a region's own backing storage (exactly `capacity` bytes).
    ///
    /// # Errors
    ///
    /// Returns [`SimError::UnknownRegion`] for a foreign handle.
    pub fn region_bytes(&self, handle: RegionHandle) -> Result<&[u8], SimError> {
        self.slot(handle).map(|region| &*region.bytes)
    }
}
