//! Unbuffered, length-unchecked raw read into a destination region.
//!
//! [`RawReadChannel::read_into`] behaves like a single `read(2)` on file
//! descriptor 0 with a caller-chosen count: it asks its [`InputSource`] for up
//! to `requested` bytes once and copies whatever arrives to the destination's
//! base. The count is never compared with the destination's capacity, so a
//! large count spills into every region that follows. The only refusal is a
//! count that would run off the end of the modeled address space.

use log::{debug, warn};

use crate::{AddressSpace, RegionHandle, RegionSpan, SimError};

/// Byte producer consumed by a raw read.
pub trait InputSource {
    /// Copies up to `buf.len()` bytes into `buf` and returns how many were
    /// produced. A count below `buf.len()` is a short read; `0` means end of
    /// input.
    fn read(&mut self, buf: &mut [u8]) -> usize;
}

impl<S: InputSource + ?Sized> InputSource for &mut S {
    fn read(&mut self, buf: &mut [u8]) -> usize {
        (**self).read(buf)
    }
}

impl<S: InputSource + ?Sized> InputSource for Box<S> {
    fn read(&mut self, buf: &mut [u8]) -> usize {
        (**self).read(buf)
    }
}

/// Reading from a slice consumes its leading bytes.
impl InputSource for &[u8] {
    fn read(&mut self, buf: &mut [u8]) -> usize {
        let count = self.len().min(buf.len());
        let (head, tail) = self.split_at(count);
        buf[..count].copy_from_slice(head);
        *self = tail;
        count
    }
}

/// Owned finite byte buffer drained front to back.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BufferSource {
    bytes: Vec<u8>,
    position: usize,
}

impl BufferSource {
    /// Wraps `bytes` as a finite input.
    #[must_use]
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into(),
            position: 0,
        }
    }

    /// Bytes not yet consumed.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.position
    }
}

impl InputSource for BufferSource {
    fn read(&mut self, buf: &mut [u8]) -> usize {
        let mut rest = &self.bytes[self.position..];
        let count = rest.read(buf);
        self.position += count;
        count
    }
}

/// Adapts any byte iterator; infinite iterators never short-read.
#[derive(Debug, Clone)]
pub struct IterSource<I> {
    iter: I,
}

impl<I: Iterator<Item = u8>> IterSource<I> {
    /// Wraps `iter` as an input source.
    pub const fn new(iter: I) -> Self {
        Self { iter }
    }
}

impl<I: Iterator<Item = u8>> InputSource for IterSource<I> {
    fn read(&mut self, buf: &mut [u8]) -> usize {
        let mut count = 0;
        for slot in buf.iter_mut() {
            let Some(byte) = self.iter.next() else {
                break;
            };
            *slot = byte;
            count += 1;
        }
        count
    }
}

/// Deterministic counter bytes `seed, seed + 1, ...` wrapping at 256.
///
/// Any 256 consecutive bytes are distinct, which makes it easy to tell where
/// each spilled byte came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatternSource {
    next: u8,
    remaining: Option<usize>,
}

impl PatternSource {
    /// Endless counter starting at `seed`.
    #[must_use]
    pub const fn endless(seed: u8) -> Self {
        Self {
            next: seed,
            remaining: None,
        }
    }

    /// Counter starting at `seed` that ends after `len` bytes.
    #[must_use]
    pub const fn bounded(seed: u8, len: usize) -> Self {
        Self {
            next: seed,
            remaining: Some(len),
        }
    }
}

impl InputSource for PatternSource {
    fn read(&mut self, buf: &mut [u8]) -> usize {
        let count = self.remaining.map_or(buf.len(), |left| left.min(buf.len()));
        for slot in &mut buf[..count] {
            *slot = self.next;
            self.next = self.next.wrapping_add(1);
        }
        if let Some(left) = self.remaining.as_mut() {
            *left -= count;
        }
        count
    }
}

/// Caps every read of `inner` at `max_chunk` bytes, the way a pipe or
/// terminal hands a reader only what is currently buffered.
#[derive(Debug, Clone)]
pub struct ChunkedSource<S> {
    inner: S,
    max_chunk: usize,
}

impl<S: InputSource> ChunkedSource<S> {
    /// Wraps `inner`, delivering at most `max_chunk` bytes per call.
    pub const fn new(inner: S, max_chunk: usize) -> Self {
        Self { inner, max_chunk }
    }
}

impl<S: InputSource> InputSource for ChunkedSource<S> {
    fn read(&mut self, buf: &mut [u8]) -> usize {
        let limit = self.max_chunk.min(buf.len());
        self.inner.read(&mut buf[..limit])
    }
}

/// Immutable record of one raw read.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct WriteOp {
    destination: RegionHandle,
    base: usize,
    destination_capacity: usize,
    requested: usize,
    written: usize,
    spans: Vec<RegionSpan>,
}

impl WriteOp {
    /// Region whose base received the first byte.
    #[must_use]
    pub const fn destination(&self) -> RegionHandle {
        self.destination
    }

    /// Absolute offset of the destination base.
    #[must_use]
    pub const fn base(&self) -> usize {
        self.base
    }

    /// Declared capacity of the destination.
    #[must_use]
    pub const fn destination_capacity(&self) -> usize {
        self.destination_capacity
    }

    /// Count passed to the read.
    #[must_use]
    pub const fn requested(&self) -> usize {
        self.requested
    }

    /// Count actually produced by the source and written.
    #[must_use]
    pub const fn written(&self) -> usize {
        self.written
    }

    /// Per-region segments that received bytes, in address order.
    #[must_use]
    pub fn spans(&self) -> &[RegionSpan] {
        &self.spans
    }

    /// Returns `true` when the source produced fewer bytes than requested.
    #[must_use]
    pub const fn is_short(&self) -> bool {
        self.written < self.requested
    }

    /// Bytes that landed beyond the destination's declared capacity.
    #[must_use]
    pub const fn spilled_bytes(&self) -> usize {
        self.written.saturating_sub(self.destination_capacity)
    }

    /// Segments that landed in regions other than the destination.
    pub fn spill_spans(&self) -> impl Iterator<Item = &RegionSpan> + '_ {
        self.spans
            .iter()
            .filter(move |span| span.region != self.destination)
    }
}

/// Performs raw, capacity-unchecked reads into an [`AddressSpace`].
#[derive(Debug, Clone, Copy, Default)]
pub struct RawReadChannel;

impl RawReadChannel {
    /// Creates a channel.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Reads up to `requested` bytes from `source` into `destination`'s base.
    ///
    /// Exactly one [`InputSource::read`] call is made. The bytes it returns
    /// are written starting at the destination base, continuing into
    /// following regions when they exceed the destination's capacity.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::AddressSpaceExhausted`] when `requested` exceeds
    /// the bytes between the destination base and the end of the address
    /// space. In that case the source is not read and nothing is written.
    pub fn read_into<S: InputSource + ?Sized>(
        &self,
        space: &mut AddressSpace,
        destination: RegionHandle,
        requested: usize,
        source: &mut S,
    ) -> Result<WriteOp, SimError> {
        let descriptor = space.region(destination)?;
        let base = descriptor.base;
        let destination_capacity = descriptor.capacity;
        let available = space.end() - base;

        if requested > available {
            warn!(
                "refusing read of {requested} bytes into `{}`: only {available} bytes remain",
                descriptor.name
            );
            return Err(SimError::AddressSpaceExhausted {
                region: descriptor.name.clone(),
                requested,
                available,
            });
        }

        let mut buffer = vec![0; requested];
        // A source must not claim more than it was offered.
        let written = source.read(&mut buffer).min(requested);
        let spans = space.write_bytes(destination, 0, &buffer[..written])?;

        let op = WriteOp {
            destination,
            base,
            destination_capacity,
            requested,
            written,
            spans,
        };

        let name = &space.region(destination)?.name;
        debug!("raw read into `{name}` at {base:#x}: requested {requested}, wrote {written}");
        if op.is_short() {
            debug!("short read into `{name}`: {written} of {requested} bytes");
        }
        if op.spilled_bytes() > 0 {
            let reached: Vec<&str> = op
                .spill_spans()
                .filter_map(|span| space.region(span.region).ok())
                .map(|region| region.name.as_str())
                .collect();
            warn!(
                "read into `{name}` spilled {} bytes past capacity {destination_capacity} into {}",
                op.spilled_bytes(),
                reached.join(", ")
            );
        }

        Ok(op)
    }
}

#[cfg(test)]
mod tests {
    use super::{
        BufferSource, ChunkedSource, InputSource, IterSource, PatternSource, RawReadChannel,
    };
    use crate::{AddressSpace, SimError};

    fn space() -> AddressSpace {
        let mut space = AddressSpace::default();
        space.register_region("a", 32).expect("a");
        space.register_region("b", 40).expect("b");
        space.register_region("c", 8).expect("c");
        space
    }

    #[test]
    fn slice_source_consumes_front() {
        let data = [1_u8, 2, 3];
        let mut source: &[u8] = &data;
        let mut buf = [0; 2];
        assert_eq!(source.read(&mut buf), 2);
        assert_eq!(buf, [1, 2]);
        assert_eq!(source.read(&mut buf), 1);
        assert_eq!(source.read(&mut buf), 0);
    }

    #[test]
    fn buffer_source_tracks_remaining() {
        let mut source = BufferSource::new(vec![7; 5]);
        let mut buf = [0; 3];
        assert_eq!(source.read(&mut buf), 3);
        assert_eq!(source.remaining(), 2);
    }

    #[test]
    fn pattern_source_counts_and_wraps() {
        let mut source = PatternSource::endless(254);
        let mut buf = [0; 4];
        assert_eq!(source.read(&mut buf), 4);
        assert_eq!(buf, [254, 255, 0, 1]);

        let mut bounded = PatternSource::bounded(0, 3);
        assert_eq!(bounded.read(&mut buf), 3);
        assert_eq!(bounded.read(&mut buf), 0);
    }

    #[test]
    fn chunked_source_caps_each_call() {
        let mut source = ChunkedSource::new(PatternSource::endless(0), 5);
        let mut buf = [0; 16];
        assert_eq!(source.read(&mut buf), 5);
        assert_eq!(source.read(&mut buf), 5);
        assert_eq!(buf[..5], [5, 6, 7, 8, 9]);
    }

    #[test]
    fn read_within_capacity_does_not_spill() {
        let mut space = space();
        let a = space.find("a").expect("a");
        let op = RawReadChannel::new()
            .read_into(&mut space, a, 10, &mut PatternSource::endless(1))
            .expect("read");

        assert_eq!(op.written(), 10);
        assert_eq!(op.spilled_bytes(), 0);
        assert_eq!(op.spill_spans().count(), 0);
        let b = space.find("b").expect("b");
        assert!(space.region_bytes(b).expect("b").iter().all(|byte| *byte == 0));
    }

    #[test]
    fn read_spills_across_multiple_regions() {
        let mut space = space();
        let a = space.find("a").expect("a");
        let op = RawReadChannel::new()
            .read_into(&mut space, a, 76, &mut PatternSource::endless(0))
            .expect("read");

        assert_eq!(op.spilled_bytes(), 44);
        assert_eq!(op.spans().len(), 3);
        let c = space.find("c").expect("c");
        assert_eq!(space.region_bytes(c).expect("c"), &[72, 73, 74, 75, 0, 0, 0, 0]);
    }

    #[test]
    fn short_read_records_actual_count() {
        let mut space = space();
        let a = space.find("a").expect("a");
        let mut source = IterSource::new([9_u8; 6].into_iter());
        let op = RawReadChannel::new()
            .read_into(&mut space, a, 50, &mut source)
            .expect("read");

        assert!(op.is_short());
        assert_eq!(op.requested(), 50);
        assert_eq!(op.written(), 6);
    }

    #[test]
    fn exhausted_read_writes_nothing_and_leaves_source_untouched() {
        let mut space = space();
        let c = space.find("c").expect("c");
        let mut source = BufferSource::new(vec![0xEE; 64]);

        let result = RawReadChannel::new().read_into(&mut space, c, 9, &mut source);

        assert_eq!(
            result,
            Err(SimError::AddressSpaceExhausted {
                region: "c".into(),
                requested: 9,
                available: 8
            })
        );
        assert_eq!(source.remaining(), 64);
        assert!(space.region_bytes(c).expect("c").iter().all(|byte| *byte == 0));
    }

    #[test]
    fn read_to_exact_end_is_allowed() {
        let mut space = space();
        let b = space.find("b").expect("b");
        let op = RawReadChannel::new()
            .read_into(&mut space, b, 48, &mut PatternSource::endless(0))
            .expect("read");
        assert_eq!(op.written(), 48);
    }

    #[test]
    fn dyn_sources_are_accepted() {
        let mut space = space();
        let a = space.find("a").expect("a");
        let mut source: Box<dyn InputSource> = Box::new(PatternSource::bounded(0, 4));
        let op = RawReadChannel::new()
            .read_into(&mut space, a, 8, &mut *source)
            .expect("read");
        assert_eq!(op.written(), 4);
    }
}
