//! Ordered region map and offset decoding for the simulated address space.

use std::sync::atomic::{AtomicU64, Ordering};

use log::debug;

use crate::SimError;

static NEXT_SPACE_ID: AtomicU64 = AtomicU64::new(0);

/// Byte order applied uniformly to every multi-byte field in a space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Deserialize, serde::Serialize),
    serde(rename_all = "lowercase")
)]
pub enum ByteOrder {
    /// Least-significant byte first.
    #[default]
    Little,
    /// Most-significant byte first.
    Big,
}

/// Immutable configuration fixed when an address space is constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct SpaceConfig {
    /// Integer byte order used by every field decode and encode.
    pub byte_order: ByteOrder,
}

/// Opaque handle to a registered region; ordering follows registration order.
///
/// A handle is only valid for the space that issued it (or a clone of that
/// space). Any other space rejects it as an unknown region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct RegionHandle {
    space: u64,
    index: usize,
}

impl RegionHandle {
    /// Returns the registration index of this region.
    #[must_use]
    pub const fn index(self) -> usize {
        self.index
    }
}

/// Placement of a registered region within the address space.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct RegionDescriptor {
    /// Unique region name.
    pub name: String,
    /// Inclusive absolute start offset.
    pub base: usize,
    /// Declared size in bytes.
    pub capacity: usize,
}

impl RegionDescriptor {
    /// Exclusive absolute end offset.
    #[must_use]
    pub const fn end(&self) -> usize {
        self.base + self.capacity
    }

    /// Returns `true` when the absolute `offset` lies inside this region.
    #[must_use]
    pub const fn contains(&self, offset: usize) -> bool {
        offset >= self.base && offset < self.end()
    }
}

/// One region's share of an absolute extent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct RegionSpan {
    /// Region holding these bytes.
    pub region: RegionHandle,
    /// Offset relative to the region's base.
    pub region_offset: usize,
    /// Number of bytes in this region.
    pub len: usize,
}

#[derive(Debug, Clone)]
pub(crate) struct Region {
    pub(crate) descriptor: RegionDescriptor,
    pub(crate) bytes: Box<[u8]>,
}

/// A linear address range partitioned into contiguous, named regions.
///
/// Regions are laid out in registration order with no gaps: region `i`'s end
/// offset is always region `i + 1`'s base offset. Each region owns exactly
/// `capacity` zeroed bytes of backing storage.
#[derive(Debug, Clone)]
pub struct AddressSpace {
    id: u64,
    config: SpaceConfig,
    pub(crate) regions: Vec<Region>,
}

impl Default for AddressSpace {
    fn default() -> Self {
        Self::new(SpaceConfig::default())
    }
}

impl AddressSpace {
    /// Creates an empty address space with the given configuration.
    #[must_use]
    pub fn new(config: SpaceConfig) -> Self {
        Self {
            id: NEXT_SPACE_ID.fetch_add(1, Ordering::Relaxed),
            config,
            regions: Vec::new(),
        }
    }

    const fn handle_at(&self, index: usize) -> RegionHandle {
        RegionHandle {
            space: self.id,
            index,
        }
    }

    pub(crate) fn slot(&self, handle: RegionHandle) -> Result<&Region, SimError> {
        if handle.space != self.id {
            return Err(SimError::UnknownRegion(format!("#{} of another space", handle.index)));
        }
        self.regions
            .get(handle.index)
            .ok_or_else(|| SimError::UnknownRegion(format!("#{}", handle.index)))
    }

    /// Returns the construction-time configuration.
    #[must_use]
    pub const fn config(&self) -> SpaceConfig {
        self.config
    }

    /// Returns the byte order applied to multi-byte fields.
    #[must_use]
    pub const fn byte_order(&self) -> ByteOrder {
        self.config.byte_order
    }

    /// Appends a region directly after the last registered region.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::DuplicateName`] when `name` is already registered
    /// and [`SimError::InvalidCapacity`] when `capacity` is zero, would push
    /// the space end past `usize::MAX`, or cannot be allocated.
    pub fn register_region(
        &mut self,
        name: impl Into<String>,
        capacity: usize,
    ) -> Result<RegionHandle, SimError> {
        let name = name.into();
        if self.handle(&name).is_some() {
            return Err(SimError::DuplicateName { name });
        }
        if capacity == 0 {
            return Err(SimError::InvalidCapacity { name, capacity });
        }

        let base = self.end();
        if base.checked_add(capacity).is_none() {
            return Err(SimError::InvalidCapacity { name, capacity });
        }

        let mut bytes = Vec::new();
        if bytes.try_reserve_exact(capacity).is_err() {
            return Err(SimError::InvalidCapacity { name, capacity });
        }
        bytes.resize(capacity, 0);

        debug!(
            "registered region `{name}` at {base:#x}..{:#x} ({capacity} bytes)",
            base + capacity
        );

        let handle = self.handle_at(self.regions.len());
        self.regions.push(Region {
            descriptor: RegionDescriptor {
                name,
                base,
                capacity,
            },
            bytes: bytes.into_boxed_slice(),
        });
        Ok(handle)
    }

    /// Exclusive end offset of the whole space (sum of all capacities).
    #[must_use]
    pub fn end(&self) -> usize {
        self.regions
            .last()
            .map_or(0, |region| region.descriptor.end())
    }

    /// Returns `true` when no region has been registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Number of registered regions.
    #[must_use]
    pub fn region_count(&self) -> usize {
        self.regions.len()
    }

    /// Looks up a region handle by name.
    #[must_use]
    pub fn handle(&self, name: &str) -> Option<RegionHandle> {
        self.regions
            .iter()
            .position(|region| region.descriptor.name == name)
            .map(|index| self.handle_at(index))
    }

    /// Looks up a region handle by name, failing when it is not registered.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::UnknownRegion`] when `name` is not registered.
    pub fn find(&self, name: &str) -> Result<RegionHandle, SimError> {
        self.handle(name)
            .ok_or_else(|| SimError::UnknownRegion(name.to_string()))
    }

    /// Returns the descriptor for `handle`.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::UnknownRegion`] when the handle belongs to another space.
    pub fn region(&self, handle: RegionHandle) -> Result<&RegionDescriptor, SimError> {
        self.slot(handle).map(|region| &region.descriptor)
    }

    /// Iterates region descriptors in adjacency order.
    pub fn layout(&self) -> impl Iterator<Item = &RegionDescriptor> + '_ {
        self.regions.iter().map(|region| &region.descriptor)
    }

    /// Iterates handles in adjacency order.
    pub fn handles(&self) -> impl Iterator<Item = RegionHandle> + '_ {
        (0..self.regions.len()).map(|index| self.handle_at(index))
    }

    /// Decodes the region that owns the absolute `offset`.
    #[must_use]
    pub fn region_at(&self, offset: usize) -> Option<RegionHandle> {
        let index = self
            .regions
            .partition_point(|region| region.descriptor.end() <= offset);
        self.regions
            .get(index)
            .filter(|region| region.descriptor.contains(offset))
            .map(|_| self.handle_at(index))
    }

    /// Splits the absolute extent `[offset, offset + len)` into per-region spans.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::OutOfBounds`] when the extent passes the space end.
    pub fn spans(&self, offset: usize, len: usize) -> Result<Vec<RegionSpan>, SimError> {
        crate::memory::validate_extent(offset, len, self.end())?;

        let mut spans = Vec::new();
        let mut cursor = offset;
        let stop = offset + len;
        while cursor < stop {
            let Some(handle) = self.region_at(cursor) else {
                break;
            };
            let descriptor = &self.regions[handle.index].descriptor;
            let take = descriptor.end().min(stop) - cursor;
            spans.push(RegionSpan {
                region: handle,
                region_offset: cursor - descriptor.base,
                len: take,
            });
            cursor += take;
        }
        Ok(spans)
    }
}
