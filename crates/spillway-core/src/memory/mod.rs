//! Address-space model: ordered regions and unchecked raw byte access.

/// Cross-region raw byte reads and writes.
pub mod access;
/// Region registration, layout and offset decoding.
pub mod map;

pub use access::validate_extent;
pub use map::{
    AddressSpace, ByteOrder, RegionDescriptor, RegionHandle, RegionSpan, SpaceConfig,
};

#[cfg(test)]
mod tests {
    use crate::AddressSpace;

    #[test]
    fn adjacency_holds_for_every_neighbouring_pair() {
        let mut space = AddressSpace::default();
        for (index, capacity) in [3_usize, 1, 64, 7, 12].into_iter().enumerate() {
            space
                .register_region(format!("r{index}"), capacity)
                .expect("valid region");
        }

        let layout: Vec<_> = space.layout().collect();
        for pair in layout.windows(2) {
            assert_eq!(pair[0].end(), pair[1].base);
        }
        assert_eq!(space.end(), 3 + 1 + 64 + 7 + 12);
    }
}
