use thiserror::Error;

/// Error classes used to separate configuration faults from run-time faults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum ErrorClass {
    /// Region or field declaration was rejected; the caller must fix the layout.
    Declaration,
    /// An operation would act outside the modeled address space.
    Runtime,
    /// A lookup, value, or phase-ordering mistake by the caller.
    Usage,
}

/// Stable error taxonomy for address-space, view, channel and run operations.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Error)]
pub enum SimError {
    /// A region with the same name is already registered.
    #[error("region `{name}` is already registered")]
    DuplicateName {
        /// The rejected region name.
        name: String,
    },
    /// Region capacity must be at least one byte.
    #[error("region `{name}` has invalid capacity {capacity}")]
    InvalidCapacity {
        /// The rejected region name.
        name: String,
        /// The requested capacity.
        capacity: usize,
    },
    /// A field's byte range intersects an existing field in the same region.
    #[error("field `{field}` overlaps `{existing}` in region `{region}`")]
    Overlap {
        /// Owning region name.
        region: String,
        /// The rejected field name.
        field: String,
        /// The already-declared field it collides with.
        existing: String,
    },
    /// Access extent runs past the end of the whole address space.
    #[error("access of {length} bytes at offset {offset:#x} exceeds address space end {end:#x}")]
    OutOfBounds {
        /// Absolute start offset of the access.
        offset: usize,
        /// Length of the access in bytes.
        length: usize,
        /// Exclusive end of the modeled address space.
        end: usize,
    },
    /// A raw read would need memory beyond the final region.
    #[error(
        "read of {requested} bytes into `{region}` needs memory past the address space end ({available} bytes available)"
    )]
    AddressSpaceExhausted {
        /// Destination region name.
        region: String,
        /// Requested read length.
        requested: usize,
        /// Bytes available from the destination base to the end of the space.
        available: usize,
    },
    /// No region is registered under the given name or handle.
    #[error("unknown region `{0}`")]
    UnknownRegion(String),
    /// No field is declared under the given name in the region.
    #[error("unknown field `{field}` in region `{region}`")]
    UnknownField {
        /// Region that was searched.
        region: String,
        /// Missing field name.
        field: String,
    },
    /// Field range does not fit inside the region's declared capacity.
    #[error(
        "field `{field}` at offset {offset} width {width} does not fit region `{region}` of capacity {capacity}"
    )]
    FieldOutsideRegion {
        /// Owning region name.
        region: String,
        /// The rejected field name.
        field: String,
        /// Declared byte offset.
        offset: usize,
        /// Declared byte width.
        width: usize,
        /// The region's declared capacity.
        capacity: usize,
    },
    /// Field width is not valid for its decode kind.
    #[error("field `{field}` has invalid width {width} for its kind")]
    InvalidFieldWidth {
        /// The rejected field name.
        field: String,
        /// The rejected width.
        width: usize,
    },
    /// A value could not be encoded into the field.
    #[error("value does not fit field `{field}`: {reason}")]
    ValueMismatch {
        /// Target field name.
        field: String,
        /// Why the value was rejected.
        reason: String,
    },
    /// A run-phase transition was requested out of order.
    #[error("cannot {action} while run is {phase}")]
    PhaseViolation {
        /// Attempted action.
        action: &'static str,
        /// Current phase label.
        phase: &'static str,
    },
}

impl SimError {
    /// Returns the class of this error.
    #[must_use]
    pub const fn class(&self) -> ErrorClass {
        match self {
            Self::DuplicateName { .. }
            | Self::InvalidCapacity { .. }
            | Self::Overlap { .. }
            | Self::FieldOutsideRegion { .. }
            | Self::InvalidFieldWidth { .. } => ErrorClass::Declaration,
            Self::OutOfBounds { .. } | Self::AddressSpaceExhausted { .. } => ErrorClass::Runtime,
            Self::UnknownRegion(_)
            | Self::UnknownField { .. }
            | Self::ValueMismatch { .. }
            | Self::PhaseViolation { .. } => ErrorClass::Usage,
        }
    }

    /// Errors raised only because an access left the modeled address space.
    #[must_use]
    pub const fn is_address_space_fault(&self) -> bool {
        matches!(self.class(), ErrorClass::Runtime)
    }
}
